use async_trait::async_trait;
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use super::models::{CardTemplateModel, CollectionEntry, OwnedCopyModel};
use crate::shared::AppError;
use crate::store::{InMemoryStore, PostgresStore};

/// Result of attempting to sell one unit of an owned copy
#[derive(Debug, Clone, PartialEq)]
pub enum SellCopyResult {
    /// Coins were credited; `remaining_level` is None once the row is gone
    Sold {
        coins_earned: i64,
        remaining_level: Option<i32>,
        balance: i64,
    },
    CopyNotFound,
    NotOwned,
}

/// Trait for card template and owned copy operations
#[async_trait]
pub trait CardRepository {
    async fn insert_template(&self, template: &CardTemplateModel) -> Result<(), AppError>;
    async fn get_template(&self, type_id: &str) -> Result<Option<CardTemplateModel>, AppError>;
    async fn list_templates_by_season(
        &self,
        season_id: &str,
    ) -> Result<Vec<CardTemplateModel>, AppError>;

    /// Templates of a season ordered by rating, highest first
    async fn top_templates(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<Vec<CardTemplateModel>, AppError>;

    async fn get_copy(&self, copy_id: &str) -> Result<Option<OwnedCopyModel>, AppError>;
    async fn list_collection(&self, owner_id: &str) -> Result<Vec<CollectionEntry>, AppError>;

    /// Atomically decrements the copy's level (removing the row at zero) and
    /// credits the owner with the copy's sale value
    async fn try_sell_copy(
        &self,
        copy_id: &str,
        owner_id: &str,
    ) -> Result<SellCopyResult, AppError>;
}

#[async_trait]
impl CardRepository for InMemoryStore {
    #[instrument(skip(self, template), fields(type_id = %template.type_id))]
    async fn insert_template(&self, template: &CardTemplateModel) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables.templates.contains_key(&template.type_id) {
            warn!("Card template already exists in memory");
            return Err(AppError::DatabaseError(
                "Card template already exists".to_string(),
            ));
        }
        tables
            .templates
            .insert(template.type_id.clone(), template.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_template(&self, type_id: &str) -> Result<Option<CardTemplateModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.templates.get(type_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_templates_by_season(
        &self,
        season_id: &str,
    ) -> Result<Vec<CardTemplateModel>, AppError> {
        let tables = self.tables()?;
        let mut templates: Vec<CardTemplateModel> = tables
            .templates
            .values()
            .filter(|t| t.season_id == season_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| {
            (&a.teacher_name, &a.subject).cmp(&(&b.teacher_name, &b.subject))
        });
        Ok(templates)
    }

    #[instrument(skip(self))]
    async fn top_templates(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<Vec<CardTemplateModel>, AppError> {
        let tables = self.tables()?;
        let mut templates: Vec<CardTemplateModel> = tables
            .templates
            .values()
            .filter(|t| t.season_id == season_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.rating.cmp(&a.rating));
        templates.truncate(limit);
        Ok(templates)
    }

    #[instrument(skip(self))]
    async fn get_copy(&self, copy_id: &str) -> Result<Option<OwnedCopyModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.copies.get(copy_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_collection(&self, owner_id: &str) -> Result<Vec<CollectionEntry>, AppError> {
        let tables = self.tables()?;
        let mut entries: Vec<CollectionEntry> = tables
            .copies
            .values()
            .filter(|copy| copy.owner_id == owner_id)
            .filter_map(|copy| {
                tables.templates.get(&copy.type_id).map(|template| CollectionEntry {
                    copy: copy.clone(),
                    template: template.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.template.rating.cmp(&a.template.rating));

        debug!(copy_count = entries.len(), "Collection loaded from memory");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn try_sell_copy(
        &self,
        copy_id: &str,
        owner_id: &str,
    ) -> Result<SellCopyResult, AppError> {
        let mut tables = self.tables()?;

        let copy = match tables.copies.get(copy_id) {
            Some(copy) => copy.clone(),
            None => return Ok(SellCopyResult::CopyNotFound),
        };
        if copy.owner_id != owner_id {
            return Ok(SellCopyResult::NotOwned);
        }
        if !tables.players.contains_key(owner_id) {
            return Err(AppError::NotFound("Player not found".to_string()));
        }

        let template_rating = tables
            .templates
            .get(&copy.type_id)
            .map(|template| template.rating)
            .ok_or(AppError::Internal)?;
        let coins_earned = copy.sale_value(template_rating);
        let remaining_level = if copy.level > 1 {
            if let Some(row) = tables.copies.get_mut(copy_id) {
                row.level -= 1;
            }
            Some(copy.level - 1)
        } else {
            tables.copies.remove(copy_id);
            None
        };

        let balance = match tables.players.get_mut(owner_id) {
            Some(player) => {
                player.coins += coins_earned;
                player.coins
            }
            None => return Err(AppError::Internal),
        };

        info!(coins_earned, ?remaining_level, "Copy sold in memory");
        Ok(SellCopyResult::Sold {
            coins_earned,
            remaining_level,
            balance,
        })
    }
}

#[async_trait]
impl CardRepository for PostgresStore {
    #[instrument(skip(self, template), fields(type_id = %template.type_id))]
    async fn insert_template(&self, template: &CardTemplateModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO card_templates (type_id, teacher_name, subject, quote, rating, wins, losses, season_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&template.type_id)
        .bind(&template.teacher_name)
        .bind(&template.subject)
        .bind(&template.quote)
        .bind(template.rating)
        .bind(template.wins)
        .bind(template.losses)
        .bind(&template.season_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert card template");
            AppError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_template(&self, type_id: &str) -> Result<Option<CardTemplateModel>, AppError> {
        let template = sqlx::query_as::<_, CardTemplateModel>(
            "SELECT type_id, teacher_name, subject, quote, rating, wins, losses, season_id
             FROM card_templates WHERE type_id = $1",
        )
        .bind(type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    #[instrument(skip(self))]
    async fn list_templates_by_season(
        &self,
        season_id: &str,
    ) -> Result<Vec<CardTemplateModel>, AppError> {
        let templates = sqlx::query_as::<_, CardTemplateModel>(
            "SELECT type_id, teacher_name, subject, quote, rating, wins, losses, season_id
             FROM card_templates WHERE season_id = $1 ORDER BY teacher_name, subject",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    #[instrument(skip(self))]
    async fn top_templates(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<Vec<CardTemplateModel>, AppError> {
        let templates = sqlx::query_as::<_, CardTemplateModel>(
            "SELECT type_id, teacher_name, subject, quote, rating, wins, losses, season_id
             FROM card_templates WHERE season_id = $1 ORDER BY rating DESC LIMIT $2",
        )
        .bind(season_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    #[instrument(skip(self))]
    async fn get_copy(&self, copy_id: &str) -> Result<Option<OwnedCopyModel>, AppError> {
        let copy = sqlx::query_as::<_, OwnedCopyModel>(
            "SELECT id, type_id, owner_id, level FROM owned_copies WHERE id = $1",
        )
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(copy)
    }

    #[instrument(skip(self))]
    async fn list_collection(&self, owner_id: &str) -> Result<Vec<CollectionEntry>, AppError> {
        let rows = sqlx::query(
            "SELECT c.id, c.type_id, c.owner_id, c.level,
                    t.teacher_name, t.subject, t.quote, t.rating, t.wins, t.losses, t.season_id
             FROM owned_copies c JOIN card_templates t ON t.type_id = c.type_id
             WHERE c.owner_id = $1 ORDER BY t.rating DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let type_id: String = row.try_get("type_id")?;
            entries.push(CollectionEntry {
                copy: OwnedCopyModel {
                    id: row.try_get("id")?,
                    type_id: type_id.clone(),
                    owner_id: row.try_get("owner_id")?,
                    level: row.try_get("level")?,
                },
                template: CardTemplateModel {
                    type_id,
                    teacher_name: row.try_get("teacher_name")?,
                    subject: row.try_get("subject")?,
                    quote: row.try_get("quote")?,
                    rating: row.try_get("rating")?,
                    wins: row.try_get("wins")?,
                    losses: row.try_get("losses")?,
                    season_id: row.try_get("season_id")?,
                },
            });
        }
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn try_sell_copy(
        &self,
        copy_id: &str,
        owner_id: &str,
    ) -> Result<SellCopyResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let copy = sqlx::query_as::<_, OwnedCopyModel>(
            "SELECT id, type_id, owner_id, level FROM owned_copies WHERE id = $1 FOR UPDATE",
        )
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await?;

        let copy = match copy {
            Some(copy) => copy,
            None => return Ok(SellCopyResult::CopyNotFound),
        };
        if copy.owner_id != owner_id {
            return Ok(SellCopyResult::NotOwned);
        }

        // Waits for any vote holding the template row
        let template_rating: i32 =
            sqlx::query("SELECT rating FROM card_templates WHERE type_id = $1 FOR SHARE")
                .bind(&copy.type_id)
                .fetch_one(&mut *tx)
                .await?
                .try_get("rating")?;
        let coins_earned = copy.sale_value(template_rating);
        let remaining_level = if copy.level > 1 {
            sqlx::query("UPDATE owned_copies SET level = level - 1 WHERE id = $1")
                .bind(copy_id)
                .execute(&mut *tx)
                .await?;
            Some(copy.level - 1)
        } else {
            sqlx::query("DELETE FROM owned_copies WHERE id = $1")
                .bind(copy_id)
                .execute(&mut *tx)
                .await?;
            None
        };

        let row = sqlx::query("UPDATE players SET coins = coins + $1 WHERE id = $2 RETURNING coins")
            .bind(coins_earned)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        let balance: i64 = row.try_get("coins")?;

        tx.commit().await?;

        info!(coins_earned, ?remaining_level, "Copy sold in database");
        Ok(SellCopyResult::Sold {
            coins_earned,
            remaining_level,
            balance,
        })
    }
}
