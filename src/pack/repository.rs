use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info, instrument};

use super::models::{AwardedCard, PackModel};
use crate::cards::models::CardTemplateModel;
use crate::player::models::PlayerModel;
use crate::shared::AppError;
use crate::store::{award_copy_tx, InMemoryStore, PostgresStore};

/// Result of attempting to claim the free daily pack
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimPackResult {
    Claimed,
    AlreadyClaimed,
    PlayerNotFound,
}

/// Result of attempting to buy a pack with coins
#[derive(Debug, Clone, PartialEq)]
pub enum PurchasePackResult {
    Purchased { balance: i64 },
    InsufficientFunds { balance: i64 },
    PlayerNotFound,
}

/// Result of attempting to open a pack
#[derive(Debug, Clone, PartialEq)]
pub enum OpenPackResult {
    /// The pack flipped to opened and every draw was awarded
    Opened(Vec<AwardedCard>),
    /// No pack with this id belongs to the player
    PackNotFound,
    /// Someone else already flipped the flag
    AlreadyOpened,
}

/// Trait for pack repository operations
#[async_trait]
pub trait PackRepository {
    /// Atomically checks the daily allowance, stamps the claim and inserts the pack
    async fn claim_daily_pack(
        &self,
        pack: &PackModel,
        now: DateTime<Utc>,
    ) -> Result<ClaimPackResult, AppError>;

    /// Atomically debits `price` from the owner and inserts the pack
    async fn purchase_pack(
        &self,
        pack: &PackModel,
        price: i64,
    ) -> Result<PurchasePackResult, AppError>;

    async fn get_pack(&self, pack_id: &str) -> Result<Option<PackModel>, AppError>;

    /// Unopened packs of the player, oldest first
    async fn list_unopened_packs(&self, owner_id: &str) -> Result<Vec<PackModel>, AppError>;

    /// Compare-and-swap on `is_opened`, then consolidates every drawn
    /// template into the owner's collection, all as one unit
    async fn try_open_pack(
        &self,
        pack_id: &str,
        owner_id: &str,
        drawn: &[CardTemplateModel],
    ) -> Result<OpenPackResult, AppError>;
}

#[async_trait]
impl PackRepository for InMemoryStore {
    #[instrument(skip(self, pack), fields(pack_id = %pack.id, owner_id = %pack.owner_id))]
    async fn claim_daily_pack(
        &self,
        pack: &PackModel,
        now: DateTime<Utc>,
    ) -> Result<ClaimPackResult, AppError> {
        let mut tables = self.tables()?;

        let player = match tables.players.get_mut(&pack.owner_id) {
            Some(player) => player,
            None => return Ok(ClaimPackResult::PlayerNotFound),
        };
        if player.claimed_on_day_of(now) {
            debug!("Daily pack already claimed");
            return Ok(ClaimPackResult::AlreadyClaimed);
        }
        player.last_pack_claim = Some(now);
        tables.packs.insert(pack.id.clone(), pack.clone());

        info!("Daily pack claimed in memory");
        Ok(ClaimPackResult::Claimed)
    }

    #[instrument(skip(self, pack), fields(pack_id = %pack.id, owner_id = %pack.owner_id))]
    async fn purchase_pack(
        &self,
        pack: &PackModel,
        price: i64,
    ) -> Result<PurchasePackResult, AppError> {
        let mut tables = self.tables()?;

        let player = match tables.players.get_mut(&pack.owner_id) {
            Some(player) => player,
            None => return Ok(PurchasePackResult::PlayerNotFound),
        };
        if player.coins < price {
            return Ok(PurchasePackResult::InsufficientFunds {
                balance: player.coins,
            });
        }
        player.coins -= price;
        let balance = player.coins;
        tables.packs.insert(pack.id.clone(), pack.clone());

        info!(price, balance, "Pack purchased in memory");
        Ok(PurchasePackResult::Purchased { balance })
    }

    #[instrument(skip(self))]
    async fn get_pack(&self, pack_id: &str) -> Result<Option<PackModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.packs.get(pack_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_unopened_packs(&self, owner_id: &str) -> Result<Vec<PackModel>, AppError> {
        let tables = self.tables()?;
        let mut packs: Vec<PackModel> = tables
            .packs
            .values()
            .filter(|p| p.owner_id == owner_id && !p.is_opened)
            .cloned()
            .collect();
        packs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(packs)
    }

    #[instrument(skip(self, drawn), fields(draw_count = drawn.len()))]
    async fn try_open_pack(
        &self,
        pack_id: &str,
        owner_id: &str,
        drawn: &[CardTemplateModel],
    ) -> Result<OpenPackResult, AppError> {
        let mut tables = self.tables()?;

        match tables.packs.get_mut(pack_id) {
            Some(pack) if pack.owner_id == owner_id => {
                if pack.is_opened {
                    return Ok(OpenPackResult::AlreadyOpened);
                }
                pack.is_opened = true;
            }
            _ => return Ok(OpenPackResult::PackNotFound),
        }

        let awarded = drawn
            .iter()
            .map(|template| {
                let (level, merged) = tables.award_copy(owner_id, &template.type_id);
                AwardedCard {
                    template: template.clone(),
                    level,
                    merged,
                }
            })
            .collect();

        info!("Pack opened in memory");
        Ok(OpenPackResult::Opened(awarded))
    }
}

#[async_trait]
impl PackRepository for PostgresStore {
    #[instrument(skip(self, pack), fields(pack_id = %pack.id, owner_id = %pack.owner_id))]
    async fn claim_daily_pack(
        &self,
        pack: &PackModel,
        now: DateTime<Utc>,
    ) -> Result<ClaimPackResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let player = sqlx::query_as::<_, PlayerModel>(
            "SELECT id, username, coins, rating, last_pack_claim FROM players WHERE id = $1 FOR UPDATE",
        )
        .bind(&pack.owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let player = match player {
            Some(player) => player,
            None => return Ok(ClaimPackResult::PlayerNotFound),
        };
        if player.claimed_on_day_of(now) {
            return Ok(ClaimPackResult::AlreadyClaimed);
        }

        sqlx::query("UPDATE players SET last_pack_claim = $1 WHERE id = $2")
            .bind(now)
            .bind(&pack.owner_id)
            .execute(&mut *tx)
            .await?;
        insert_pack(&mut tx, pack).await?;

        tx.commit().await?;
        info!("Daily pack claimed in database");
        Ok(ClaimPackResult::Claimed)
    }

    #[instrument(skip(self, pack), fields(pack_id = %pack.id, owner_id = %pack.owner_id))]
    async fn purchase_pack(
        &self,
        pack: &PackModel,
        price: i64,
    ) -> Result<PurchasePackResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT coins FROM players WHERE id = $1 FOR UPDATE")
            .bind(&pack.owner_id)
            .fetch_optional(&mut *tx)
            .await?;
        let coins: i64 = match row {
            Some(row) => row.try_get("coins")?,
            None => return Ok(PurchasePackResult::PlayerNotFound),
        };
        if coins < price {
            return Ok(PurchasePackResult::InsufficientFunds { balance: coins });
        }

        sqlx::query("UPDATE players SET coins = coins - $1 WHERE id = $2")
            .bind(price)
            .bind(&pack.owner_id)
            .execute(&mut *tx)
            .await?;
        insert_pack(&mut tx, pack).await?;

        tx.commit().await?;
        Ok(PurchasePackResult::Purchased {
            balance: coins - price,
        })
    }

    #[instrument(skip(self))]
    async fn get_pack(&self, pack_id: &str) -> Result<Option<PackModel>, AppError> {
        let pack = sqlx::query_as::<_, PackModel>(
            "SELECT id, owner_id, season_id, is_opened, created_at FROM packs WHERE id = $1",
        )
        .bind(pack_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(pack)
    }

    #[instrument(skip(self))]
    async fn list_unopened_packs(&self, owner_id: &str) -> Result<Vec<PackModel>, AppError> {
        let packs = sqlx::query_as::<_, PackModel>(
            "SELECT id, owner_id, season_id, is_opened, created_at FROM packs
             WHERE owner_id = $1 AND NOT is_opened ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(packs)
    }

    #[instrument(skip(self, drawn), fields(draw_count = drawn.len()))]
    async fn try_open_pack(
        &self,
        pack_id: &str,
        owner_id: &str,
        drawn: &[CardTemplateModel],
    ) -> Result<OpenPackResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            "UPDATE packs SET is_opened = TRUE WHERE id = $1 AND owner_id = $2 AND NOT is_opened",
        )
        .bind(pack_id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if flipped == 0 {
            let exists = sqlx::query("SELECT 1 FROM packs WHERE id = $1 AND owner_id = $2")
                .bind(pack_id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            return Ok(if exists {
                OpenPackResult::AlreadyOpened
            } else {
                OpenPackResult::PackNotFound
            });
        }

        let mut awarded = Vec::with_capacity(drawn.len());
        for template in drawn {
            let (level, merged) = award_copy_tx(&mut tx, owner_id, &template.type_id).await?;
            awarded.push(AwardedCard {
                template: template.clone(),
                level,
                merged,
            });
        }

        tx.commit().await?;
        info!("Pack opened in database");
        Ok(OpenPackResult::Opened(awarded))
    }
}

async fn insert_pack(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    pack: &PackModel,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO packs (id, owner_id, season_id, is_opened, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&pack.id)
    .bind(&pack.owner_id)
    .bind(&pack.season_id)
    .bind(pack.is_opened)
    .bind(pack.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
