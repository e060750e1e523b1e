use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::elo;
use super::models::{BattleModel, BattleOutcome};
use crate::cards::models::CardTemplateModel;
use crate::shared::AppError;
use crate::store::{InMemoryStore, PostgresStore};

/// Result of attempting to apply a vote
#[derive(Debug, Clone)]
pub enum RecordBattleResult {
    Recorded(BattleOutcome),
    /// The type id is unknown or its template is not in the active season
    CardNotInActiveSeason(String),
}

/// Trait for battle repository operations
#[async_trait]
pub trait BattleRepository {
    /// Applies the rating update to both shared templates and stores the
    /// battle row, as one unit
    async fn try_record_battle(&self, battle: &BattleModel)
        -> Result<RecordBattleResult, AppError>;

    /// Most recent battles, newest first
    async fn recent_battles(&self, limit: usize) -> Result<Vec<BattleModel>, AppError>;
}

fn apply_result(winner: &mut CardTemplateModel, loser: &mut CardTemplateModel) {
    let (winner_rating, loser_rating) = elo::update_ratings(winner.rating, loser.rating);
    winner.rating = winner_rating;
    winner.wins += 1;
    loser.rating = loser_rating;
    loser.losses += 1;
}

#[async_trait]
impl BattleRepository for InMemoryStore {
    #[instrument(skip(self, battle), fields(battle_id = %battle.id))]
    async fn try_record_battle(
        &self,
        battle: &BattleModel,
    ) -> Result<RecordBattleResult, AppError> {
        let mut tables = self.tables()?;
        let Some(active_id) = tables.active_season_id().map(str::to_string) else {
            return Ok(RecordBattleResult::CardNotInActiveSeason(
                battle.winner_type_id.clone(),
            ));
        };

        let mut pair = Vec::with_capacity(2);
        for type_id in [&battle.winner_type_id, &battle.loser_type_id] {
            match tables.templates.get(type_id) {
                Some(template) if template.season_id == active_id => pair.push(template.clone()),
                _ => return Ok(RecordBattleResult::CardNotInActiveSeason(type_id.clone())),
            }
        }
        let (mut winner, mut loser) = (pair.remove(0), pair.remove(0));
        apply_result(&mut winner, &mut loser);

        tables.templates.insert(winner.type_id.clone(), winner.clone());
        tables.templates.insert(loser.type_id.clone(), loser.clone());
        tables.battles.push(battle.clone());

        info!(
            winner_rating = winner.rating,
            loser_rating = loser.rating,
            "Battle recorded in memory"
        );
        Ok(RecordBattleResult::Recorded(BattleOutcome {
            battle: battle.clone(),
            winner,
            loser,
        }))
    }

    #[instrument(skip(self))]
    async fn recent_battles(&self, limit: usize) -> Result<Vec<BattleModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.battles.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl BattleRepository for PostgresStore {
    #[instrument(skip(self, battle), fields(battle_id = %battle.id))]
    async fn try_record_battle(
        &self,
        battle: &BattleModel,
    ) -> Result<RecordBattleResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // Locks in type id order so opposing votes on the same pair cannot deadlock
        let locked = sqlx::query_as::<_, CardTemplateModel>(
            "SELECT t.type_id, t.teacher_name, t.subject, t.quote, t.rating, t.wins, t.losses, t.season_id
             FROM card_templates t JOIN seasons s ON s.id = t.season_id
             WHERE t.type_id = ANY($1) AND s.is_active
             ORDER BY t.type_id FOR UPDATE OF t",
        )
        .bind(vec![
            battle.winner_type_id.clone(),
            battle.loser_type_id.clone(),
        ])
        .fetch_all(&mut *tx)
        .await?;

        let find = |type_id: &str| locked.iter().find(|t| t.type_id == type_id).cloned();
        let Some(mut winner) = find(&battle.winner_type_id) else {
            return Ok(RecordBattleResult::CardNotInActiveSeason(
                battle.winner_type_id.clone(),
            ));
        };
        let Some(mut loser) = find(&battle.loser_type_id) else {
            return Ok(RecordBattleResult::CardNotInActiveSeason(
                battle.loser_type_id.clone(),
            ));
        };
        apply_result(&mut winner, &mut loser);

        for template in [&winner, &loser] {
            sqlx::query("UPDATE card_templates SET rating = $1, wins = $2, losses = $3 WHERE type_id = $4")
                .bind(template.rating)
                .bind(template.wins)
                .bind(template.losses)
                .bind(&template.type_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO battles (id, winner_type_id, loser_type_id, voter_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&battle.id)
        .bind(&battle.winner_type_id)
        .bind(&battle.loser_type_id)
        .bind(&battle.voter_id)
        .bind(battle.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            winner_rating = winner.rating,
            loser_rating = loser.rating,
            "Battle recorded in database"
        );
        Ok(RecordBattleResult::Recorded(BattleOutcome {
            battle: battle.clone(),
            winner,
            loser,
        }))
    }

    #[instrument(skip(self))]
    async fn recent_battles(&self, limit: usize) -> Result<Vec<BattleModel>, AppError> {
        let battles = sqlx::query_as::<_, BattleModel>(
            "SELECT id, winner_type_id, loser_type_id, voter_id, created_at FROM battles
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(battles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::repository::CardRepository;
    use crate::season::{models::SeasonModel, repository::SeasonRepository};

    async fn store_with_pair() -> (InMemoryStore, String, String) {
        let store = InMemoryStore::new();
        let season = SeasonModel::new("Season 1".into(), 7);
        store.activate_season(&season).await.unwrap();

        let smith = CardTemplateModel::new(
            "Mr. Smith".into(),
            "Math".into(),
            "Show your work.".into(),
            season.id.clone(),
        );
        let lee = CardTemplateModel::new(
            "Dr. Lee".into(),
            "Biology".into(),
            "Life finds a way.".into(),
            season.id.clone(),
        );
        store.insert_template(&smith).await.unwrap();
        store.insert_template(&lee).await.unwrap();
        (store, smith.type_id, lee.type_id)
    }

    #[tokio::test]
    async fn vote_updates_shared_templates() {
        let (store, smith, lee) = store_with_pair().await;

        let result = store
            .try_record_battle(&BattleModel::new(smith.clone(), lee.clone(), "voter".into()))
            .await
            .unwrap();

        let RecordBattleResult::Recorded(outcome) = result else {
            panic!("battle should be recorded");
        };
        assert_eq!((outcome.winner.rating, outcome.loser.rating), (1016, 984));

        let winner = store.get_template(&smith).await.unwrap().unwrap();
        let loser = store.get_template(&lee).await.unwrap().unwrap();
        assert_eq!((winner.rating, winner.wins, winner.losses), (1016, 1, 0));
        assert_eq!((loser.rating, loser.wins, loser.losses), (984, 0, 1));
    }

    #[tokio::test]
    async fn previous_season_card_is_rejected() {
        let (store, smith, lee) = store_with_pair().await;
        store
            .activate_season(&SeasonModel::new("Season 2".into(), 7))
            .await
            .unwrap();

        let result = store
            .try_record_battle(&BattleModel::new(smith.clone(), lee, "voter".into()))
            .await
            .unwrap();

        assert!(matches!(result, RecordBattleResult::CardNotInActiveSeason(id) if id == smith));
        assert!(store.recent_battles(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_battles_newest_first() {
        let (store, smith, lee) = store_with_pair().await;
        for voter in ["first", "second", "third"] {
            store
                .try_record_battle(&BattleModel::new(smith.clone(), lee.clone(), voter.into()))
                .await
                .unwrap();
        }

        let recent = store.recent_battles(2).await.unwrap();
        let voters: Vec<&str> = recent.iter().map(|b| b.voter_id.as_str()).collect();
        assert_eq!(voters, vec!["third", "second"]);
    }
}
