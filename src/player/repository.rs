use async_trait::async_trait;
use sqlx::Row;
use tracing::{debug, instrument};

use super::models::PlayerModel;
use crate::shared::AppError;
use crate::store::{InMemoryStore, PostgresStore};

/// Trait for the player ledger: balances and aggregate trainer rating
#[async_trait]
pub trait PlayerRepository {
    /// Inserts the player if unknown and returns the stored row
    async fn ensure_player(&self, player: &PlayerModel) -> Result<PlayerModel, AppError>;
    /// The player with the trainer rating computed against the current
    /// active season
    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError>;

    /// Adds coins and returns the new balance
    async fn credit_coins(&self, player_id: &str, amount: i64) -> Result<i64, AppError>;

    /// Recomputes and stores the trainer rating from active-season copies
    async fn refresh_rating(&self, player_id: &str) -> Result<i64, AppError>;

    /// Players ordered by active-season trainer rating, highest first
    async fn top_players(&self, limit: usize) -> Result<Vec<PlayerModel>, AppError>;
}

#[async_trait]
impl PlayerRepository for InMemoryStore {
    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn ensure_player(&self, player: &PlayerModel) -> Result<PlayerModel, AppError> {
        let mut tables = self.tables()?;
        let stored = tables
            .players
            .entry(player.id.clone())
            .or_insert_with(|| {
                debug!("Registering new player in memory");
                player.clone()
            });
        Ok(stored.clone())
    }

    #[instrument(skip(self))]
    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables
            .players
            .get(player_id)
            .map(|player| tables.with_live_rating(player)))
    }

    #[instrument(skip(self))]
    async fn credit_coins(&self, player_id: &str, amount: i64) -> Result<i64, AppError> {
        let mut tables = self.tables()?;
        let player = tables
            .players
            .get_mut(player_id)
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        player.coins += amount;
        Ok(player.coins)
    }

    #[instrument(skip(self))]
    async fn refresh_rating(&self, player_id: &str) -> Result<i64, AppError> {
        let mut tables = self.tables()?;
        let rating = tables.trainer_rating(player_id);
        let player = tables
            .players
            .get_mut(player_id)
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        player.rating = rating;

        debug!(rating, "Trainer rating refreshed in memory");
        Ok(rating)
    }

    #[instrument(skip(self))]
    async fn top_players(&self, limit: usize) -> Result<Vec<PlayerModel>, AppError> {
        let tables = self.tables()?;
        let mut players: Vec<PlayerModel> = tables
            .players
            .values()
            .map(|player| tables.with_live_rating(player))
            .collect();
        players.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.username.cmp(&b.username)));
        players.truncate(limit);
        Ok(players)
    }
}

/// Player columns with the rating summed over active-season copies
const PLAYER_WITH_RATING: &str = "SELECT p.id, p.username, p.coins, COALESCE(r.rating, 0)::INT8 AS rating, p.last_pack_claim
     FROM players p
     LEFT JOIN (
        SELECT c.owner_id, SUM(t.rating::INT8 * c.level)::INT8 AS rating
        FROM owned_copies c
        JOIN card_templates t ON t.type_id = c.type_id
        JOIN seasons s ON s.id = t.season_id
        WHERE s.is_active
        GROUP BY c.owner_id
     ) r ON r.owner_id = p.id";

#[async_trait]
impl PlayerRepository for PostgresStore {
    #[instrument(skip(self, player), fields(player_id = %player.id))]
    async fn ensure_player(&self, player: &PlayerModel) -> Result<PlayerModel, AppError> {
        sqlx::query(
            "INSERT INTO players (id, username, coins, rating, last_pack_claim)
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&player.id)
        .bind(&player.username)
        .bind(player.coins)
        .bind(player.rating)
        .bind(player.last_pack_claim)
        .execute(&self.pool)
        .await?;

        self.get_player(&player.id)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Player vanished after insert".to_string()))
    }

    #[instrument(skip(self))]
    async fn get_player(&self, player_id: &str) -> Result<Option<PlayerModel>, AppError> {
        let player =
            sqlx::query_as::<_, PlayerModel>(&format!("{} WHERE p.id = $1", PLAYER_WITH_RATING))
                .bind(player_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(player)
    }

    #[instrument(skip(self))]
    async fn credit_coins(&self, player_id: &str, amount: i64) -> Result<i64, AppError> {
        let row = sqlx::query("UPDATE players SET coins = coins + $1 WHERE id = $2 RETURNING coins")
            .bind(amount)
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        Ok(row.try_get("coins")?)
    }

    #[instrument(skip(self))]
    async fn refresh_rating(&self, player_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "UPDATE players SET rating = COALESCE((
                SELECT SUM(t.rating::INT8 * c.level)::INT8
                FROM owned_copies c
                JOIN card_templates t ON t.type_id = c.type_id
                JOIN seasons s ON s.id = t.season_id
                WHERE c.owner_id = $1 AND s.is_active
             ), 0)
             WHERE id = $1 RETURNING rating",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        Ok(row.try_get("rating")?)
    }

    #[instrument(skip(self))]
    async fn top_players(&self, limit: usize) -> Result<Vec<PlayerModel>, AppError> {
        let players = sqlx::query_as::<_, PlayerModel>(&format!(
            "{} ORDER BY rating DESC, p.username LIMIT $1",
            PLAYER_WITH_RATING
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }
}
