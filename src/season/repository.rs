use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::models::SeasonModel;
use crate::shared::AppError;
use crate::store::{InMemoryStore, PostgresStore};

/// Trait for season repository operations
#[async_trait]
pub trait SeasonRepository {
    async fn get_active_season(&self) -> Result<Option<SeasonModel>, AppError>;
    async fn get_season(&self, season_id: &str) -> Result<Option<SeasonModel>, AppError>;

    /// All seasons, newest first
    async fn list_seasons(&self) -> Result<Vec<SeasonModel>, AppError>;

    /// Atomically clears `is_active` on every season and inserts `season` as
    /// the only active one. Returns how many seasons were deactivated.
    async fn activate_season(&self, season: &SeasonModel) -> Result<u64, AppError>;
}

#[async_trait]
impl SeasonRepository for InMemoryStore {
    #[instrument(skip(self))]
    async fn get_active_season(&self) -> Result<Option<SeasonModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.seasons.values().find(|s| s.is_active).cloned())
    }

    #[instrument(skip(self))]
    async fn get_season(&self, season_id: &str) -> Result<Option<SeasonModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.seasons.get(season_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_seasons(&self) -> Result<Vec<SeasonModel>, AppError> {
        let tables = self.tables()?;
        let mut seasons: Vec<SeasonModel> = tables.seasons.values().cloned().collect();
        seasons.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(seasons)
    }

    #[instrument(skip(self, season), fields(season_id = %season.id))]
    async fn activate_season(&self, season: &SeasonModel) -> Result<u64, AppError> {
        let mut tables = self.tables()?;

        let mut deactivated = 0;
        for existing in tables.seasons.values_mut().filter(|s| s.is_active) {
            existing.is_active = false;
            deactivated += 1;
        }

        let mut season = season.clone();
        season.is_active = true;
        tables.seasons.insert(season.id.clone(), season);

        info!(deactivated, "Season activated in memory");
        Ok(deactivated)
    }
}

#[async_trait]
impl SeasonRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn get_active_season(&self) -> Result<Option<SeasonModel>, AppError> {
        let season = sqlx::query_as::<_, SeasonModel>(
            "SELECT id, name, start_date, end_date, is_active FROM seasons WHERE is_active",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(season)
    }

    #[instrument(skip(self))]
    async fn get_season(&self, season_id: &str) -> Result<Option<SeasonModel>, AppError> {
        let season = sqlx::query_as::<_, SeasonModel>(
            "SELECT id, name, start_date, end_date, is_active FROM seasons WHERE id = $1",
        )
        .bind(season_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(season)
    }

    #[instrument(skip(self))]
    async fn list_seasons(&self) -> Result<Vec<SeasonModel>, AppError> {
        let seasons = sqlx::query_as::<_, SeasonModel>(
            "SELECT id, name, start_date, end_date, is_active FROM seasons ORDER BY start_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(seasons)
    }

    #[instrument(skip(self, season), fields(season_id = %season.id))]
    async fn activate_season(&self, season: &SeasonModel) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent rollovers queue here rather than racing on the flag
        sqlx::query("LOCK TABLE seasons IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let deactivated = sqlx::query("UPDATE seasons SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "INSERT INTO seasons (id, name, start_date, end_date, is_active) VALUES ($1, $2, $3, $4, TRUE)",
        )
        .bind(&season.id)
        .bind(&season.name)
        .bind(season.start_date)
        .bind(season.end_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(deactivated, "Season activated in database");
        Ok(deactivated)
    }
}
