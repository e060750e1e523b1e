// Public API - what other modules can use
pub use handlers::{current_season, list_seasons, season_leaderboard, start_season};
pub use service::{SeasonRollover, SeasonService};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;

use std::sync::Arc;

use crate::shared::AppError;
use models::SeasonModel;
use repository::SeasonRepository;

/// The one place season-scoped operations ask "which season is live?"
#[derive(Clone)]
pub struct ActiveSeason {
    repository: Arc<dyn SeasonRepository + Send + Sync>,
}

impl ActiveSeason {
    pub fn new(repository: Arc<dyn SeasonRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    pub async fn current(&self) -> Result<Option<SeasonModel>, AppError> {
        self.repository.get_active_season().await
    }

    /// Like [`current`](Self::current) but treats no active season as NotFound
    pub async fn require(&self) -> Result<SeasonModel, AppError> {
        self.current()
            .await?
            .ok_or_else(|| AppError::NotFound("No active season found".to_string()))
    }
}
