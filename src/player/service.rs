use std::sync::Arc;
use tracing::{debug, instrument};

use super::{models::PlayerModel, repository::PlayerRepository, types::TrainerSummary};
use crate::shared::AppError;

/// Service for trainer profiles and the trainer leaderboard
pub struct PlayerService {
    repository: Arc<dyn PlayerRepository + Send + Sync>,
}

impl PlayerService {
    pub fn new(repository: Arc<dyn PlayerRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Registers a first-seen identity with an empty wallet
    #[instrument(skip(self))]
    pub async fn ensure_player(
        &self,
        player_id: &str,
        username: &str,
    ) -> Result<PlayerModel, AppError> {
        self.repository
            .ensure_player(&PlayerModel::new(
                player_id.to_string(),
                username.to_string(),
            ))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, player_id: &str) -> Result<PlayerModel, AppError> {
        self.repository
            .get_player(player_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn top_trainers(&self, limit: usize) -> Result<Vec<TrainerSummary>, AppError> {
        let players = self.repository.top_players(limit).await?;
        debug!(count = players.len(), "Top trainers loaded");

        Ok(players
            .into_iter()
            .enumerate()
            .map(|(index, player)| TrainerSummary {
                rank: index + 1,
                id: player.id,
                username: player.username,
                rating: player.rating,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::repository::CardRepository;
    use crate::season::repository::SeasonRepository;
    use crate::shared::test_utils::seeded_state;
    use crate::store::InMemoryStore;

    /// Gives `player_id` `level` units of the first active-season template
    async fn grant(store: &InMemoryStore, player_id: &str, level: i32) {
        store
            .ensure_player(&PlayerModel::new(player_id.into(), player_id.into()))
            .await
            .unwrap();
        let season = store.get_active_season().await.unwrap().unwrap();
        let type_id = store.list_templates_by_season(&season.id).await.unwrap()[0]
            .type_id
            .clone();
        let mut tables = store.tables().unwrap();
        for _ in 0..level {
            tables.award_copy(player_id, &type_id);
        }
    }

    #[tokio::test]
    async fn top_trainers_are_ranked_from_one() {
        let (state, store) = seeded_state().await;
        grant(&store, "low", 1).await;
        grant(&store, "high", 4).await;

        let top = state.player_service.top_trainers(10).await.unwrap();

        assert_eq!(top[0].id, "high");
        assert_eq!(top[0].rating, 4000);
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].rank, 2);
    }

    #[tokio::test]
    async fn rollover_resets_trainer_ratings() {
        let (state, store) = seeded_state().await;
        grant(&store, "alice", 3).await;
        assert_eq!(state.player_service.get_profile("alice").await.unwrap().rating, 3000);

        state
            .season_service
            .start_new_season("Season 2")
            .await
            .unwrap();

        let profile = state.player_service.get_profile("alice").await.unwrap();
        assert_eq!(profile.rating, 0);
        let top = state.player_service.top_trainers(10).await.unwrap();
        assert_eq!(top[0].rating, 0);
    }

    #[tokio::test]
    async fn profile_of_unknown_player_is_not_found() {
        let service = PlayerService::new(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            service.get_profile("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ensure_player_is_idempotent() {
        let service = PlayerService::new(Arc::new(InMemoryStore::new()));

        service.ensure_player("alice", "Alice").await.unwrap();
        let again = service.ensure_player("alice", "Renamed").await.unwrap();

        assert_eq!(again.username, "Alice");
        assert_eq!(again.coins, 0);
    }
}
