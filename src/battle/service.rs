use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::BattleModel,
    repository::{BattleRepository, RecordBattleResult},
    types::BattleResultResponse,
};
use crate::cards::{models::CardTemplateModel, repository::CardRepository};
use crate::player::repository::PlayerRepository;
use crate::season::ActiveSeason;
use crate::shared::AppError;

/// Service for head-to-head votes between active-season cards
pub struct BattleService {
    active_season: ActiveSeason,
    card_repository: Arc<dyn CardRepository + Send + Sync>,
    battle_repository: Arc<dyn BattleRepository + Send + Sync>,
    player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    vote_reward: i64,
}

impl BattleService {
    pub fn new(
        active_season: ActiveSeason,
        card_repository: Arc<dyn CardRepository + Send + Sync>,
        battle_repository: Arc<dyn BattleRepository + Send + Sync>,
        player_repository: Arc<dyn PlayerRepository + Send + Sync>,
        vote_reward: i64,
    ) -> Self {
        Self {
            active_season,
            card_repository,
            battle_repository,
            player_repository,
            vote_reward,
        }
    }

    /// Two distinct templates of the active season, chosen at random
    #[instrument(skip(self))]
    pub async fn get_battle_pair(
        &self,
    ) -> Result<(CardTemplateModel, CardTemplateModel), AppError> {
        let season = self.active_season.require().await?;
        let pool = self
            .card_repository
            .list_templates_by_season(&season.id)
            .await?;

        let picked: Vec<CardTemplateModel> = {
            let mut rng = rand::rng();
            pool.choose_multiple(&mut rng, 2).cloned().collect()
        };
        match <[CardTemplateModel; 2]>::try_from(picked) {
            Ok([first, second]) => Ok((first, second)),
            Err(_) => {
                debug!(pool_size = pool.len(), "Not enough cards for a battle");
                Err(AppError::EmptyPool)
            }
        }
    }

    /// Applies a vote to the shared templates and rewards the voter
    #[instrument(skip(self))]
    pub async fn resolve_battle(
        &self,
        winner_type_id: &str,
        loser_type_id: &str,
        voter_id: &str,
    ) -> Result<BattleResultResponse, AppError> {
        if winner_type_id == loser_type_id {
            return Err(AppError::Validation(
                "Winner and loser must be different cards".to_string(),
            ));
        }

        let battle = BattleModel::new(
            winner_type_id.to_string(),
            loser_type_id.to_string(),
            voter_id.to_string(),
        );
        let outcome = match self.battle_repository.try_record_battle(&battle).await? {
            RecordBattleResult::Recorded(outcome) => outcome,
            RecordBattleResult::CardNotInActiveSeason(type_id) => {
                warn!(%type_id, "Vote for card outside the active season");
                return Err(AppError::NotFound(format!(
                    "Card {} not found in the active season",
                    type_id
                )));
            }
        };

        let balance = self
            .player_repository
            .credit_coins(voter_id, self.vote_reward)
            .await?;

        info!(
            battle_id = %outcome.battle.id,
            winner_rating = outcome.winner.rating,
            loser_rating = outcome.loser.rating,
            balance,
            "Battle resolved"
        );

        Ok(BattleResultResponse {
            winner_new_rating: outcome.winner.rating,
            loser_new_rating: outcome.loser.rating,
            coins_earned: self.vote_reward,
            battle: outcome.battle,
        })
    }

    #[instrument(skip(self))]
    pub async fn battle_history(&self, limit: usize) -> Result<Vec<BattleModel>, AppError> {
        self.battle_repository.recent_battles(limit).await
    }
}
