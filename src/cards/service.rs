use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{CardTemplateModel, CollectionEntry},
    repository::{CardRepository, SellCopyResult},
    types::SellCopyResponse,
};
use crate::player::repository::PlayerRepository;
use crate::shared::AppError;

/// Service for card collections and selling copies back for coins
pub struct CardService {
    card_repository: Arc<dyn CardRepository + Send + Sync>,
    player_repository: Arc<dyn PlayerRepository + Send + Sync>,
}

impl CardService {
    pub fn new(
        card_repository: Arc<dyn CardRepository + Send + Sync>,
        player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    ) -> Self {
        Self {
            card_repository,
            player_repository,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_collection(&self, player_id: &str) -> Result<Vec<CollectionEntry>, AppError> {
        self.card_repository.list_collection(player_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_template(&self, type_id: &str) -> Result<CardTemplateModel, AppError> {
        self.card_repository
            .get_template(type_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Card type not found".to_string()))
    }

    /// Sells one unit of the copy. The row disappears when its last unit goes.
    #[instrument(skip(self))]
    pub async fn sell_copy(
        &self,
        copy_id: &str,
        player_id: &str,
    ) -> Result<SellCopyResponse, AppError> {
        let (coins_earned, remaining_level, balance) =
            match self.card_repository.try_sell_copy(copy_id, player_id).await? {
                SellCopyResult::Sold {
                    coins_earned,
                    remaining_level,
                    balance,
                } => (coins_earned, remaining_level, balance),
                SellCopyResult::CopyNotFound => {
                    return Err(AppError::NotFound("Card copy not found".to_string()))
                }
                SellCopyResult::NotOwned => {
                    warn!("Attempt to sell a copy owned by someone else");
                    return Err(AppError::NotOwned(
                        "You do not own this card".to_string(),
                    ));
                }
            };

        let rating = self.player_repository.refresh_rating(player_id).await?;
        info!(coins_earned, balance, rating, "Card copy sold");

        Ok(SellCopyResponse {
            coins_earned,
            remaining_level,
            balance,
            rating,
        })
    }
}
