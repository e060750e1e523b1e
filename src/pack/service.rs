use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    draw::draw_with_replacement,
    models::PackModel,
    repository::{ClaimPackResult, OpenPackResult, PackRepository, PurchasePackResult},
    types::OpenPackResponse,
};
use crate::cards::repository::CardRepository;
use crate::player::repository::PlayerRepository;
use crate::season::ActiveSeason;
use crate::shared::AppError;

/// Service for pack acquisition and opening
pub struct PackService {
    active_season: ActiveSeason,
    pack_repository: Arc<dyn PackRepository + Send + Sync>,
    card_repository: Arc<dyn CardRepository + Send + Sync>,
    player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    pack_price: i64,
    cards_per_pack: usize,
}

impl PackService {
    pub fn new(
        active_season: ActiveSeason,
        pack_repository: Arc<dyn PackRepository + Send + Sync>,
        card_repository: Arc<dyn CardRepository + Send + Sync>,
        player_repository: Arc<dyn PlayerRepository + Send + Sync>,
        pack_price: i64,
        cards_per_pack: usize,
    ) -> Self {
        Self {
            active_season,
            pack_repository,
            card_repository,
            player_repository,
            pack_price,
            // A pack always awards at least one card
            cards_per_pack: cards_per_pack.max(1),
        }
    }

    pub fn pack_price(&self) -> i64 {
        self.pack_price
    }

    /// Free pack, once per UTC day
    #[instrument(skip(self))]
    pub async fn claim_daily_pack(&self, player_id: &str) -> Result<PackModel, AppError> {
        let season = self.active_season.require().await?;
        let pack = PackModel::new(player_id.to_string(), season.id);

        match self
            .pack_repository
            .claim_daily_pack(&pack, Utc::now())
            .await?
        {
            ClaimPackResult::Claimed => {
                info!(pack_id = %pack.id, "Daily pack claimed");
                Ok(pack)
            }
            ClaimPackResult::AlreadyClaimed => Err(AppError::AlreadyClaimed),
            ClaimPackResult::PlayerNotFound => {
                Err(AppError::NotFound("Player not found".to_string()))
            }
        }
    }

    /// Buys a pack at the configured price
    #[instrument(skip(self))]
    pub async fn purchase_pack(&self, player_id: &str) -> Result<PackModel, AppError> {
        let season = self.active_season.require().await?;
        let pack = PackModel::new(player_id.to_string(), season.id);

        match self
            .pack_repository
            .purchase_pack(&pack, self.pack_price)
            .await?
        {
            PurchasePackResult::Purchased { balance } => {
                info!(pack_id = %pack.id, balance, "Pack purchased");
                Ok(pack)
            }
            PurchasePackResult::InsufficientFunds { balance } => {
                debug!(balance, price = self.pack_price, "Pack purchase declined");
                Err(AppError::InsufficientFunds {
                    balance,
                    required: self.pack_price,
                })
            }
            PurchasePackResult::PlayerNotFound => {
                Err(AppError::NotFound("Player not found".to_string()))
            }
        }
    }

    /// Cost 0 is the daily claim, the pack price is a purchase
    #[instrument(skip(self))]
    pub async fn claim_or_purchase_pack(
        &self,
        player_id: &str,
        cost: i64,
    ) -> Result<PackModel, AppError> {
        if cost == 0 {
            self.claim_daily_pack(player_id).await
        } else if cost == self.pack_price {
            self.purchase_pack(player_id).await
        } else {
            Err(AppError::Validation(format!(
                "Pack cost must be 0 or {}",
                self.pack_price
            )))
        }
    }

    #[instrument(skip(self))]
    pub async fn list_unopened_packs(&self, player_id: &str) -> Result<Vec<PackModel>, AppError> {
        self.pack_repository.list_unopened_packs(player_id).await
    }

    /// Opens the given pack, or the player's oldest unopened one when no id
    /// is given. Draws from the pack's own season.
    #[instrument(skip(self))]
    pub async fn open_pack(
        &self,
        pack_id: Option<&str>,
        player_id: &str,
    ) -> Result<OpenPackResponse, AppError> {
        let pack = match pack_id {
            Some(id) => self
                .pack_repository
                .get_pack(id)
                .await?
                .filter(|pack| pack.owner_id == player_id)
                .ok_or_else(|| AppError::NotFound("Pack not found".to_string()))?,
            None => self
                .pack_repository
                .list_unopened_packs(player_id)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound("No unopened packs".to_string()))?,
        };
        if pack.is_opened {
            return Err(AppError::AlreadyOpened);
        }

        let pool = self
            .card_repository
            .list_templates_by_season(&pack.season_id)
            .await?;
        if pool.is_empty() {
            warn!(season_id = %pack.season_id, "Cannot open pack from an empty pool");
            return Err(AppError::EmptyPool);
        }

        let drawn = {
            let mut rng = rand::rng();
            draw_with_replacement(&pool, self.cards_per_pack, &mut rng)
        };

        let cards = match self
            .pack_repository
            .try_open_pack(&pack.id, player_id, &drawn)
            .await?
        {
            OpenPackResult::Opened(cards) => cards,
            OpenPackResult::PackNotFound => {
                return Err(AppError::NotFound("Pack not found".to_string()))
            }
            OpenPackResult::AlreadyOpened => return Err(AppError::AlreadyOpened),
        };

        let rating = self.player_repository.refresh_rating(player_id).await?;
        info!(
            pack_id = %pack.id,
            merged = cards.iter().filter(|c| c.merged).count(),
            rating,
            "Pack opened"
        );

        Ok(OpenPackResponse {
            pack_id: pack.id,
            cards,
            rating,
        })
    }
}
