use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::TradeModel,
    repository::{AcceptTradeResult, CancelTradeResult, CreateTradeResult, TradeRepository},
    types::CreateTradeRequest,
};
use crate::cards::repository::CardRepository;
use crate::player::repository::PlayerRepository;
use crate::shared::AppError;

/// Service for the trade offer lifecycle: pending, then completed or canceled
pub struct TradeService {
    trade_repository: Arc<dyn TradeRepository + Send + Sync>,
    card_repository: Arc<dyn CardRepository + Send + Sync>,
    player_repository: Arc<dyn PlayerRepository + Send + Sync>,
}

impl TradeService {
    pub fn new(
        trade_repository: Arc<dyn TradeRepository + Send + Sync>,
        card_repository: Arc<dyn CardRepository + Send + Sync>,
        player_repository: Arc<dyn PlayerRepository + Send + Sync>,
    ) -> Self {
        Self {
            trade_repository,
            card_repository,
            player_repository,
        }
    }

    /// Validates ownership and shape, then records a pending offer
    #[instrument(skip(self, request))]
    pub async fn create_trade(
        &self,
        player_id: &str,
        request: CreateTradeRequest,
    ) -> Result<TradeModel, AppError> {
        let offered = self
            .card_repository
            .get_copy(&request.offered_copy_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Offered card not found".to_string()))?;
        if offered.owner_id != player_id {
            warn!(copy_id = %offered.id, "Offer of a copy the player does not own");
            return Err(AppError::NotOwned(
                "You do not own the offered card".to_string(),
            ));
        }

        let trade = match request.requested_copy_id {
            Some(requested_id) => {
                if request.asking_price.unwrap_or(0) != 0 {
                    return Err(AppError::Validation(
                        "A card-for-card trade cannot also ask for coins".to_string(),
                    ));
                }
                let requested = self
                    .card_repository
                    .get_copy(&requested_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Requested card not found".to_string()))?;
                if requested.owner_id == player_id {
                    return Err(AppError::Validation(
                        "Cannot request a card you already own".to_string(),
                    ));
                }
                if requested.type_id == offered.type_id {
                    return Err(AppError::Validation(
                        "Cannot trade a card for a copy of the same card".to_string(),
                    ));
                }
                if let Some(to) = &request.offered_to_id {
                    if to != &requested.owner_id {
                        return Err(AppError::Validation(
                            "Offer must go to the owner of the requested card".to_string(),
                        ));
                    }
                }
                TradeModel::card_for_card(
                    player_id.to_string(),
                    requested.owner_id,
                    offered.id,
                    requested.id,
                )
            }
            None => {
                let price = request.asking_price.ok_or_else(|| {
                    AppError::Validation(
                        "Either requestedCopyId or askingPrice is required".to_string(),
                    )
                })?;
                if price <= 0 {
                    return Err(AppError::Validation(
                        "Asking price must be positive".to_string(),
                    ));
                }
                if request.offered_to_id.as_deref() == Some(player_id) {
                    return Err(AppError::Validation(
                        "Cannot sell a card to yourself".to_string(),
                    ));
                }
                TradeModel::card_for_coins(
                    player_id.to_string(),
                    request.offered_to_id,
                    offered.id,
                    price,
                )
            }
        };

        match self.trade_repository.try_create_trade(&trade).await? {
            CreateTradeResult::Created(trade) => {
                info!(trade_id = %trade.id, kind = ?trade.kind(), "Trade offered");
                Ok(trade)
            }
            CreateTradeResult::CopyInPendingTrade => Err(AppError::Conflict(
                "Card is already part of a pending trade".to_string(),
            )),
        }
    }

    /// Completes the trade; both parties' ratings are recomputed afterwards
    #[instrument(skip(self))]
    pub async fn accept_trade(
        &self,
        trade_id: &str,
        player_id: &str,
    ) -> Result<TradeModel, AppError> {
        let trade = match self
            .trade_repository
            .try_accept_trade(trade_id, player_id)
            .await?
        {
            AcceptTradeResult::Completed(trade) => trade,
            AcceptTradeResult::TradeNotFound => {
                return Err(AppError::NotFound("Trade not found".to_string()))
            }
            AcceptTradeResult::AlreadyResolved => return Err(AppError::AlreadyResolved),
            AcceptTradeResult::NotCounterparty => {
                return Err(AppError::Forbidden(
                    "This trade is not offered to you".to_string(),
                ))
            }
            AcceptTradeResult::StaleOffer(reason) => return Err(AppError::StaleOffer(reason)),
            AcceptTradeResult::InsufficientFunds { balance, required } => {
                return Err(AppError::InsufficientFunds { balance, required })
            }
        };

        for party in [trade.offered_by_id.as_str(), player_id] {
            let rating = self.player_repository.refresh_rating(party).await?;
            debug!(player_id = %party, rating, "Rating refreshed after trade");
        }

        info!(trade_id = %trade.id, "Trade accepted");
        Ok(trade)
    }

    #[instrument(skip(self))]
    pub async fn cancel_trade(
        &self,
        trade_id: &str,
        player_id: &str,
    ) -> Result<TradeModel, AppError> {
        match self
            .trade_repository
            .try_cancel_trade(trade_id, player_id)
            .await?
        {
            CancelTradeResult::Canceled(trade) => {
                info!(trade_id = %trade.id, "Trade canceled");
                Ok(trade)
            }
            CancelTradeResult::TradeNotFound => {
                Err(AppError::NotFound("Trade not found".to_string()))
            }
            CancelTradeResult::AlreadyResolved => Err(AppError::AlreadyResolved),
            CancelTradeResult::NotOfferer => Err(AppError::Forbidden(
                "Only the offerer can cancel a trade".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_offers(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        self.trade_repository.list_incoming_trades(player_id).await
    }

    #[instrument(skip(self))]
    pub async fn trade_history(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        self.trade_repository.list_trade_history(player_id).await
    }
}
