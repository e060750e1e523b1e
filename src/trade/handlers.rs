use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::{models::TradeModel, types::CreateTradeRequest};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// HTTP handler for offering a trade
///
/// POST /trades
#[instrument(name = "create_trade", skip(state, claims, request), fields(player_id = %claims.player_id))]
pub async fn create_trade(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CreateTradeRequest>,
) -> Result<Json<TradeModel>, AppError> {
    info!(offered_copy_id = %request.offered_copy_id, "Creating trade");
    let trade = state
        .trade_service
        .create_trade(&claims.player_id, request)
        .await?;
    Ok(Json(trade))
}

/// POST /trades/:id/accept
#[instrument(name = "accept_trade", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn accept_trade(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeModel>, AppError> {
    let trade = state
        .trade_service
        .accept_trade(&trade_id, &claims.player_id)
        .await?;
    Ok(Json(trade))
}

/// POST /trades/:id/cancel
#[instrument(name = "cancel_trade", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn cancel_trade(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeModel>, AppError> {
    let trade = state
        .trade_service
        .cancel_trade(&trade_id, &claims.player_id)
        .await?;
    Ok(Json(trade))
}

/// GET /trades/offers
#[instrument(name = "list_offers", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn list_offers(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<TradeModel>>, AppError> {
    let trades = state.trade_service.list_offers(&claims.player_id).await?;
    Ok(Json(trades))
}

/// GET /trades/history
#[instrument(name = "trade_history", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn trade_history(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<TradeModel>>, AppError> {
    let trades = state.trade_service.trade_history(&claims.player_id).await?;
    Ok(Json(trades))
}
