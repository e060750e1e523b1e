use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    models::{CardTemplateModel, CollectionEntry},
    types::{SellCopyRequest, SellCopyResponse},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// GET /cards
/// Returns the caller's copies joined with their templates
#[instrument(name = "list_cards", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<CollectionEntry>>, AppError> {
    let collection = state.card_service.list_collection(&claims.player_id).await?;
    info!(copy_count = collection.len(), "Collection listed");
    Ok(Json(collection))
}

/// GET /cards/types/:type_id
#[instrument(name = "get_card_type", skip(state))]
pub async fn get_card_type(
    State(state): State<AppState>,
    Path(type_id): Path<String>,
) -> Result<Json<CardTemplateModel>, AppError> {
    let template = state.card_service.get_template(&type_id).await?;
    Ok(Json(template))
}

/// POST /cards/sell
#[instrument(name = "sell_card", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn sell_card(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<SellCopyRequest>,
) -> Result<Json<SellCopyResponse>, AppError> {
    let sold = state
        .card_service
        .sell_copy(&request.copy_id, &claims.player_id)
        .await?;
    Ok(Json(sold))
}
