use axum::{
    extract::{Query, State},
    Extension, Json,
};
use tracing::instrument;

use super::{
    models::PlayerModel,
    types::{TopQuery, TrainerSummary},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// GET /trainers/me
#[instrument(name = "get_profile", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<PlayerModel>, AppError> {
    let player = state.player_service.get_profile(&claims.player_id).await?;
    Ok(Json(player))
}

/// GET /trainers/top
#[instrument(name = "top_trainers", skip(state))]
pub async fn top_trainers(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TrainerSummary>>, AppError> {
    let trainers = state.player_service.top_trainers(query.limit()).await?;
    Ok(Json(trainers))
}
