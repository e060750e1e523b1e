use axum::{
    extract::{Query, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    models::BattleModel,
    types::{BattlePairResponse, BattleResultResponse, HistoryQuery, VoteRequest},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// GET /battles/pair
#[instrument(name = "get_battle_pair", skip(state))]
pub async fn get_battle_pair(
    State(state): State<AppState>,
) -> Result<Json<BattlePairResponse>, AppError> {
    let (first, second) = state.battle_service.get_battle_pair().await?;
    Ok(Json(BattlePairResponse { first, second }))
}

/// HTTP handler for a battle vote
///
/// POST /battles/vote
/// Updates both card ratings and credits the voter
#[instrument(name = "vote", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn vote(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<BattleResultResponse>, AppError> {
    info!(
        winner = %request.winner_type_id,
        loser = %request.loser_type_id,
        "Vote received"
    );

    let result = state
        .battle_service
        .resolve_battle(
            &request.winner_type_id,
            &request.loser_type_id,
            &claims.player_id,
        )
        .await?;
    Ok(Json(result))
}

/// GET /battles/history
#[instrument(name = "battle_history", skip(state))]
pub async fn battle_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BattleModel>>, AppError> {
    let battles = state.battle_service.battle_history(query.limit()).await?;
    Ok(Json(battles))
}
