use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::{
    models::SeasonModel,
    service::SeasonRollover,
    types::{LeaderboardQuery, LeaderboardResponse, StartSeasonRequest},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// GET /seasons
#[instrument(name = "list_seasons", skip(state))]
pub async fn list_seasons(
    State(state): State<AppState>,
) -> Result<Json<Vec<SeasonModel>>, AppError> {
    let seasons = state.season_service.list_seasons().await?;
    Ok(Json(seasons))
}

/// GET /seasons/current
#[instrument(name = "current_season", skip(state))]
pub async fn current_season(
    State(state): State<AppState>,
) -> Result<Json<SeasonModel>, AppError> {
    let season = state.season_service.current_season().await?;
    Ok(Json(season))
}

/// GET /seasons/:id/leaderboard
#[instrument(name = "season_leaderboard", skip(state))]
pub async fn season_leaderboard(
    State(state): State<AppState>,
    Path(season_id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let (season, cards) = state
        .season_service
        .season_leaderboard(&season_id, query.limit())
        .await?;
    Ok(Json(LeaderboardResponse { season, cards }))
}

/// HTTP handler for season rollover
///
/// POST /seasons
/// Admin only. Deactivates the current season and generates the new pool.
#[instrument(name = "start_season", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn start_season(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<StartSeasonRequest>,
) -> Result<Json<SeasonRollover>, AppError> {
    if !claims.admin {
        warn!("Non-admin attempted a season rollover");
        return Err(AppError::Forbidden(
            "Only admins can start a season".to_string(),
        ));
    }

    let rollover = state.season_service.start_new_season(&request.name).await?;
    info!(
        season_id = %rollover.season.id,
        cards_created = rollover.cards_created,
        "Season rollover completed"
    );
    Ok(Json(rollover))
}

#[cfg(test)]
mod tests {
    use crate::routes::build_router;
    use crate::shared::test_utils::{bearer_for, seeded_state};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn rollover_request(token: &str, name: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/seasons")
            .header("content-type", "application/json")
            .header("Authorization", token)
            .body(Body::from(format!(r#"{{"name": "{}"}}"#, name)))
            .unwrap()
    }

    #[tokio::test]
    async fn non_admin_rollover_is_forbidden() {
        let (state, _) = seeded_state().await;
        let token = bearer_for(&state, "player-1", false);
        let app = build_router(state);

        let response = app
            .oneshot(rollover_request(&token, "Season 2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_rollover_reports_pool() {
        let (state, _) = seeded_state().await;
        let token = bearer_for(&state, "admin", true);
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(rollover_request(&token, "Season 2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["season"]["name"], "Season 2");
        assert_eq!(json["cardsCreated"], 3);
        assert_eq!(json["failedPairings"], 0);

        let current = app
            .oneshot(
                Request::builder()
                    .uri("/seasons/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(current.into_body(), usize::MAX)
            .await
            .unwrap();
        let season: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(season["name"], "Season 2");
    }

    #[tokio::test]
    async fn leaderboard_of_unknown_season_is_404() {
        let (state, _) = seeded_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/seasons/nope/leaderboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
