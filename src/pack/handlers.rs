use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use super::{
    models::PackModel,
    types::{OpenPackRequest, OpenPackResponse},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// GET /packs
#[instrument(name = "list_packs", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn list_packs(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<PackModel>>, AppError> {
    let packs = state
        .pack_service
        .list_unopened_packs(&claims.player_id)
        .await?;
    Ok(Json(packs))
}

/// POST /packs/claim
#[instrument(name = "claim_pack", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn claim_pack(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<PackModel>, AppError> {
    let pack = state
        .pack_service
        .claim_or_purchase_pack(&claims.player_id, 0)
        .await?;
    Ok(Json(pack))
}

/// POST /packs/purchase
#[instrument(name = "purchase_pack", skip(state, claims), fields(player_id = %claims.player_id))]
pub async fn purchase_pack(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<PackModel>, AppError> {
    let price = state.pack_service.pack_price();
    let pack = state
        .pack_service
        .claim_or_purchase_pack(&claims.player_id, price)
        .await?;
    Ok(Json(pack))
}

/// HTTP handler for opening a pack
///
/// POST /packs/open
/// Returns the drawn cards with their resulting levels
#[instrument(name = "open_pack", skip(state, claims, request), fields(player_id = %claims.player_id))]
pub async fn open_pack(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    request: Option<Json<OpenPackRequest>>,
) -> Result<Json<OpenPackResponse>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let opened = state
        .pack_service
        .open_pack(request.pack_id.as_deref(), &claims.player_id)
        .await?;

    info!(pack_id = %opened.pack_id, cards = opened.cards.len(), "Pack opened via HTTP");
    Ok(Json(opened))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::shared::test_utils::{bearer_for, seeded_state};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn post(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", token)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn claim_then_open_then_reopen() {
        let (state, _) = seeded_state().await;
        let token = bearer_for(&state, "alice", false);
        let app = build_router(state);

        let claimed = app.clone().oneshot(post("/packs/claim", &token)).await.unwrap();
        assert_eq!(claimed.status(), StatusCode::OK);
        let body = axum::body::to_bytes(claimed.into_body(), usize::MAX)
            .await
            .unwrap();
        let pack: PackModel = serde_json::from_slice(&body).unwrap();
        assert!(!pack.is_opened);

        let open_body = format!(r#"{{"packId": "{}"}}"#, pack.id);
        let open = |body: String| {
            Request::builder()
                .method("POST")
                .uri("/packs/open")
                .header("content-type", "application/json")
                .header("Authorization", &token)
                .body(Body::from(body))
                .unwrap()
        };

        let opened = app.clone().oneshot(open(open_body.clone())).await.unwrap();
        assert_eq!(opened.status(), StatusCode::OK);
        let body = axum::body::to_bytes(opened.into_body(), usize::MAX)
            .await
            .unwrap();
        let response: OpenPackResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.cards.len(), 3);

        let again = app.oneshot(open(open_body)).await.unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn purchase_without_coins_is_payment_required() {
        let (state, _) = seeded_state().await;
        let token = bearer_for(&state, "alice", false);
        let app = build_router(state);

        let response = app.oneshot(post("/packs/purchase", &token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn open_without_body_uses_oldest_pack() {
        let (state, _) = seeded_state().await;
        let token = bearer_for(&state, "alice", false);
        let app = build_router(state);

        app.clone().oneshot(post("/packs/claim", &token)).await.unwrap();
        let response = app.oneshot(post("/packs/open", &token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
