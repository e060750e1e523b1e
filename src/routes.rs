use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::{battle, cards, pack, player, season, session, trade};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full HTTP surface. Routes that act on behalf of a player sit
/// behind the bearer-token middleware.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/seasons", get(season::list_seasons))
        .route("/seasons/current", get(season::current_season))
        .route("/seasons/:id/leaderboard", get(season::season_leaderboard))
        .route("/trainers/top", get(player::top_trainers));

    let protected = Router::new()
        .route("/seasons", post(season::start_season))
        .route("/battles/pair", get(battle::get_battle_pair))
        .route("/battles/vote", post(battle::vote))
        .route("/battles/history", get(battle::battle_history))
        .route("/packs", get(pack::list_packs))
        .route("/packs/claim", post(pack::claim_pack))
        .route("/packs/purchase", post(pack::purchase_pack))
        .route("/packs/open", post(pack::open_pack))
        .route("/cards", get(cards::list_cards))
        .route("/cards/types/:type_id", get(cards::get_card_type))
        .route("/cards/sell", post(cards::sell_card))
        .route("/trades", post(trade::create_trade))
        .route("/trades/offers", get(trade::list_offers))
        .route("/trades/history", get(trade::trade_history))
        .route("/trades/:id/accept", post(trade::accept_trade))
        .route("/trades/:id/cancel", post(trade::cancel_trade))
        .route("/trainers/me", get(player::get_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::jwt_auth,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
