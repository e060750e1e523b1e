use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::battle::BattleService;
use crate::cards::CardService;
use crate::config::AppConfig;
use crate::pack::PackService;
use crate::player::PlayerService;
use crate::season::{ActiveSeason, SeasonService};
use crate::session::TokenConfig;
use crate::store::Store;
use crate::trade::TradeService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_config: TokenConfig,
    pub season_service: Arc<SeasonService>,
    pub battle_service: Arc<BattleService>,
    pub pack_service: Arc<PackService>,
    pub card_service: Arc<CardService>,
    pub trade_service: Arc<TradeService>,
    pub player_service: Arc<PlayerService>,
}

impl AppState {
    /// Wires every service against a single backing store
    pub fn new<S: Store>(store: Arc<S>, config: AppConfig) -> Self {
        let active_season = ActiveSeason::new(store.clone());

        let season_service = Arc::new(SeasonService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            config.season_length_days,
        ));
        let battle_service = Arc::new(BattleService::new(
            active_season.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.vote_reward,
        ));
        let pack_service = Arc::new(PackService::new(
            active_season.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.pack_price,
            config.cards_per_pack,
        ));
        let card_service = Arc::new(CardService::new(store.clone(), store.clone()));
        let trade_service = Arc::new(TradeService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let player_service = Arc::new(PlayerService::new(store));

        Self {
            token_config: TokenConfig::new(config.jwt_secret.clone()),
            config: Arc::new(config),
            season_service,
            battle_service,
            pack_service,
            card_service,
            trade_service,
            player_service,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not owned: {0}")]
    NotOwned(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Trade already resolved")]
    AlreadyResolved,

    #[error("Stale offer: {0}")]
    StaleOffer(String),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("Card pool is empty")]
    EmptyPool,

    #[error("Pack already opened")]
    AlreadyOpened,

    #[error("Daily pack already claimed")]
    AlreadyClaimed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Whether the failure came from infrastructure rather than a domain rule
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DatabaseError(_) | AppError::Internal)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotOwned(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_)
            | AppError::AlreadyResolved
            | AppError::StaleOffer(_)
            | AppError::AlreadyOpened
            | AppError::AlreadyClaimed => StatusCode::CONFLICT,
            AppError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::EmptyPool => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation(_) | AppError::JwtError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_message = match self {
            AppError::NotFound(msg)
            | AppError::NotOwned(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::StaleOffer(msg)
            | AppError::Validation(msg)
            | AppError::JwtError(msg)
            | AppError::Unauthorized(msg) => msg,
            AppError::DatabaseError(msg) => format!("Database error: {}", msg),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
