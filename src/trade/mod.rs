// Public API - what other modules can use
pub use handlers::{accept_trade, cancel_trade, create_trade, list_offers, trade_history};
pub use service::TradeService;
pub use types::CreateTradeRequest;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;
