// Public API - what other modules can use
pub use handlers::{get_card_type, list_cards, sell_card};
pub use service::CardService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;
