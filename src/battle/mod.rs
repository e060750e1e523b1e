// Public API - what other modules can use
pub use handlers::{battle_history, get_battle_pair, vote};
pub use service::BattleService;

// Internal modules
pub mod elo;
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;
