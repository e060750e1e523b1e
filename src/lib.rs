// Library crate for the teacher card game server
// This file exposes the public API for the binary and integration tests

pub mod battle;
pub mod cards;
pub mod catalog;
pub mod config;
pub mod pack;
pub mod player;
pub mod routes;
pub mod season;
pub mod session;
pub mod shared;
pub mod store;
pub mod trade;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use routes::build_router;
pub use session::SessionClaims;
pub use shared::{AppError, AppState};
pub use store::{InMemoryStore, PostgresStore, Store};
