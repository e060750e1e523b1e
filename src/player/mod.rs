// Public API - what other modules can use
pub use handlers::{get_profile, top_trainers};
pub use service::PlayerService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;
