// Public API - what other modules can use
pub use handlers::{claim_pack, list_packs, open_pack, purchase_pack};
pub use service::PackService;

// Internal modules
pub mod draw;
mod handlers;
pub mod models;
pub mod repository;
mod service;
mod types;
