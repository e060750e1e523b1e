use std::str::FromStr;
use tracing::warn;

/// Runtime configuration, read once at startup from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub pack_price: i64,
    pub season_length_days: i64,
    pub vote_reward: i64,
    pub cards_per_pack: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            pack_price: 100,
            season_length_days: 7,
            vote_reward: 10,
            cards_per_pack: 3,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            pack_price: parse_or("PACK_PRICE", defaults.pack_price),
            season_length_days: parse_or("SEASON_LENGTH_DAYS", defaults.season_length_days),
            vote_reward: parse_or("VOTE_REWARD", defaults.vote_reward),
            cards_per_pack: at_least_one("CARDS_PER_PACK", defaults.cards_per_pack),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Like [`parse_or`], but a value below 1 also falls back to the default
fn at_least_one(key: &str, default: usize) -> usize {
    match parse_or(key, default) {
        0 => {
            warn!(key, fallback = default, "Config value must be at least 1, using default");
            default
        }
        value => value,
    }
}
