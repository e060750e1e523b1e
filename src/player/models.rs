use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for players table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerModel {
    pub id: String,
    pub username: String,
    pub coins: i64,
    /// Aggregate trainer score over active-season copies
    pub rating: i64,
    pub last_pack_claim: Option<DateTime<Utc>>,
}

impl PlayerModel {
    pub fn new(id: String, username: String) -> Self {
        Self {
            id,
            username,
            coins: 0,
            rating: 0,
            last_pack_claim: None,
        }
    }

    /// Whether the daily pack was already claimed on the UTC day of `now`
    pub fn claimed_on_day_of(&self, now: DateTime<Utc>) -> bool {
        self.last_pack_claim
            .map(|last| last.date_naive() == now.date_naive())
            .unwrap_or(false)
    }
}
