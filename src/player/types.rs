use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_LIMIT: usize = 100;

/// Public leaderboard row; balances are not exposed
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerSummary {
    pub rank: usize,
    pub id: String,
    pub username: String,
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

impl TopQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_TOP_LIMIT)
            .clamp(1, DEFAULT_TOP_LIMIT)
    }
}
