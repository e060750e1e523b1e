use serde::{Deserialize, Serialize};

use super::models::BattleModel;
use crate::cards::models::CardTemplateModel;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Two active-season cards to vote between
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePairResponse {
    pub first: CardTemplateModel,
    pub second: CardTemplateModel,
}

/// Request payload for a battle vote
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub winner_type_id: String,
    pub loser_type_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResultResponse {
    pub battle: BattleModel,
    pub winner_new_rating: i32,
    pub loser_new_rating: i32,
    pub coins_earned: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, DEFAULT_HISTORY_LIMIT)
    }
}
