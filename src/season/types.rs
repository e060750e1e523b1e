use serde::{Deserialize, Serialize};

use super::models::SeasonModel;
use crate::cards::models::CardTemplateModel;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

/// Request payload for rolling over to a new season
#[derive(Debug, Deserialize)]
pub struct StartSeasonRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, DEFAULT_LEADERBOARD_LIMIT)
    }
}

/// Templates of one season ranked by rating
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub season: SeasonModel,
    pub cards: Vec<CardTemplateModel>,
}
