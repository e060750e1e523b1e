use serde::{Deserialize, Serialize};

use super::models::AwardedCard;

/// Request payload for opening a pack; the oldest unopened pack is used
/// when `packId` is omitted
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPackRequest {
    pub pack_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPackResponse {
    pub pack_id: String,
    pub cards: Vec<AwardedCard>,
    /// Trainer rating after the draw
    pub rating: i64,
}
