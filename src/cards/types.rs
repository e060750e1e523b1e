use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellCopyRequest {
    pub copy_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellCopyResponse {
    pub coins_earned: i64,
    /// None once the last unit was sold and the copy removed
    pub remaining_level: Option<i32>,
    pub balance: i64,
    pub rating: i64,
}
