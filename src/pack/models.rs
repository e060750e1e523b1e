use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::cards::models::CardTemplateModel;

/// Database model for packs table. `is_opened` only ever flips false → true.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackModel {
    pub id: String,
    pub owner_id: String,
    pub season_id: String,
    pub is_opened: bool,
    pub created_at: DateTime<Utc>,
}

impl PackModel {
    pub fn new(owner_id: String, season_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            season_id,
            is_opened: false,
            created_at: Utc::now(),
        }
    }
}

/// One drawn card as reported back to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardedCard {
    pub template: CardTemplateModel,
    pub level: i32,
    pub merged: bool,
}
