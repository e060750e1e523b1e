use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::cards::models::CardTemplateModel;

/// Database model for battles table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleModel {
    pub id: String,
    pub winner_type_id: String,
    pub loser_type_id: String,
    pub voter_id: String,
    pub created_at: DateTime<Utc>,
}

impl BattleModel {
    pub fn new(winner_type_id: String, loser_type_id: String, voter_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            winner_type_id,
            loser_type_id,
            voter_id,
            created_at: Utc::now(),
        }
    }
}

/// Both templates as persisted after a battle was applied
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    pub battle: BattleModel,
    pub winner: CardTemplateModel,
    pub loser: CardTemplateModel,
}
