use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// `Pending` is the only non-terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    CardForCard,
    CardForCoins,
}

/// Database model for trades table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeModel {
    pub id: String,
    pub offered_by_id: String,
    pub offered_to_id: Option<String>,
    pub offered_copy_id: String,
    pub requested_copy_id: Option<String>,
    pub asking_price: i64,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}

impl TradeModel {
    /// Card-for-card offer addressed to the current owner of `requested_copy_id`
    pub fn card_for_card(
        offered_by_id: String,
        offered_to_id: String,
        offered_copy_id: String,
        requested_copy_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            offered_by_id,
            offered_to_id: Some(offered_to_id),
            offered_copy_id,
            requested_copy_id: Some(requested_copy_id),
            asking_price: 0,
            status: TradeStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Coin sale; open to anyone unless `offered_to_id` is set
    pub fn card_for_coins(
        offered_by_id: String,
        offered_to_id: Option<String>,
        offered_copy_id: String,
        asking_price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            offered_by_id,
            offered_to_id,
            offered_copy_id,
            requested_copy_id: None,
            asking_price,
            status: TradeStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> TradeKind {
        if self.requested_copy_id.is_some() {
            TradeKind::CardForCard
        } else {
            TradeKind::CardForCoins
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TradeStatus::Pending
    }

    pub fn references_copy(&self, copy_id: &str) -> bool {
        self.offered_copy_id == copy_id || self.requested_copy_id.as_deref() == Some(copy_id)
    }

    /// Whether `player_id` is allowed to accept this trade
    pub fn can_be_accepted_by(&self, player_id: &str) -> bool {
        if self.offered_by_id == player_id {
            return false;
        }
        match &self.offered_to_id {
            Some(target) => target == player_id,
            None => self.kind() == TradeKind::CardForCoins,
        }
    }
}
