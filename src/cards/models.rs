use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rating every template starts a season with
pub const DEFAULT_RATING: i32 = 1000;

const SALE_BASE_VALUE: i64 = 50;
const SALE_LEVEL_BONUS: i64 = 25;
/// One coin per this many rating points above the default
const SALE_RATING_STEP: i64 = 10;

/// Shared, season-scoped definition of a card type.
///
/// Rating, wins and losses live here and are shared by every copy any
/// player owns.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTemplateModel {
    pub type_id: String,
    pub teacher_name: String,
    pub subject: String,
    pub quote: String,
    pub rating: i32,
    pub wins: i32,
    pub losses: i32,
    pub season_id: String,
}

impl CardTemplateModel {
    pub fn new(teacher_name: String, subject: String, quote: String, season_id: String) -> Self {
        Self {
            type_id: Uuid::new_v4().to_string(),
            teacher_name,
            subject,
            quote,
            rating: DEFAULT_RATING,
            wins: 0,
            losses: 0,
            season_id,
        }
    }
}

/// A player's holding of one template. At most one row per (owner, type).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCopyModel {
    pub id: String,
    pub type_id: String,
    pub owner_id: String,
    pub level: i32,
}

impl OwnedCopyModel {
    pub fn new(type_id: String, owner_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            type_id,
            owner_id,
            level: 1,
        }
    }

    /// Coins paid for selling one unit at the current level. Templates rated
    /// above the default add a bonus; lower ratings never reduce the price.
    pub fn sale_value(&self, template_rating: i32) -> i64 {
        let rating_bonus =
            (template_rating as i64 - DEFAULT_RATING as i64).max(0) / SALE_RATING_STEP;
        SALE_BASE_VALUE + (self.level as i64 - 1) * SALE_LEVEL_BONUS + rating_bonus
    }
}

/// An owned copy joined with its template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    #[serde(flatten)]
    pub copy: OwnedCopyModel,
    pub template: CardTemplateModel,
}
