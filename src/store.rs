use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::battle::{models::BattleModel, repository::BattleRepository};
use crate::cards::{
    models::{CardTemplateModel, OwnedCopyModel},
    repository::CardRepository,
};
use crate::catalog::{models::TeacherModel, repository::CatalogRepository};
use crate::pack::{models::PackModel, repository::PackRepository};
use crate::player::{models::PlayerModel, repository::PlayerRepository};
use crate::season::{models::SeasonModel, repository::SeasonRepository};
use crate::shared::AppError;
use crate::trade::{
    models::{TradeModel, TradeStatus},
    repository::TradeRepository,
};

/// Everything the services need from persistence, implemented by one backend
pub trait Store:
    SeasonRepository
    + CardRepository
    + PackRepository
    + TradeRepository
    + BattleRepository
    + PlayerRepository
    + CatalogRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> Store for T where
    T: SeasonRepository
        + CardRepository
        + PackRepository
        + TradeRepository
        + BattleRepository
        + PlayerRepository
        + CatalogRepository
        + Send
        + Sync
        + 'static
{
}

/// All rows of the in-memory backend. Every atomic repository operation
/// holds the single lock over these for its whole duration.
#[derive(Debug, Default)]
pub struct Tables {
    pub seasons: HashMap<String, SeasonModel>,
    pub templates: HashMap<String, CardTemplateModel>,
    pub copies: HashMap<String, OwnedCopyModel>,
    pub packs: HashMap<String, PackModel>,
    pub trades: HashMap<String, TradeModel>,
    pub players: HashMap<String, PlayerModel>,
    pub battles: Vec<BattleModel>,
    pub teachers: Vec<TeacherModel>,
}

impl Tables {
    pub fn active_season_id(&self) -> Option<&str> {
        self.seasons
            .values()
            .find(|season| season.is_active)
            .map(|season| season.id.as_str())
    }

    pub fn copy_of_type(&self, owner_id: &str, type_id: &str) -> Option<&OwnedCopyModel> {
        self.copies
            .values()
            .find(|copy| copy.owner_id == owner_id && copy.type_id == type_id)
    }

    /// Adds one unit of `type_id` to the owner's collection.
    /// Returns the resulting level and whether an existing row absorbed it.
    pub fn award_copy(&mut self, owner_id: &str, type_id: &str) -> (i32, bool) {
        let existing_id = self.copy_of_type(owner_id, type_id).map(|c| c.id.clone());

        match existing_id.and_then(|id| self.copies.get_mut(&id)) {
            Some(copy) => {
                copy.level += 1;
                (copy.level, true)
            }
            None => {
                let copy = OwnedCopyModel::new(type_id.to_string(), owner_id.to_string());
                self.copies.insert(copy.id.clone(), copy);
                (1, false)
            }
        }
    }

    /// Moves a copy to a new owner, folding it into the owner's existing
    /// copy of the same type so (owner, type) stays unique. Pending offers of
    /// the absorbing copy were made at its old level and are canceled.
    pub fn transfer_copy(&mut self, copy_id: &str, new_owner_id: &str) -> Result<(), AppError> {
        let moving = self
            .copies
            .get(copy_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Card copy not found".to_string()))?;

        let target_id = self
            .copies
            .values()
            .find(|c| c.owner_id == new_owner_id && c.type_id == moving.type_id && c.id != moving.id)
            .map(|c| c.id.clone());

        match target_id.and_then(|id| self.copies.get_mut(&id)) {
            Some(target) => {
                target.level += moving.level;
                let target_id = target.id.clone();
                self.copies.remove(copy_id);
                self.cancel_offers_of(&target_id);
            }
            None => {
                if let Some(copy) = self.copies.get_mut(copy_id) {
                    copy.owner_id = new_owner_id.to_string();
                }
            }
        }
        Ok(())
    }

    /// Copy of `player` carrying the rating of their active-season holdings
    pub fn with_live_rating(&self, player: &PlayerModel) -> PlayerModel {
        PlayerModel {
            rating: self.trainer_rating(&player.id),
            ..player.clone()
        }
    }

    /// Cancels every pending trade that promises `copy_id`
    pub fn cancel_offers_of(&mut self, copy_id: &str) -> usize {
        let mut canceled = 0;
        for trade in self
            .trades
            .values_mut()
            .filter(|t| t.is_pending() && t.references_copy(copy_id))
        {
            trade.status = TradeStatus::Canceled;
            canceled += 1;
        }
        if canceled > 0 {
            info!(copy_id, canceled, "Canceled offers of a copy that absorbed a transfer");
        }
        canceled
    }

    /// Sum of template rating times level over the owner's copies whose
    /// template belongs to the active season
    pub fn trainer_rating(&self, owner_id: &str) -> i64 {
        let Some(active_id) = self.active_season_id() else {
            return 0;
        };

        self.copies
            .values()
            .filter(|copy| copy.owner_id == owner_id)
            .filter_map(|copy| {
                self.templates
                    .get(&copy.type_id)
                    .filter(|template| template.season_id == active_id)
                    .map(|template| template.rating as i64 * copy.level as i64)
            })
            .sum()
    }
}

/// In-memory implementation of every repository for development and testing
///
/// Data is lost when the process exits.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    pub(crate) fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables.lock().map_err(|_| {
            warn!("In-memory store lock poisoned");
            AppError::Internal
        })
    }
}

/// PostgreSQL implementation of every repository
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS seasons (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS seasons_single_active ON seasons (is_active) WHERE is_active",
    "CREATE TABLE IF NOT EXISTS card_templates (
        type_id TEXT PRIMARY KEY,
        teacher_name TEXT NOT NULL,
        subject TEXT NOT NULL,
        quote TEXT NOT NULL,
        rating INT4 NOT NULL DEFAULT 1000,
        wins INT4 NOT NULL DEFAULT 0,
        losses INT4 NOT NULL DEFAULT 0,
        season_id TEXT NOT NULL REFERENCES seasons (id)
    )",
    "CREATE TABLE IF NOT EXISTS players (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        coins INT8 NOT NULL DEFAULT 0 CHECK (coins >= 0),
        rating INT8 NOT NULL DEFAULT 0,
        last_pack_claim TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS owned_copies (
        id TEXT PRIMARY KEY,
        type_id TEXT NOT NULL REFERENCES card_templates (type_id),
        owner_id TEXT NOT NULL REFERENCES players (id),
        level INT4 NOT NULL CHECK (level >= 1),
        UNIQUE (owner_id, type_id)
    )",
    "CREATE TABLE IF NOT EXISTS packs (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL REFERENCES players (id),
        season_id TEXT NOT NULL REFERENCES seasons (id),
        is_opened BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS trades (
        id TEXT PRIMARY KEY,
        offered_by_id TEXT NOT NULL REFERENCES players (id),
        offered_to_id TEXT REFERENCES players (id),
        offered_copy_id TEXT NOT NULL,
        requested_copy_id TEXT,
        asking_price INT8 NOT NULL DEFAULT 0 CHECK (asking_price >= 0),
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS battles (
        id TEXT PRIMARY KEY,
        winner_type_id TEXT NOT NULL REFERENCES card_templates (type_id),
        loser_type_id TEXT NOT NULL REFERENCES card_templates (type_id),
        voter_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS teachers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS teacher_subjects (
        teacher_id TEXT NOT NULL REFERENCES teachers (id),
        subject TEXT NOT NULL,
        PRIMARY KEY (teacher_id, subject)
    )",
    "CREATE TABLE IF NOT EXISTS teacher_quotes (
        teacher_id TEXT NOT NULL REFERENCES teachers (id),
        text TEXT NOT NULL
    )",
];

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            warn!(error = %e, "Failed to connect to database");
            AppError::DatabaseError(e.to_string())
        })?;
        Ok(Self::new(pool))
    }

    /// Creates any missing tables and indexes
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ensured");
        Ok(())
    }
}

/// Postgres counterpart of [`Tables::award_copy`], inside a caller's transaction
pub(crate) async fn award_copy_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: &str,
    type_id: &str,
) -> Result<(i32, bool), AppError> {
    let fresh = OwnedCopyModel::new(type_id.to_string(), owner_id.to_string());
    let row = sqlx::query(
        "INSERT INTO owned_copies (id, type_id, owner_id, level) VALUES ($1, $2, $3, 1)
         ON CONFLICT (owner_id, type_id) DO UPDATE SET level = owned_copies.level + 1
         RETURNING level",
    )
    .bind(&fresh.id)
    .bind(type_id)
    .bind(owner_id)
    .fetch_one(&mut **tx)
    .await?;

    let level: i32 = row.try_get("level")?;
    Ok((level, level > 1))
}

/// Postgres counterpart of [`Tables::transfer_copy`], inside a caller's transaction
pub(crate) async fn transfer_copy_tx(
    tx: &mut Transaction<'_, Postgres>,
    copy: &OwnedCopyModel,
    new_owner_id: &str,
) -> Result<(), AppError> {
    let existing = sqlx::query(
        "SELECT id FROM owned_copies WHERE owner_id = $1 AND type_id = $2 AND id <> $3 FOR UPDATE",
    )
    .bind(new_owner_id)
    .bind(&copy.type_id)
    .bind(&copy.id)
    .fetch_optional(&mut **tx)
    .await?;

    match existing {
        Some(row) => {
            let target_id: String = row.try_get("id")?;
            debug!(copy_id = %copy.id, target_id = %target_id, "Folding transferred copy into existing copy");
            sqlx::query("UPDATE owned_copies SET level = level + $1 WHERE id = $2")
                .bind(copy.level)
                .bind(&target_id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM owned_copies WHERE id = $1")
                .bind(&copy.id)
                .execute(&mut **tx)
                .await?;
            let canceled = sqlx::query(
                "UPDATE trades SET status = 'canceled' WHERE status = 'pending'
                 AND (offered_copy_id = $1 OR requested_copy_id = $1)",
            )
            .bind(&target_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
            if canceled > 0 {
                info!(copy_id = %target_id, canceled, "Canceled offers of a copy that absorbed a transfer");
            }
        }
        None => {
            sqlx::query("UPDATE owned_copies SET owner_id = $1 WHERE id = $2")
                .bind(new_owner_id)
                .bind(&copy.id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(type_id: &str, season_id: &str, rating: i32) -> CardTemplateModel {
        CardTemplateModel {
            type_id: type_id.to_string(),
            teacher_name: "Mr. Smith".to_string(),
            subject: "Math".to_string(),
            quote: "Show your work.".to_string(),
            rating,
            wins: 0,
            losses: 0,
            season_id: season_id.to_string(),
        }
    }

    fn season(id: &str, is_active: bool) -> SeasonModel {
        let mut season = SeasonModel::new("Season".to_string(), 7);
        season.id = id.to_string();
        season.is_active = is_active;
        season
    }

    #[test]
    fn award_copy_merges_duplicates_into_one_row() {
        let mut tables = Tables::default();

        assert_eq!(tables.award_copy("alice", "math"), (1, false));
        assert_eq!(tables.award_copy("alice", "math"), (2, true));
        assert_eq!(tables.award_copy("bob", "math"), (1, false));

        let alice_rows: Vec<_> = tables
            .copies
            .values()
            .filter(|c| c.owner_id == "alice")
            .collect();
        assert_eq!(alice_rows.len(), 1);
        assert_eq!(alice_rows[0].level, 2);
    }

    #[test]
    fn transfer_folds_into_existing_copy_of_same_type() {
        let mut tables = Tables::default();
        tables.award_copy("alice", "math");
        tables.award_copy("alice", "math");
        tables.award_copy("bob", "math");
        let alice_copy = tables.copy_of_type("alice", "math").unwrap().id.clone();

        tables.transfer_copy(&alice_copy, "bob").unwrap();

        assert!(tables.copies.get(&alice_copy).is_none());
        assert_eq!(tables.copy_of_type("bob", "math").unwrap().level, 3);
        assert!(tables.copy_of_type("alice", "math").is_none());
    }

    #[test]
    fn transfer_cancels_pending_offers_of_absorbing_copy() {
        let mut tables = Tables::default();
        tables.award_copy("alice", "math");
        tables.award_copy("bob", "math");
        let alice_copy = tables.copy_of_type("alice", "math").unwrap().id.clone();
        let bob_copy = tables.copy_of_type("bob", "math").unwrap().id.clone();
        let listing = TradeModel::card_for_coins("bob".into(), None, bob_copy.clone(), 40);
        tables.trades.insert(listing.id.clone(), listing.clone());

        tables.transfer_copy(&alice_copy, "bob").unwrap();

        assert_eq!(tables.copies.get(&bob_copy).unwrap().level, 2);
        assert_eq!(tables.trades[&listing.id].status, TradeStatus::Canceled);
    }

    #[test]
    fn transfer_reassigns_owner_when_recipient_lacks_type() {
        let mut tables = Tables::default();
        tables.award_copy("alice", "math");
        let copy_id = tables.copy_of_type("alice", "math").unwrap().id.clone();

        tables.transfer_copy(&copy_id, "bob").unwrap();

        assert_eq!(tables.copies.get(&copy_id).unwrap().owner_id, "bob");
    }

    #[test]
    fn trainer_rating_counts_only_active_season_templates() {
        let mut tables = Tables::default();
        tables.seasons.insert("s1".into(), season("s1", false));
        tables.seasons.insert("s2".into(), season("s2", true));
        tables.templates.insert("old".into(), template("old", "s1", 1500));
        tables.templates.insert("new".into(), template("new", "s2", 1016));

        tables.award_copy("alice", "old");
        tables.award_copy("alice", "new");
        tables.award_copy("alice", "new");

        assert_eq!(tables.trainer_rating("alice"), 2032);
        assert_eq!(tables.trainer_rating("nobody"), 0);
    }
}
