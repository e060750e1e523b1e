//! Test assertion helpers for verifying collection and season invariants
#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashSet;

use teachercards::{
    cards::repository::CardRepository, season::repository::SeasonRepository,
};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Asserts the response status and that failures carry an `error` message
pub fn assert_status(response: &(StatusCode, Value), expected: StatusCode) {
    assert_eq!(
        response.0, expected,
        "unexpected status, body was {}",
        response.1
    );
    if !expected.is_success() {
        assert!(
            response.1["error"].is_string(),
            "error responses should carry a message"
        );
    }
}

impl TestSetup {
    /// At most one copy row per (owner, type), and every level is positive
    pub async fn assert_consolidated(&self, player_id: &str) {
        let collection = self.store.list_collection(player_id).await.unwrap();
        let mut seen = HashSet::new();
        for entry in &collection {
            assert!(
                seen.insert(entry.copy.type_id.clone()),
                "{} holds two rows of type {}",
                player_id,
                entry.copy.type_id
            );
            assert!(entry.copy.level >= 1);
        }
    }

    /// Level of the player's copy of template `index`, 0 when absent
    pub async fn level_of(&self, player_id: &str, index: usize) -> i32 {
        let type_id = self.type_id(index);
        self.store
            .list_collection(player_id)
            .await
            .unwrap()
            .into_iter()
            .find(|entry| entry.copy.type_id == type_id)
            .map(|entry| entry.copy.level)
            .unwrap_or(0)
    }

    pub async fn assert_single_active_season(&self) {
        let seasons = self.store.list_seasons().await.unwrap();
        let active = seasons.iter().filter(|s| s.is_active).count();
        assert_eq!(active, 1, "expected exactly one active season");
    }
}
