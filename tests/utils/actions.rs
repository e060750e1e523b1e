#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::setup::{mint_token, TestSetup};

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Sends one request through the router and returns status plus JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        player_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let bearer = player_id.map(|player| mint_token(player, false));
        self.send(method, uri, bearer, body).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<String>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header("Authorization", bearer);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, player_id: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(player_id), None).await
    }

    pub async fn post(&self, uri: &str, player_id: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(player_id), Some(body))
            .await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn offer_swap(
        &self,
        player_id: &str,
        offered_copy_id: &str,
        requested_copy_id: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/trades",
            player_id,
            json!({
                "offeredCopyId": offered_copy_id,
                "requestedCopyId": requested_copy_id,
            }),
        )
        .await
    }

    pub async fn offer_sale(
        &self,
        player_id: &str,
        offered_copy_id: &str,
        asking_price: i64,
    ) -> (StatusCode, Value) {
        self.post(
            "/trades",
            player_id,
            json!({
                "offeredCopyId": offered_copy_id,
                "askingPrice": asking_price,
            }),
        )
        .await
    }

    pub async fn accept(&self, trade_id: &str, player_id: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/trades/{}/accept", trade_id),
            Some(player_id),
            None,
        )
        .await
    }

    pub async fn cancel(&self, trade_id: &str, player_id: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/trades/{}/cancel", trade_id),
            Some(player_id),
            None,
        )
        .await
    }

    pub async fn claim_pack(&self, player_id: &str) -> (StatusCode, Value) {
        self.request(Method::POST, "/packs/claim", Some(player_id), None)
            .await
    }

    pub async fn purchase_pack(&self, player_id: &str) -> (StatusCode, Value) {
        self.request(Method::POST, "/packs/purchase", Some(player_id), None)
            .await
    }

    pub async fn open_pack(&self, player_id: &str, pack_id: &str) -> (StatusCode, Value) {
        self.post("/packs/open", player_id, json!({ "packId": pack_id }))
            .await
    }

    /// Rolls the season over as an admin
    pub async fn start_season(&self, name: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/seasons",
            Some(mint_token("admin", true)),
            Some(json!({ "name": name })),
        )
        .await
    }

    pub async fn sell(&self, player_id: &str, copy_id: &str) -> (StatusCode, Value) {
        self.post("/cards/sell", player_id, json!({ "copyId": copy_id }))
            .await
    }
}
