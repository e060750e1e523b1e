use serde::{Deserialize, Serialize};

/// JWT claims issued by the external auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub player_id: String,
    pub username: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}
