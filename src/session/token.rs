use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::{debug, instrument};

use super::types::SessionClaims;
use crate::shared::AppError;

/// Verifies bearer tokens minted by the auth service with a shared secret
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
}

impl TokenConfig {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Validates a JWT token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        debug!("Decoding and validating JWT token");

        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(
                username = %data.claims.username,
                player_id = %data.claims.player_id,
                exp = data.claims.exp,
                "JWT token decoded successfully"
            );
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(secret: &str, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            player_id: "player-1".to_string(),
            username: "test-user".to_string(),
            admin: true,
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_token() {
        let config = TokenConfig::new("secret".to_string());

        let claims = config.validate_token(&mint("secret", 3600)).unwrap();

        assert_eq!(claims.player_id, "player-1");
        assert!(claims.admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_token() {
        let config = TokenConfig::new("secret".to_string());
        let result = config.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let config = TokenConfig::new("secret".to_string());
        let result = config.validate_token(&mint("other", 3600));
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_expired_token() {
        let config = TokenConfig::new("secret".to_string());
        let result = config.validate_token(&mint("secret", -3600));
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }
}
