use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};

pub const ADMIN_ROLE: &str = "admin";

/// Claims of an administrator token. Tokens are issued elsewhere and signed
/// with the shared HS256 secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

pub struct AuthService;

impl AuthService {
    /// Decode and validate an admin JWT (signature, expiry and role).
    pub fn decode_admin_token(jwt: &JwtConfig, token: &str) -> AppResult<AdminClaims> {
        let token_data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(jwt.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        if token_data.claims.role != ADMIN_ROLE {
            tracing::debug!(
                "Token for {} carries role '{}', admin required",
                token_data.claims.sub,
                token_data.claims.role
            );
            return Err(AppError::Unauthorized);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
        }
    }

    fn token(secret: &str, role: &str, exp_offset: Duration) -> String {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: "therapist".to_string(),
            role: role.to_string(),
            exp: (now + exp_offset).timestamp() as usize,
            iat: Some(now.timestamp() as usize),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_admin_token() {
        let claims =
            AuthService::decode_admin_token(&jwt(), &token("test-secret", "admin", Duration::hours(1)))
                .unwrap();
        assert_eq!(claims.sub, "therapist");
    }

    #[test]
    fn rejects_other_roles() {
        let result =
            AuthService::decode_admin_token(&jwt(), &token("test-secret", "client", Duration::hours(1)));
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let forged =
            AuthService::decode_admin_token(&jwt(), &token("other-secret", "admin", Duration::hours(1)));
        assert!(matches!(forged, Err(AppError::Jwt(_))));

        let expired =
            AuthService::decode_admin_token(&jwt(), &token("test-secret", "admin", Duration::hours(-2)));
        assert!(matches!(expired, Err(AppError::Jwt(_))));
    }
}
