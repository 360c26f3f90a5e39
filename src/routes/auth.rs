use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::services::auth::{AdminClaims, AuthService};
use crate::AppState;

/// Extractor for an authenticated administrator.
///
/// Every admin handler takes this as an argument, so requests without a valid
/// admin token are rejected before any store access.
pub struct AdminUser(pub AdminClaims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract Authorization header (Bearer token)
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if auth_header.len() < 7 || !auth_header[..7].eq_ignore_ascii_case("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            tracing::debug!("Empty bearer token in Authorization header");
            return Err(AppError::Unauthorized);
        }

        let claims = AuthService::decode_admin_token(&state.config.jwt, token).map_err(|e| {
            tracing::debug!("Rejected admin token: {:?}", e);
            e
        })?;

        tracing::debug!("Authenticated admin: {}", claims.sub);
        Ok(AdminUser(claims))
    }
}
