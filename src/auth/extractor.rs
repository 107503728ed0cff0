use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt;
use crate::error::AppError;
use crate::state::SharedState;

/// The authenticated caller. Carries identity only; scope roles come from
/// [`crate::access`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
            auth_str
                .strip_prefix("Bearer ")
                .map(str::to_string)
                .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?
        } else {
            CookieJar::from_headers(&parts.headers)
                .get("access_token")
                .map(|c| c.value().to_string())
                .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?
        };

        let claims = jwt::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
