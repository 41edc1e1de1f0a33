use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, MatchedPath},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::claims::SessionUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::policy;
use crate::error::ApiError;

/// Access guard: validates the bearer credential, checks the route's role
/// allow-list, and hands the decoded identity to the handler.
pub struct AuthUser(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Authentication("invalid auth scheme".into()))?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "session credential rejected");
            ApiError::Authentication(e.to_string())
        })?;

        // Declarative role check: the route's allow-list, if any, decides.
        if let Some(matched) = parts.extensions.get::<MatchedPath>() {
            policy::authorize(claims.user.role, &parts.method, matched.as_str())?;
        }

        Ok(AuthUser(claims.user))
    }
}
