use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::session::{session_token, JwtKeys},
    error::ApiError,
    state::AppState,
    users::repo::{Role, User},
};

/// Session gate: validates the token cookie and yields the caller's id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = session_token(&parts.headers, &keys.cookie_name).ok_or_else(|| {
            ApiError::Unauthorized("Please login to access this resource".into())
        })?;

        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthorized("Invalid or expired session, please login again".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Admin gate: session gate plus a role check against the store.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))?;

        if user.role != Role::Admin {
            warn!(user_id = %user.id, role = ?user.role, "admin route refused");
            return Err(ApiError::Forbidden(
                "Only admins are allowed to access this resource".into(),
            ));
        }

        Ok(AdminUser(user))
    }
}
