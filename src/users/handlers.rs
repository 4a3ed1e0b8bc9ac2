use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    auth::handlers::is_valid_email,
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            MessageResponse, UpdateProfileRequest, UpdatedUserResponse, UserListResponse,
            UserResponse,
        },
        repo::User,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/update", axum::routing::put(update_profile))
        .route("/me/avatar", get(my_avatar))
        .route("/admin/users", get(list_users))
        .route(
            "/admin/user/:id",
            get(get_user).put(update_role).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdatedUserResponse>, ApiError> {
    let email = match payload.email {
        Some(e) => {
            let e = e.trim().to_lowercase();
            if !is_valid_email(&e) {
                return Err(ApiError::Validation("Invalid email".into()));
            }
            Some(e)
        }
        None => None,
    };

    let user = User::update_profile(
        &state.db,
        user_id,
        payload.name.as_deref(),
        email.as_deref(),
        payload.mobile_number.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UpdatedUserResponse {
        success: true,
        message: "Profile Updated Successfully".into(),
        user,
    }))
}

/// 302 to a short-lived presigned URL for the caller's avatar.
#[instrument(skip(state))]
pub async fn my_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Redirect, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;
    let url = state.storage.presign_get(&user.avatar_key, 600).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, admin))]
pub async fn update_role(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;

    let role = user.role.toggled();
    User::update_role(&state.db, user.id, role).await?;

    info!(admin_id = %admin.0.id, user_id = %user.id, ?role, "role updated");
    Ok(Json(MessageResponse {
        success: true,
        message: "Role Updated".into(),
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;

    // Best-effort: a stranded avatar object is not worth failing the delete.
    if let Err(e) = state.storage.delete_object(&user.avatar_key).await {
        warn!(user_id = %user.id, error = %e, "avatar cleanup failed");
    }

    if !User::delete(&state.db, user.id).await? {
        return Err(ApiError::NotFound("User Not Found".into()));
    }

    info!(admin_id = %admin.0.id, user_id = %user.id, "user deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "User Deleted Successfully".into(),
    }))
}
