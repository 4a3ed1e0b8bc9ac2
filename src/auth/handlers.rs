use axum::{
    extract::{DefaultBodyLimit, FromRef, Host, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, RegisterForm, ResetPasswordRequest,
            SessionResponse, UpdatePasswordRequest,
        },
        extractors::AuthUser,
        reset,
        session::{set_cookie, JwtKeys},
    },
    error::ApiError,
    state::AppState,
    storage,
    users::{dto::MessageResponse, repo::NewUser, repo::User},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
        .route("/password/update", put(update_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Signs a session token for `user`, attaches it as an HTTP-only cookie and
/// wraps the user in the standard envelope.
fn session_reply(
    keys: &JwtKeys,
    user: User,
    message: String,
    status: StatusCode,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), ApiError> {
    let token = keys.sign(user.id)?;
    let headers = set_cookie(&keys.session_cookie(token));
    Ok((
        status,
        headers,
        Json(SessionResponse {
            success: true,
            message,
            user,
        }),
    ))
}

#[instrument(skip(state, multipart))]
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), ApiError> {
    let mut form = RegisterForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
    {
        let read = |e: axum::extract::multipart::MultipartError| {
            ApiError::Validation(format!("invalid multipart field: {e}"))
        };
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("name") => form.name = Some(field.text().await.map_err(read)?),
            Some("email") => form.email = Some(field.text().await.map_err(read)?),
            Some("password") => form.password = Some(field.text().await.map_err(read)?),
            Some("mobileNumber") => form.mobile_number = Some(field.text().await.map_err(read)?),
            Some("avatar") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                form.avatar = Some((field.bytes().await.map_err(read)?, content_type));
            }
            _ => {}
        }
    }

    let (Some(name), Some(email), Some(password), Some(mobile_number), Some((avatar, content_type))) = (
        form.name,
        form.email,
        form.password,
        form.mobile_number,
        form.avatar,
    ) else {
        return Err(ApiError::Validation("Please Enter All Fields".into()));
    };

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict(
            "User Already Registered, Please Login".into(),
        ));
    }

    let password_hash = state.passwords.hash(&password)?;

    let avatar_key = storage::avatar_key();
    state
        .storage
        .put_object(&avatar_key, avatar, &content_type)
        .await?;

    let user = User::create(
        &state.db,
        NewUser {
            name: &name,
            email: &email,
            mobile_number: &mobile_number,
            avatar_key: &avatar_key,
            password_hash: &password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    session_reply(
        &JwtKeys::from_ref(&state),
        user,
        "Registered Successfully".into(),
        StatusCode::CREATED,
    )
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Please Enter All Fields".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("Incorrect Email".into())
        })?;

    if !state.passwords.verify(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Incorrect Password".into()));
    }

    info!(user_id = %user.id, "user logged in");
    let message = format!("Welcome Back {}", user.name);
    session_reply(&JwtKeys::from_ref(&state), user, message, StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> (HeaderMap, Json<MessageResponse>) {
    info!(user_id = %user_id, "user logged out");
    let keys = JwtKeys::from_ref(&state);
    (
        set_cookie(&keys.expired_cookie()),
        Json(MessageResponse {
            success: true,
            message: "Logged Out Successfully".into(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Host(host): Host,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Please Enter All Fields".into()));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;

    let (token, digest) = reset::generate_token();
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_token_ttl_minutes);
    User::set_reset_token(&state.db, user.id, &digest, expires_at).await?;

    let base = state
        .config
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{host}"));
    let reset_url = format!("{base}/api/v1/password/reset/{token}");
    let body = format!(
        "Your password reset token is:\n\n{reset_url}\n\n\
         If you have not requested this email then please ignore it."
    );

    match state.mailer.send(&user.email, "Password Recovery", &body).await {
        Ok(()) => {
            info!(user_id = %user.id, "reset email dispatched");
            Ok(Json(MessageResponse {
                success: true,
                message: format!("Email sent to {} successfully", user.email),
            }))
        }
        Err(e) => {
            // Failed dispatch must not leave a pending reset behind.
            User::clear_reset_token(&state.db, user.id).await?;
            warn!(user_id = %user.id, error = %e, "reset email failed");
            Err(ApiError::Mail(e.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), ApiError> {
    let digest = reset::digest_token(&token);
    let user = User::find_by_reset_digest(&state.db, &digest, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| {
            ApiError::Validation("Reset Password Token is invalid or has been expired".into())
        })?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let password_hash = state.passwords.hash(&payload.password)?;
    User::reset_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = %user.id, "password reset");
    session_reply(
        &JwtKeys::from_ref(&state),
        user,
        "Password Reset Successfully".into(),
        StatusCode::OK,
    )
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation("Please Enter All Fields".into()));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".into()))?;

    if !state
        .passwords
        .verify(&payload.old_password, &user.password_hash)?
    {
        return Err(ApiError::Validation("Old Password Incorrect".into()));
    }

    let password_hash = state.passwords.hash(&payload.new_password)?;
    User::set_password(&state.db, user.id, &password_hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password Changed Successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[tokio::test]
    async fn session_reply_sets_the_cookie_and_envelope() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user = crate::users::repo::User {
            id: uuid::Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            mobile_number: "5551234".into(),
            avatar_key: "avatars/abc".into(),
            password_hash: "hash".into(),
            role: crate::users::repo::Role::User,
            reset_password_token_hash: None,
            reset_password_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        };

        let (status, headers, Json(body)) =
            session_reply(&keys, user, "Registered Successfully".into(), StatusCode::CREATED)
                .expect("reply");
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert_eq!(body.message, "Registered Successfully");

        let cookie = headers
            .get(axum::http::header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));

        // The cookie carries a token the keys themselves accept.
        let token = cookie
            .trim_start_matches("token=")
            .split(';')
            .next()
            .unwrap();
        assert_eq!(keys.verify(token).unwrap().sub, body.user.id);
    }
}
