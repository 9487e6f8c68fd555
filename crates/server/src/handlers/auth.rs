//! Account and session endpoints.

use crate::auth::{clear_session_cookie, get_auth, require_auth, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{UserResponse, format_timestamp, read_json, user_to_response};
use crate::metrics::{self, REGISTRATIONS};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use folio_core::password::{hash_password, verify_password};
use folio_core::user::{
    normalize_email, validate_email, validate_new_password, validate_registration_password,
    validate_user_name,
};
use folio_core::{MembershipLevel, SessionToken, UserStatus};
use folio_store::models::{SessionRow, UserRow};
use folio_store::repos::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Same message for unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// POST /v1/auth/register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let body: RegisterRequest = read_json(req, state.config.server.max_body_bytes).await?;

    let email = validate_email(&body.email)?;
    validate_registration_password(&body.password)?;
    let name = validate_user_name(&body.name)?;

    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("email is already registered".to_string()));
    }

    let now = OffsetDateTime::now_utc();
    let user = UserRow {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&body.password)?,
        name,
        avatar: None,
        is_admin: false,
        membership_level: MembershipLevel::default().as_str().to_string(),
        status: UserStatus::default().as_str().to_string(),
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create_user(&user).await?;
    REGISTRATIONS.inc();
    tracing::info!(user_id = %user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(user_to_response(&user)?)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Session token; also set as the session cookie.
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

/// POST /v1/auth/login - Exchange credentials for a session.
pub async fn login(State(state): State<AppState>, req: Request) -> ApiResult<Response> {
    let body: LoginRequest = read_json(req, state.config.server.max_body_bytes).await?;
    let email = normalize_email(&body.email);

    let Some(mut user) = state.store.get_user_by_email(&email).await? else {
        metrics::record_login("invalid_credentials");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&body.password, &user.password_hash)? {
        metrics::record_login("invalid_credentials");
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.status().is_active() {
        metrics::record_login("disabled");
        return Err(ApiError::Forbidden("account is disabled".to_string()));
    }

    let now = OffsetDateTime::now_utc();
    let token = SessionToken::generate();
    let session = SessionRow {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: token.hash(),
        expires_at: now + state.config.auth.session_ttl(),
        created_at: now,
    };
    state.store.create_session(&session).await?;
    state.store.record_login(user.id, now).await?;
    user.last_login_at = Some(now);

    metrics::record_login("success");
    tracing::info!(user_id = %user.id, session_id = %session.id, "Login succeeded");

    let cookie = session_cookie(
        &state.config.auth,
        token.as_str(),
        state.config.auth.session_ttl_secs,
    );
    let response = LoginResponse {
        token: token.into_inner(),
        expires_at: format_timestamp(session.expires_at)?,
        user: user_to_response(&user)?,
    };

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(response)).into_response())
}

/// POST /v1/auth/logout - End the current session.
///
/// Always clears the cookie, so a browser holding a dead session can sign out.
pub async fn logout(State(state): State<AppState>, req: Request) -> ApiResult<Response> {
    let auth = get_auth(&req);
    if let Some(auth) = auth {
        state.store.delete_session(auth.session_id).await?;
        tracing::info!(user_id = %auth.id(), session_id = %auth.session_id, "Logged out");
    }

    let cookie = clear_session_cookie(&state.config.auth);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// GET /v1/auth/whoami - Return the signed-in account.
pub async fn whoami(req: Request) -> ApiResult<Json<UserResponse>> {
    let auth = require_auth(&req)?;
    Ok(Json(user_to_response(&auth.user)?))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: &'static str,
    /// Other sessions of the account that were signed out.
    pub sessions_revoked: u64,
}

/// POST /v1/auth/change-password - Replace the caller's password.
pub async fn change_password(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<ChangePasswordResponse>> {
    let auth = require_auth(&req)?.clone();
    let body: ChangePasswordRequest = read_json(req, state.config.server.max_body_bytes).await?;

    if body.new_password != body.confirm_password {
        return Err(ApiError::BadRequest(
            "new password and confirmation do not match".to_string(),
        ));
    }
    validate_new_password(&body.new_password)?;

    if !verify_password(&body.current_password, &auth.user.password_hash)? {
        return Err(ApiError::BadRequest(
            "current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(&body.new_password)?;
    state
        .store
        .update_user_password(auth.id(), &password_hash, OffsetDateTime::now_utc())
        .await?;
    let sessions_revoked = state
        .store
        .delete_user_sessions(auth.id(), Some(auth.session_id))
        .await?;

    tracing::info!(
        user_id = %auth.id(),
        sessions_revoked = sessions_revoked,
        "Password changed"
    );

    Ok(Json(ChangePasswordResponse {
        message: "password updated",
        sessions_revoked,
    }))
}

