//! Authentication and authorization middleware.

use crate::error::{ApiError, ApiResult};
use crate::ratelimit::UserIdExtension;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use folio_core::config::AuthConfig;
use axum::middleware::Next;
use axum::response::Response;
use folio_core::hash_session_token;
use folio_store::models::UserRow;
use folio_store::repos::{SessionRepo, UserRepo};
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, keeping at most
    /// `MAX_TRACE_ID_LEN` printable ASCII characters.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The signed-in caller, inserted into request extensions by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user: UserRow,
    /// Session the request was authenticated with.
    pub session_id: Uuid,
}

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }

    /// Require the administrator flag.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "administrator privileges required".to_string(),
            ))
        }
    }

    /// Allow the owner of a resource or an administrator.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> ApiResult<()> {
        if self.is_admin() || self.user.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "only the author or an administrator may do this".to_string(),
            ))
        }
    }
}

/// Build the `Set-Cookie` value carrying a session token.
pub fn session_cookie(config: &AuthConfig, token: &str, max_age_secs: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name, token, max_age_secs
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(config: &AuthConfig) -> String {
    session_cookie(config, "", 0)
}

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|token| !token.is_empty())
}

/// Extract the session token from the `Cookie` header(s).
pub fn extract_cookie_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Bearer token first, then the session cookie.
pub fn extract_session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    extract_bearer_token(headers).or_else(|| extract_cookie_token(headers, cookie_name))
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Resolve a presented session token to its user.
///
/// `None` for unknown or expired sessions and disabled accounts; only store
/// failures are errors.
async fn resolve_session(state: &AppState, token: &str) -> ApiResult<Option<AuthenticatedUser>> {
    let token_hash = hash_session_token(token);
    let Some(session) = state.store.get_session_by_hash(&token_hash).await? else {
        tracing::debug!("Unknown session token presented");
        return Ok(None);
    };

    if session.is_expired(OffsetDateTime::now_utc()) {
        if let Err(e) = state.store.delete_session(session.id).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to delete expired session");
        }
        tracing::debug!(session_id = %session.id, "Expired session presented");
        return Ok(None);
    }

    let Some(user) = state.store.get_user(session.user_id).await? else {
        return Ok(None);
    };

    if !user.status().is_active() {
        tracing::debug!(user_id = %user.id, "Session of disabled account presented");
        return Ok(None);
    }

    Ok(Some(AuthenticatedUser {
        user,
        session_id: session.id,
    }))
}

/// Authentication middleware that resolves sessions and sets up trace context.
///
/// Requests without credentials, or whose token no longer resolves, pass
/// through anonymously; handlers decide whether they need a user. A stale
/// session cookie is cleared on the way out unless the handler set a new one.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    let cookie_name = &state.config.auth.cookie_name;
    let token = extract_session_token(req.headers(), cookie_name).map(str::to_string);
    let from_cookie = extract_bearer_token(req.headers()).is_none()
        && extract_cookie_token(req.headers(), cookie_name).is_some();

    let mut user_id = None;
    let mut stale_cookie = false;
    if let Some(token) = token {
        match resolve_session(&state, &token).await? {
            Some(auth) => {
                user_id = Some(auth.user.id);
                req.extensions_mut()
                    .insert(UserIdExtension(auth.user.id.to_string()));
                req.extensions_mut().insert(auth);
            }
            None => stale_cookie = from_cookie,
        }
    }

    let span = match user_id {
        Some(user_id) => tracing::info_span!("request", trace_id = %trace_id_str, user_id = %user_id),
        None => tracing::info_span!("request", trace_id = %trace_id_str),
    };

    let mut response = next.run(req).instrument(span).await;
    if stale_cookie && !response.headers().contains_key(SET_COOKIE) {
        let cleared = clear_session_cookie(&state.config.auth);
        if let Ok(value) = HeaderValue::from_str(&cleared) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Require authentication.
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}

/// Require an authenticated administrator.
pub fn require_admin(req: &Request) -> ApiResult<&AuthenticatedUser> {
    let auth = require_auth(req)?;
    auth.require_admin()?;
    Ok(auth)
}

/// Get optional authentication.
pub fn get_auth(req: &Request) -> Option<&AuthenticatedUser> {
    req.extensions().get::<AuthenticatedUser>()
}

/// Get the trace ID from request extensions.
pub fn get_trace_id(req: &Request) -> Option<&TraceId> {
    req.extensions().get::<TraceId>()
}
