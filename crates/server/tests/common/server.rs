//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use folio_core::config::{AppConfig, DatabaseConfig};
use folio_server::{AppState, create_router};
use folio_store::{BlogStore, SqliteStore};
use folio_store::repos::UserRepo;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

/// Password used by every account the helpers create.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "secret123";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server backed by a temporary SQLite database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("folio.db");

        let store: Arc<dyn BlogStore> = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create store"),
        );

        let mut config = AppConfig::for_testing();
        config.database = DatabaseConfig::Sqlite {
            path: db_path,
            query_timeout_secs: None,
        };
        config.site.base_url = "https://blog.example.com".to_string();

        modifier(&mut config);

        let state = AppState::new(config, store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying store.
    pub fn store(&self) -> Arc<dyn BlogStore> {
        self.state.store.clone()
    }

    /// Send a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// JSON request with an optional bearer token.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        json_request(&self.router, method, uri, body, token).await
    }

    /// Register an account and return the response body.
    pub async fn register(&self, email: &str, name: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/v1/auth/register",
                Some(json!({ "email": email, "password": TEST_PASSWORD, "name": name })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    /// Log in and return the session token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/v1/auth/login",
                Some(json!({ "email": email, "password": TEST_PASSWORD })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register and log in a regular user. Returns (user id, token).
    pub async fn signup(&self, email: &str) -> (Uuid, String) {
        let user = self.register(email, "Reader").await;
        let id = Uuid::parse_str(user["id"].as_str().unwrap()).unwrap();
        (id, self.login(email).await)
    }

    /// Register an account, grant it the admin flag, and log in.
    pub async fn admin(&self, email: &str) -> (Uuid, String) {
        let user = self.register(email, "Admin").await;
        let id = Uuid::parse_str(user["id"].as_str().unwrap()).unwrap();

        let store = self.store();
        let mut row = store.get_user(id).await.unwrap().unwrap();
        row.is_admin = true;
        row.updated_at = OffsetDateTime::now_utc();
        store.update_user(&row).await.unwrap();

        (id, self.login(email).await)
    }

    /// Create a document as `token` and return the response body.
    pub async fn create_document(&self, token: &str, title: &str, slug: &str, published: bool) -> Value {
        self.create_document_with(
            token,
            json!({
                "title": title,
                "slug": slug,
                "content": format!("Body of {title}"),
                "published": published,
            }),
        )
        .await
    }

    /// Create a document from a full JSON body.
    pub async fn create_document_with(&self, token: &str, body: Value) -> Value {
        let (status, body) = self
            .request("POST", "/v1/documents", Some(body), Some(token))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create document failed: {body}");
        body
    }

    /// Create a category and return the response body.
    pub async fn create_category(&self, token: &str, name: &str, slug: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/v1/categories",
                Some(json!({ "name": name, "slug": slug })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create category failed: {body}");
        body
    }

    /// Create a tag and return the response body.
    pub async fn create_tag(&self, token: &str, name: &str, slug: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/v1/tags",
                Some(json!({ "name": name, "slug": slug })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create tag failed: {body}");
        body
    }
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Read a response body as UTF-8 text.
#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
