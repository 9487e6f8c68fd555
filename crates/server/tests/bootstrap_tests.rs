//! Startup administrator bootstrap.

mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, TestServer};
use folio_core::config::AdminConfig;
use folio_server::bootstrap::{AdminBootstrap, ensure_admin_user};
use folio_store::repos::UserRepo;
use secrecy::SecretString;
use serde_json::json;

fn admin_config(email: &str, password: &str) -> AdminConfig {
    AdminConfig {
        email: email.to_string(),
        name: "Site Owner".to_string(),
        password: SecretString::from(password.to_string()),
    }
}

#[tokio::test]
async fn test_bootstrap_creates_admin_that_can_log_in() {
    let server = TestServer::new().await;
    let store = server.store();

    let outcome = ensure_admin_user(&*store, &admin_config("Owner@Example.com", "bootstrap1"))
        .await
        .unwrap();
    assert_eq!(outcome, AdminBootstrap::Created);

    let user = store
        .get_user_by_email("owner@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_admin);
    assert_eq!(user.name, "Site Owner");

    let (status, body) = server
        .request(
            "POST",
            "/v1/auth/login",
            Some(json!({ "email": "owner@example.com", "password": "bootstrap1" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_admin"], true);

    let again = ensure_admin_user(&*store, &admin_config("owner@example.com", "other-pass"))
        .await
        .unwrap();
    assert_eq!(again, AdminBootstrap::Unchanged);
}

#[tokio::test]
async fn test_bootstrap_promotes_existing_account_without_touching_password() {
    let server = TestServer::new().await;
    let (user_id, _) = server.signup("reader@example.com").await;
    let store = server.store();

    let mut user = store.get_user(user_id).await.unwrap().unwrap();
    user.status = "disabled".to_string();
    store.update_user(&user).await.unwrap();

    let outcome = ensure_admin_user(&*store, &admin_config("reader@example.com", "ignored-pass1"))
        .await
        .unwrap();
    assert_eq!(outcome, AdminBootstrap::Promoted);

    let user = store.get_user(user_id).await.unwrap().unwrap();
    assert!(user.is_admin);
    assert_eq!(user.status, "active");

    // The original password still works.
    let token = server.login("reader@example.com").await;
    let (status, _) = server
        .request("GET", "/v1/admin/stats", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .request(
            "POST",
            "/v1/auth/login",
            Some(json!({ "email": "reader@example.com", "password": "ignored-pass1" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_ne!(TEST_PASSWORD, "ignored-pass1");
}

#[tokio::test]
async fn test_bootstrap_rejects_invalid_email() {
    let server = TestServer::new().await;
    let result = ensure_admin_user(&*server.store(), &admin_config("not-an-email", "whatever1")).await;
    assert!(result.is_err());
}
