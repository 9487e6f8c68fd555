//! Comments and favorites.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use serde_json::{Value, json};

async fn comment(
    server: &TestServer,
    token: &str,
    document_id: &str,
    content: &str,
    parent_id: Option<&str>,
) -> Value {
    let (status, body) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": document_id, "content": content, "parent_id": parent_id })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create comment failed: {body}");
    body
}

fn id(value: &Value) -> &str {
    value["id"].as_str().unwrap()
}

#[tokio::test]
async fn test_comments_are_threaded() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (reader_id, reader) = server.signup("reader@example.com").await;
    let doc = server.create_document(&admin, "Post", "post", true).await;
    let doc_id = id(&doc);

    let root = comment(&server, &reader, doc_id, "  First!  ", None).await;
    assert_eq!(root["content"], "First!");
    assert_eq!(root["author_id"], reader_id.to_string());
    assert_eq!(root["author_name"], "Reader");
    assert_eq!(root["published"], true);
    assert_eq!(root["parent_id"], Value::Null);

    let reply = comment(&server, &admin, doc_id, "Thanks", Some(id(&root))).await;
    comment(&server, &reader, doc_id, "You're welcome", Some(id(&reply))).await;

    let (status, body) = server
        .request("GET", &format!("/v1/documents/{doc_id}/comments"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let threads = body["comments"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["id"], root["id"]);
    assert_eq!(threads[0]["replies"][0]["content"], "Thanks");
    assert_eq!(threads[0]["replies"][0]["author_name"], "Admin");
    assert_eq!(
        threads[0]["replies"][0]["replies"][0]["content"],
        "You're welcome"
    );
    assert_eq!(
        threads[0]["replies"][0]["replies"][0]["replies"],
        json!([])
    );
}

#[tokio::test]
async fn test_comment_requires_session_and_visible_document() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let draft = server.create_document(&admin, "Draft", "draft", false).await;
    let live = server.create_document(&admin, "Live", "live", true).await;

    let (status, _) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": id(&live), "content": "Anonymous" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": id(&draft), "content": "Sneaky" })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": id(&live), "content": "   " })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": id(&live), "content": "x".repeat(1001) })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reply_parent_must_exist_on_same_document() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let one = server.create_document(&admin, "One", "one", true).await;
    let two = server.create_document(&admin, "Two", "two", true).await;
    let on_one = comment(&server, &reader, id(&one), "On one", None).await;

    let (status, body) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({ "document_id": id(&two), "content": "Cross", "parent_id": id(&on_one) })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = server
        .request(
            "POST",
            "/v1/comments",
            Some(json!({
                "document_id": id(&one),
                "content": "Orphan",
                "parent_id": "00000000-0000-4000-8000-000000000000",
            })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_or_admin_edits_comments() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, author) = server.signup("author@example.com").await;
    let (_, other) = server.signup("other@example.com").await;
    let doc = server.create_document(&admin, "Post", "post", true).await;
    let note = comment(&server, &author, id(&doc), "Original", None).await;
    let uri = format!("/v1/comments/{}", id(&note));

    let (status, _) = server
        .request("PUT", &uri, Some(json!({ "content": "Hijacked" })), Some(&other))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = server
        .request("PUT", &uri, Some(json!({ "content": "Edited" })), Some(&author))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Edited");
    assert_eq!(edited["author_name"], "Reader");

    let (status, edited) = server
        .request("PUT", &uri, Some(json!({ "content": "Moderated" })), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Moderated");

    let (status, _) = server.request("DELETE", &uri, None, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server.request("DELETE", &uri, None, Some(&author)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = server.request("DELETE", &uri, None, Some(&author)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_comment_removes_replies() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let doc = server.create_document(&admin, "Post", "post", true).await;
    let root = comment(&server, &reader, id(&doc), "Root", None).await;
    comment(&server, &admin, id(&doc), "Reply", Some(id(&root))).await;

    let (status, _) = server
        .request("DELETE", &format!("/v1/comments/{}", id(&root)), None, Some(&reader))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = server
        .request("GET", &format!("/v1/documents/{}/comments", id(&doc)), None, Some(&admin))
        .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_toggle_published_hides_comment_subtree() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let doc = server.create_document(&admin, "Post", "post", true).await;
    let root = comment(&server, &reader, id(&doc), "Spam", None).await;
    comment(&server, &reader, id(&doc), "More spam", Some(id(&root))).await;
    let toggle = format!("/v1/comments/{}/toggle-published", id(&root));
    let comments = format!("/v1/documents/{}/comments", id(&doc));

    let (status, _) = server.request("POST", &toggle, None, Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.request("POST", &toggle, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["published"], false);

    let (_, public) = server.request("GET", &comments, None, Some(&reader)).await;
    assert_eq!(public["total"], 0);

    let (_, moderated) = server.request("GET", &comments, None, Some(&admin)).await;
    assert_eq!(moderated["total"], 2);
    assert_eq!(moderated["comments"][0]["published"], false);

    let (_, body) = server.request("POST", &toggle, None, Some(&admin)).await;
    assert_eq!(body["published"], true);
    let (_, public) = server.request("GET", &comments, None, None).await;
    assert_eq!(public["total"], 2);
}

#[tokio::test]
async fn test_favorites_lifecycle() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let doc = server
        .create_document_with(
            &admin,
            json!({ "title": "Keeper", "slug": "keeper", "excerpt": "Worth it", "published": true }),
        )
        .await;
    let doc_id = id(&doc);
    let check = format!("/v1/favorites/check?document_id={doc_id}");

    let (status, _) = server
        .request("POST", "/v1/favorites", Some(json!({ "document_id": doc_id })), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, added) = server
        .request(
            "POST",
            "/v1/favorites",
            Some(json!({ "document_id": doc_id })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["document_id"], doc_id);

    let (status, body) = server
        .request(
            "POST",
            "/v1/favorites",
            Some(json!({ "document_id": doc_id })),
            Some(&reader),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "conflict: document is already in favorites");

    server
        .request(
            "POST",
            "/v1/favorites",
            Some(json!({ "document_id": doc_id })),
            Some(&admin),
        )
        .await;

    let (_, body) = server.request("GET", &check, None, Some(&reader)).await;
    assert_eq!(body, json!({ "is_favorited": true, "count": 2 }));
    let (_, body) = server.request("GET", &check, None, None).await;
    assert_eq!(body, json!({ "is_favorited": false, "count": 2 }));

    let (status, list) = server
        .request("GET", "/v1/favorites", None, Some(&reader))
        .await;
    assert_eq!(status, StatusCode::OK);
    let favorites = list["favorites"].as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["id"], added["id"]);
    assert_eq!(favorites[0]["title"], "Keeper");
    assert_eq!(favorites[0]["excerpt"], "Worth it");

    let (status, _) = server
        .request("DELETE", &format!("/v1/favorites/{doc_id}"), None, Some(&reader))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = server
        .request("DELETE", &format!("/v1/favorites/{doc_id}"), None, Some(&reader))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "not found: favorite not found");

    let (_, body) = server.request("GET", &check, None, Some(&reader)).await;
    assert_eq!(body, json!({ "is_favorited": false, "count": 1 }));
}

#[tokio::test]
async fn test_cannot_favorite_hidden_or_missing_documents() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let draft = server.create_document(&admin, "Draft", "draft", false).await;

    for document_id in [id(&draft), "00000000-0000-4000-8000-000000000000"] {
        let (status, _) = server
            .request(
                "POST",
                "/v1/favorites",
                Some(json!({ "document_id": document_id })),
                Some(&reader),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = server
        .request("GET", "/v1/favorites", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unpublished_favorites_are_hidden_from_readers() {
    let server = TestServer::new().await;
    let (_, admin) = server.admin("admin@example.com").await;
    let (_, reader) = server.signup("reader@example.com").await;
    let doc = server.create_document(&admin, "Fleeting", "fleeting", true).await;
    let doc_id = id(&doc);
    let check = format!("/v1/favorites/check?document_id={doc_id}");

    for token in [&reader, &admin] {
        let (status, _) = server
            .request(
                "POST",
                "/v1/favorites",
                Some(json!({ "document_id": doc_id })),
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = server
        .request(
            "PUT",
            &format!("/v1/documents/{doc_id}"),
            Some(json!({ "published": false })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = server
        .request("GET", "/v1/favorites", None, Some(&reader))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["favorites"], json!([]));
    let (status, _) = server.request("GET", &check, None, Some(&reader)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.request("GET", &check, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = server
        .request("GET", "/v1/favorites", None, Some(&admin))
        .await;
    assert_eq!(list["favorites"].as_array().unwrap().len(), 1);
    let (status, body) = server.request("GET", &check, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "is_favorited": true, "count": 2 }));
}
