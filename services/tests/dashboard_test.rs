//! Integration tests for the dashboard at `/`.

mod common;

use axum::http::{StatusCode, header};
use axum_test::TestServer;
use common::{create_test_app, seeded_source, session_token};

#[tokio::test]
async fn test_dashboard_greets_the_session_user() {
    let server = TestServer::new(create_test_app(seeded_source())).unwrap();

    let response = server
        .get("/")
        .add_header(
            header::COOKIE,
            format!("roster_session={}", session_token("ann")),
        )
        .await;

    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("Signed in as <strong>ann</strong>"));
    assert!(body.contains("href=\"/users-data\""));
}

#[tokio::test]
async fn test_dashboard_requires_a_session() {
    let server = TestServer::new(create_test_app(seeded_source())).unwrap();

    let response = server.get("/").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"], "missing_token");
}

#[tokio::test]
async fn test_expired_or_foreign_tokens_are_rejected() {
    let server = TestServer::new(create_test_app(seeded_source())).unwrap();
    let foreign = roster_services::auth::generate_session_token("ann", "another-secret").unwrap();

    let response = server
        .get("/")
        .add_header(header::AUTHORIZATION, format!("Bearer {foreign}"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<serde_json::Value>()["error"], "invalid_token");
}
