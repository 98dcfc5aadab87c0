//! Shared test utilities for integration tests.
//!
//! This module provides common test infrastructure including:
//! - `seeded_source` - a `MemoryUserSource` with a small fixed roster
//! - `FailingSource` - a `RecordSource` whose store is unreachable
//! - Session token and request helpers

use axum::{
    Router,
    body::Body,
    http::{Request, header::AUTHORIZATION},
};
use chrono::{TimeZone, Utc};
use roster_services::{
    auth::generate_session_token,
    config::Config,
    routes,
    table::filter::{RecordFilter, SortOrder, Window},
    users::{
        record::{Role, UserRecord},
        source::{MemoryUserSource, RecordSource, Selection},
    },
};
use serde_json::Value;

/// JWT secret used for test token generation.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-local-development";

/// Bob (1), Ann (2), Cid (3); ids do not follow name order.
#[allow(dead_code)]
pub fn seeded_source() -> MemoryUserSource {
    let at = |day| Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
    MemoryUserSource::with_records([
        UserRecord::new(1, "Bob", "bob@example.com", Role::Admin, at(1)),
        UserRecord::new(2, "Ann", "ann@example.com", Role::Viewer, at(2)),
        UserRecord::new(3, "Cid", "cid@example.com", Role::Editor, at(3)),
    ])
}

/// A source whose backing store is down.
#[allow(dead_code)]
#[derive(Clone)]
pub struct FailingSource;

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
pub struct Unreachable;

impl RecordSource for FailingSource {
    type Error = Unreachable;

    async fn count(&self) -> Result<u64, Self::Error> {
        Err(Unreachable)
    }

    async fn query(
        &self,
        _filter: &RecordFilter,
        _sort: SortOrder,
        _window: Window,
    ) -> Result<Selection, Self::Error> {
        Err(Unreachable)
    }

    async fn is_connected(&self) -> bool {
        false
    }
}

pub fn test_config() -> Config {
    Config::new_for_test().with_jwt_secret(TEST_JWT_SECRET)
}

/// Creates the application router over `source` with the test configuration.
pub fn create_test_app<S: RecordSource>(source: S) -> Router {
    routes(source, test_config()).expect("templates compile")
}

#[allow(dead_code)]
pub fn session_token(username: &str) -> String {
    generate_session_token(username, TEST_JWT_SECRET).expect("token signs")
}

/// A `GET` carrying a bearer session.
#[allow(dead_code)]
pub fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", session_token("ann")))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn get_response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub async fn get_response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
