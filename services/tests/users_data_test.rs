//! Integration tests for `/users-data`.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, TimeZone, Utc};
use common::{
    FailingSource, authed_get, create_test_app, get_response_json, get_response_text,
    seeded_source, session_token,
};
use roster_services::users::record::{Role, UserRecord};
use roster_services::users::source::MemoryUserSource;
use serde_json::{Value, json};
use tower::ServiceExt;

fn names(json: &Value) -> Vec<&str> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_first_page_sorted_by_name() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?draw=1&page=1&pageSize=2&sort=name&dir=asc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_response_json(response).await;
    assert_eq!(json["draw"], 1);
    assert_eq!(json["recordsTotal"], 3);
    assert_eq!(json["recordsFiltered"], 3);
    assert_eq!(names(&json), vec!["Ann", "Bob"]);
    assert_eq!(
        json["data"][0],
        json!({
            "id": 2,
            "name": "Ann",
            "email": "ann@example.com",
            "role": "viewer",
            "created_at": "2024-03-02T12:00:00Z",
        })
    );
}

#[tokio::test]
async fn test_second_page_is_the_remainder() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?draw=2&page=2&pageSize=2&sort=name"))
        .await
        .unwrap();

    let json = get_response_json(response).await;
    assert_eq!(names(&json), vec!["Cid"]);
    assert_eq!(json["draw"], 2);
}

#[tokio::test]
async fn test_search_narrows_filtered_count() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?draw=3&search=an"))
        .await
        .unwrap();

    let json = get_response_json(response).await;
    assert_eq!(json["recordsTotal"], 3);
    assert_eq!(json["recordsFiltered"], 1);
    assert_eq!(names(&json), vec!["Ann"]);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty_not_an_error() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?draw=4&page=5&pageSize=10"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_response_json(response).await;
    assert_eq!(json["data"], json!([]));
    assert_eq!(json["recordsFiltered"], 3);
}

#[tokio::test]
async fn test_datatable_form_post() {
    let app = create_test_app(seeded_source());
    let form = [
        ("draw", "9"),
        ("columns[0][data]", "id"),
        ("columns[1][data]", "name"),
        ("columns[2][data]", "email"),
        ("columns[3][data]", "role"),
        ("columns[4][data]", "created_at"),
        ("columns[3][search][value]", ""),
        ("order[0][column]", "4"),
        ("order[0][dir]", "desc"),
        ("start", "0"),
        ("length", "2"),
        ("search[value]", ""),
        ("search[regex]", "false"),
    ]
    .iter()
    .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
    .collect::<Vec<_>>()
    .join("&");

    let request = Request::builder()
        .method("POST")
        .uri("/users-data")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-requested-with", "XMLHttpRequest")
        .header(header::COOKIE, format!("roster_session={}", session_token("ann")))
        .body(Body::from(form))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_response_json(response).await;
    assert_eq!(json["draw"], 9);
    assert_eq!(names(&json), vec!["Cid", "Ann"]);
}

fn urlencode(s: &str) -> String {
    s.replace('[', "%5B").replace(']', "%5D")
}

#[tokio::test]
async fn test_validation_errors_name_the_parameter() {
    for (uri, field) in [
        ("/users-data?draw=1&page=0", "page"),
        ("/users-data?draw=1&pageSize=1000", "pageSize"),
        ("/users-data?draw=1&sort=password", "sort"),
        ("/users-data?draw=1&dir=up", "sortDirection"),
        ("/users-data?draw=1&filter%5Bsalary%5D=1", "filter"),
        ("/users-data?draw=1&start=3&length=10", "start"),
        ("/users-data?action=pdf", "action"),
    ] {
        let app = create_test_app(seeded_source());
        let response = app.oneshot(authed_get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

        let json = get_response_json(response).await;
        assert_eq!(json["error"], "validation_error", "{uri}");
        assert_eq!(json["field"], field, "{uri}");
    }
}

#[tokio::test]
async fn test_column_filters() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get(
            "/users-data?draw=1&filter%5Brole%5D=editor&filter%5Bid%5D=2..3",
        ))
        .await
        .unwrap();

    let json = get_response_json(response).await;
    assert_eq!(json["recordsFiltered"], 1);
    assert_eq!(names(&json), vec!["Cid"]);
}

#[tokio::test]
async fn test_date_filter_covers_the_day() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?draw=1&filter%5Bcreated_at%5D=2024-03-02"))
        .await
        .unwrap();

    let json = get_response_json(response).await;
    assert_eq!(names(&json), vec!["Ann"]);
}

#[tokio::test]
async fn test_source_failure_is_503() {
    let app = create_test_app(FailingSource);
    let response = app.oneshot(authed_get("/users-data?draw=1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = get_response_json(response).await;
    assert_eq!(json["error"], "source_unavailable");
    assert!(json.get("field").is_none());
}

#[tokio::test]
async fn test_csv_export_ignores_paging() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(authed_get("/users-data?action=csv&sort=name&pageSize=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("users.csv")
    );

    let body = get_response_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "id,name,email,role,created_at");
    assert!(lines[1].starts_with("2,Ann,"));
    assert!(lines[3].starts_with("3,Cid,"));
}

#[tokio::test]
async fn test_plain_navigation_renders_the_widget_page() {
    let app = create_test_app(seeded_source());
    let response = app.oneshot(authed_get("/users-data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let body = get_response_text(response).await;
    assert!(body.contains("id=\"users\""));
    assert!(body.contains("/users-data"));
}

#[tokio::test]
async fn test_accept_json_selects_json() {
    let app = create_test_app(seeded_source());
    let request = Request::builder()
        .uri("/users-data")
        .header(header::ACCEPT, "application/json")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", session_token("ann")),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let json = get_response_json(response).await;
    // No draw parameter: echoed as zero.
    assert_eq!(json["draw"], 0);
    assert_eq!(json["recordsTotal"], 3);
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let app = create_test_app(seeded_source());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/users-data?draw=1")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_response_json(response).await;
    assert_eq!(json["error"], "invalid_token");
}

#[tokio::test]
async fn test_every_request_sees_current_records() {
    let source = seeded_source();
    let app = create_test_app(source.clone());

    let before = get_response_json(
        app.clone()
            .oneshot(authed_get("/users-data?draw=1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(before["recordsTotal"], 3);

    source
        .insert(UserRecord::new(
            4,
            "Dee",
            "dee@example.com",
            Role::Viewer,
            Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
        ))
        .unwrap();

    let after = get_response_json(app.oneshot(authed_get("/users-data?draw=2")).await.unwrap()).await;
    assert_eq!(after["recordsTotal"], 4);
}

#[tokio::test]
async fn test_pages_concatenate_to_the_full_listing() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let source = MemoryUserSource::with_records((1..=17).map(|id| {
        UserRecord::new(
            id,
            if id % 2 == 0 { "Even" } else { "Odd" },
            format!("user{id}@example.com"),
            Role::Viewer,
            base + TimeDelta::hours(id),
        )
    }));
    let app = create_test_app(source);

    let mut ids = Vec::new();
    for page in 1..=4 {
        let uri = format!("/users-data?draw={page}&page={page}&pageSize=5&sort=name&dir=desc");
        let json = get_response_json(app.clone().oneshot(authed_get(&uri)).await.unwrap()).await;
        assert_eq!(json["recordsFiltered"], 17);
        let rows = json["data"].as_array().unwrap();
        assert!(rows.len() <= 5);
        ids.extend(rows.iter().map(|row| row["id"].as_i64().unwrap()));
    }

    // "Odd" sorts after "Even", so descending puts odd ids first, each group by id.
    let expected: Vec<i64> = (1..=17)
        .filter(|id| id % 2 == 1)
        .chain((1..=17).filter(|id| id % 2 == 0))
        .collect();
    assert_eq!(ids, expected);
}
