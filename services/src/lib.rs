//! Roster: a paginated, sortable and searchable users listing served over HTTP.

use std::sync::Arc;

use crate::config::Config;
use crate::users::routes::AppState;
use crate::users::source::RecordSource;
use crate::views::{ViewError, Views};
use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use roster_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod auth;
pub mod config;
pub mod database;
pub mod table;
pub mod telemetry;
pub mod users;
pub mod views;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Build the application router over `source`.
///
/// Fails only if the embedded templates do not compile.
pub fn routes<S: RecordSource>(source: S, config: Config) -> Result<Router, ViewError> {
    let state = AppState::new(source, Arc::new(Views::new()?));

    Ok(Router::new()
        .route("/is-health", get(health_check::<S>))
        .merge(users::user_routes::<S>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                );
                span.set_parent(parent_context);
                span
            }),
        )
        .layer(Extension(config))
        .with_state(state))
}

async fn health_check<S: RecordSource>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    let mut response = if state.source.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    if let Ok(value) = HeaderValue::from_str(&config.environment().to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-env"), value);
    }

    let runtime_env: RuntimeEnv = config.environment().into();
    if let Ok(value) = HeaderValue::from_str(&format_version_for_runtime_env(runtime_env)) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-version"), value);
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::source::MemoryUserSource;
    use axum::body::Body;
    use tower::ServiceExt;

    fn app() -> Router {
        routes(MemoryUserSource::new(), Config::new_for_test()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_includes_headers() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/is-health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let env_header = response
            .headers()
            .get("x-service-env")
            .and_then(|v| v.to_str().ok());
        assert_eq!(env_header, Some("local"));

        let version_header = response
            .headers()
            .get("x-service-version")
            .and_then(|v| v.to_str().ok());
        let expected_version = format_version_for_runtime_env(RuntimeEnv::Local);
        assert_eq!(version_header, Some(expected_version.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_path_falls_back_to_404() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/wp-admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_requires_a_session() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/users-data?draw=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
