//! HTTP routes for the dashboard and the users listing.
//!
//! `/users-data` answers in one of three shapes, chosen per request:
//!
//! - `action=csv`: the whole filtered, sorted listing as a CSV attachment
//! - an AJAX call (`X-Requested-With: XMLHttpRequest`, a JSON `Accept`, or a
//!   `draw` parameter): one page as `{draw, recordsTotal, recordsFiltered, data}`
//! - anything else: the HTML page hosting the data-table widget
//!
//! Both `GET` (query string) and `POST` (form body) are accepted.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Extension, State},
    http::{
        HeaderMap, HeaderValue,
        header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Response},
    routing::get,
};

use super::source::RecordSource;
use crate::auth::RequireAuth;
use crate::config::Config;
use crate::table::{
    QuerySpec, RawListingParams, TableError, TableQueryEngine, ValidationError, pack, pack_csv,
};
use crate::views::{ViewError, Views};

/// Shared state of the user routes.
#[derive(Clone)]
pub struct AppState<S> {
    pub source: S,
    pub views: Arc<Views>,
}

impl<S: RecordSource> AppState<S> {
    pub fn new(source: S, views: Arc<Views>) -> Self {
        Self { source, views }
    }
}

pub fn user_routes<S: RecordSource>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(dashboard::<S>))
        .route("/users-data", get(users_data::<S>).post(users_data::<S>))
}

/// Everything `/users-data` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    View(#[from] ViewError),
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        match self {
            Self::Table(err) => err.into_response(),
            Self::View(err) => err.into_response(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Csv,
    Json,
    Page,
}

fn choose_reply(headers: &HeaderMap, raw: &RawListingParams) -> Result<Reply, ValidationError> {
    match raw.get("action") {
        None | Some("") => {}
        Some("csv") => return Ok(Reply::Csv),
        Some(other) => {
            return Err(ValidationError::new(
                "action",
                format!("unsupported action {other:?}"),
            ));
        }
    }

    let requested_with = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let wants_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if requested_with || wants_json || raw.get("draw").is_some() {
        Ok(Reply::Json)
    } else {
        Ok(Reply::Page)
    }
}

#[tracing::instrument(skip_all, fields(user = %auth.username()))]
async fn dashboard<S: RecordSource>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> Result<Html<String>, ViewError> {
    state.views.home(auth.username())
}

#[tracing::instrument(skip_all, fields(user = %auth.username()))]
async fn users_data<S: RecordSource>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ListingError> {
    let raw = RawListingParams::from_pairs(pairs);
    let limits = config.query_limits();
    let reply = choose_reply(&headers, &raw).map_err(TableError::from)?;
    tracing::debug!(?reply, "Serving users listing");

    if reply == Reply::Page {
        let page = state
            .views
            .data_table(auth.username(), limits.default_page_size)?;
        return Ok(page.into_response());
    }

    let spec = QuerySpec::parse(&raw, limits).map_err(TableError::from)?;
    let engine = TableQueryEngine::new(&state.source);

    match reply {
        Reply::Csv => {
            let records = engine.export(&spec).await?;
            let body = pack_csv(&records)?;
            Ok((
                [
                    (CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
                    (
                        CONTENT_DISPOSITION,
                        HeaderValue::from_static("attachment; filename=\"users.csv\""),
                    ),
                ],
                body,
            )
                .into_response())
        }
        _ => {
            let page = engine.execute(&spec).await?;
            Ok(Json(pack(page)?).into_response())
        }
    }
}
