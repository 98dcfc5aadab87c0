//! HTML pages, rendered from templates compiled into the binary.

use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::users::record::Field;

const HOME: &str = "home.html";
const DATA_TABLE: &str = "data_table.html";

#[derive(Debug, thiserror::Error)]
#[error("template error: {0}")]
pub struct ViewError(#[from] minijinja::Error);

#[derive(Serialize)]
struct ViewErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        tracing::error!("Failed to render view: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ViewErrorResponse {
                error: "render_error",
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// The template set. Template names keep their `.html` suffix so that
/// minijinja escapes interpolated values.
#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, ViewError> {
        let mut env = Environment::new();
        env.add_template(HOME, include_str!("../templates/home.html"))?;
        env.add_template(DATA_TABLE, include_str!("../templates/data_table.html"))?;
        Ok(Self { env })
    }

    /// The dashboard.
    pub fn home(&self, username: &str) -> Result<Html<String>, ViewError> {
        let rendered = self
            .env
            .get_template(HOME)?
            .render(context! { username })?;
        Ok(Html(rendered))
    }

    /// The page hosting the data-table widget that calls back into `/users-data`.
    pub fn data_table(&self, username: &str, page_size: u32) -> Result<Html<String>, ViewError> {
        let columns: Vec<&str> = Field::ALL.iter().map(|field| field.as_str()).collect();
        let rendered = self.env.get_template(DATA_TABLE)?.render(context! {
            username,
            columns,
            page_size,
        })?;
        Ok(Html(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_escapes_username() {
        let views = Views::new().unwrap();
        let Html(body) = views.home("<script>").unwrap();
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_data_table_declares_every_column() {
        let views = Views::new().unwrap();
        let Html(body) = views.data_table("ann", 25).unwrap();
        for field in Field::ALL {
            assert!(body.contains(&format!("data-column=\"{field}\"")));
        }
        assert!(body.contains("data-page-length=\"25\""));
    }
}
