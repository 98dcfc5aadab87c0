//! Runs a validated [`QuerySpec`] against a [`RecordSource`].

use super::error::TableError;
use super::filter::Window;
use super::query::QuerySpec;
use crate::users::record::UserRecord;
use crate::users::source::RecordSource;

/// One page of a listing, with the counts a data-table client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub records: Vec<UserRecord>,
    /// Every record in the source.
    pub total_count: u64,
    /// Records matching the filter, across all pages.
    pub filtered_count: u64,
    pub echo: Option<u64>,
    /// The requested page size; `records` never holds more.
    pub page_size: u32,
}

/// Stateless query executor. Every call reads the source afresh.
pub struct TableQueryEngine<'a, S> {
    source: &'a S,
}

impl<'a, S: RecordSource> TableQueryEngine<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Produce the page described by `spec`.
    ///
    /// A page past the end is not an error: it comes back empty with the
    /// counts still filled in.
    #[tracing::instrument(
        skip_all,
        fields(page = spec.page(), page_size = spec.page_size(), sort = %spec.sort().field)
    )]
    pub async fn execute(&self, spec: &QuerySpec) -> Result<ResultPage, TableError> {
        let selection = self
            .source
            .query(spec.filter(), spec.sort(), spec.window())
            .await
            .map_err(unavailable)?;

        tracing::debug!(
            total = selection.total_count,
            filtered = selection.filtered_count,
            rows = selection.records.len(),
            "Listing page selected"
        );

        Ok(ResultPage {
            records: selection.records,
            total_count: selection.total_count,
            filtered_count: selection.filtered_count,
            echo: spec.echo(),
            page_size: spec.page_size(),
        })
    }

    /// Every record matching `spec`'s filter in `spec`'s order, ignoring paging.
    #[tracing::instrument(skip_all, fields(sort = %spec.sort().field))]
    pub async fn export(&self, spec: &QuerySpec) -> Result<Vec<UserRecord>, TableError> {
        let selection = self
            .source
            .query(spec.filter(), spec.sort(), Window::unbounded())
            .await
            .map_err(unavailable)?;
        tracing::debug!(rows = selection.records.len(), "Export selected");
        Ok(selection.records)
    }
}

fn unavailable<E: std::error::Error>(err: E) -> TableError {
    TableError::SourceUnavailable(err.to_string())
}
