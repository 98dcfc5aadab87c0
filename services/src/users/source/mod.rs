//! Record sources for the users listing.
//!
//! # Strategies
//!
//! Every source implements [`RecordSource`]. The engine asks it for one
//! filtered, ordered window together with the total and filtered counts taken
//! from the same read, so a source is free to choose where that work happens:
//!
//! - [`PgUserSource`] pushes filtering, ordering and slicing into SQL. Use it
//!   for tables of any size.
//! - [`InMemory`] wraps any [`FetchAll`] store, loads every row per call and
//!   evaluates the query in process with [`select_in_memory`]. Only suitable
//!   for small tables, but it needs nothing from the store beyond a full scan.
//! - [`MemoryUserSource`] keeps records in process; used by tests and demos.
//!
//! All three produce identical results for identical data: the predicate and
//! ordering live in [`crate::table::filter`] and the SQL translation mirrors it.
//! Timestamps compare at microsecond precision on both sides. Search folds
//! case with Unicode rules in process; `ILIKE` folds by the database's
//! `LC_CTYPE`, so the two only agree on non-ASCII text under a UTF-8 locale.

mod memory;
mod postgres;

pub use memory::{MemoryUserSource, MemoryUserSourceError};
pub use postgres::{PgSourceError, PgUserSource};

use std::future::Future;

use super::record::UserRecord;
use crate::table::filter::{RecordFilter, SortOrder, Window};

/// One window of a filtered, ordered listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Every row in the source, read together with the rest of the selection.
    pub total_count: u64,
    /// Rows matching the filter, before the window was applied.
    pub filtered_count: u64,
    /// The rows inside the window, in order.
    pub records: Vec<UserRecord>,
}

/// Read access to the users being listed.
///
/// Sources are cheap handles (a pool, an `Arc`) shared by every request; the
/// listing never writes through them.
pub trait RecordSource: Clone + Send + Sync + 'static {
    /// The error type for read failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Count every record, ignoring any filter.
    fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Filter, order by `sort` (ties on `id` ascending) and cut out `window`.
    ///
    /// Both counts in the returned [`Selection`] come from one consistent
    /// read, so `filtered_count <= total_count` always holds.
    fn query(
        &self,
        filter: &RecordFilter,
        sort: SortOrder,
        window: Window,
    ) -> impl Future<Output = Result<Selection, Self::Error>> + Send;

    /// Whether the underlying store is reachable.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;
}

/// A store that can only hand back everything it holds.
pub trait FetchAll: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_all(&self) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send;

    fn is_connected(&self) -> impl Future<Output = bool> + Send;
}

/// Evaluate a query over records already in memory.
pub fn select_in_memory<'a, I>(
    records: I,
    filter: &RecordFilter,
    sort: SortOrder,
    window: Window,
) -> Selection
where
    I: IntoIterator<Item = &'a UserRecord>,
{
    let mut total_count = 0u64;
    let mut matching: Vec<&UserRecord> = records
        .into_iter()
        .inspect(|_| total_count += 1)
        .filter(|record| filter.matches(record))
        .collect();
    matching.sort_by(|a, b| sort.compare(a, b));

    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);

    Selection {
        total_count,
        filtered_count: matching.len() as u64,
        records: matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect(),
    }
}

/// Full-fetch strategy: pull every row from `S`, then filter, sort and slice here.
#[derive(Debug, Clone)]
pub struct InMemory<S> {
    inner: S,
}

impl<S> InMemory<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: FetchAll> RecordSource for InMemory<S> {
    type Error = S::Error;

    async fn count(&self) -> Result<u64, Self::Error> {
        Ok(self.inner.fetch_all().await?.len() as u64)
    }

    async fn query(
        &self,
        filter: &RecordFilter,
        sort: SortOrder,
        window: Window,
    ) -> Result<Selection, Self::Error> {
        let records = self.inner.fetch_all().await?;
        tracing::debug!(rows = records.len(), "Evaluating listing in memory");
        Ok(select_in_memory(&records, filter, sort, window))
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }
}
