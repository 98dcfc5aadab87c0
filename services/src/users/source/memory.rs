//! In-process record source.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use super::{FetchAll, RecordSource, Selection, select_in_memory};
use crate::table::filter::{RecordFilter, SortOrder, Window};
use crate::users::record::UserRecord;

#[derive(Debug, thiserror::Error)]
pub enum MemoryUserSourceError {
    /// A writer panicked while holding the lock; the records can no longer be trusted.
    #[error("in-memory user records are poisoned")]
    Poisoned,
}

/// Users held in a shared `Vec`, keyed by `id`.
///
/// Clones share the same records, so a test can keep a handle and insert rows
/// after the router has been built.
///
/// ```
/// use chrono::Utc;
/// use roster_services::users::record::{Role, UserRecord};
/// use roster_services::users::source::MemoryUserSource;
///
/// let source = MemoryUserSource::new();
/// source
///     .insert(UserRecord::new(1, "Ann", "ann@example.com", Role::Admin, Utc::now()))
///     .unwrap();
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryUserSource {
    records: Arc<RwLock<Vec<UserRecord>>>,
}

impl MemoryUserSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source pre-populated with `records`. Later duplicates of an
    /// `id` replace earlier ones.
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = UserRecord>,
    {
        let mut unique: Vec<UserRecord> = Vec::new();
        for record in records {
            match unique.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => unique.push(record),
            }
        }
        Self {
            records: Arc::new(RwLock::new(unique)),
        }
    }

    /// Insert `record`, replacing any record with the same `id`.
    pub fn insert(&self, record: UserRecord) -> Result<(), MemoryUserSourceError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| MemoryUserSourceError::Poisoned)?;
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    /// Returns the number of records; a poisoned source reports zero.
    pub fn len(&self) -> usize {
        self.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<UserRecord>>, MemoryUserSourceError> {
        self.records
            .read()
            .map_err(|_| MemoryUserSourceError::Poisoned)
    }
}

impl RecordSource for MemoryUserSource {
    type Error = MemoryUserSourceError;

    async fn count(&self) -> Result<u64, Self::Error> {
        Ok(self.read()?.len() as u64)
    }

    async fn query(
        &self,
        filter: &RecordFilter,
        sort: SortOrder,
        window: Window,
    ) -> Result<Selection, Self::Error> {
        let records = self.read()?;
        Ok(select_in_memory(records.iter(), filter, sort, window))
    }

    async fn is_connected(&self) -> bool {
        self.read().is_ok()
    }
}

impl FetchAll for MemoryUserSource {
    type Error = MemoryUserSourceError;

    async fn fetch_all(&self) -> Result<Vec<UserRecord>, Self::Error> {
        Ok(self.read()?.clone())
    }

    async fn is_connected(&self) -> bool {
        self.read().is_ok()
    }
}
