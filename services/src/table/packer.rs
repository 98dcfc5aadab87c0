//! Wire shapes for a [`ResultPage`].

use serde::{Deserialize, Serialize};

use super::engine::ResultPage;
use super::error::TableError;
use crate::users::record::{Field, UserRecord};

/// The data-table response: `{draw, recordsTotal, recordsFiltered, data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableResponse {
    pub draw: u64,
    pub records_total: u64,
    pub records_filtered: u64,
    pub data: Vec<UserRecord>,
}

/// Shape a page for the wire. `draw` falls back to 0 when the client sent none.
pub fn pack(page: ResultPage) -> Result<DataTableResponse, TableError> {
    if page.records.len() as u64 > u64::from(page.page_size) {
        return Err(TableError::InvariantViolation(format!(
            "page holds {} rows but the page size is {}",
            page.records.len(),
            page.page_size
        )));
    }
    if page.filtered_count > page.total_count {
        return Err(TableError::InvariantViolation(format!(
            "{} records matched but only {} exist",
            page.filtered_count, page.total_count
        )));
    }

    Ok(DataTableResponse {
        draw: page.echo.unwrap_or(0),
        records_total: page.total_count,
        records_filtered: page.filtered_count,
        data: page.records,
    })
}

/// Render records as CSV with a header row of field names.
pub fn pack_csv(records: &[UserRecord]) -> Result<String, TableError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    let csv_error = |e: csv::Error| TableError::InvariantViolation(format!("CSV encoding: {e}"));

    writer
        .write_record(Field::ALL.iter().map(|field| field.as_str()))
        .map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TableError::InvariantViolation(format!("CSV encoding: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| TableError::InvariantViolation(format!("CSV encoding: {e}")))
}
