//! Row predicates, orderings and windows shared by every record source.
//!
//! The in-memory sources evaluate these directly; the PostgreSQL source
//! translates the same values into SQL so both strategies agree on which rows
//! match and in what order they come back.

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SubsecRound, TimeDelta, Utc};

use super::error::ValidationError;
use crate::users::record::{Field, FieldKind, FieldRef, FieldValue, Role, UserRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::new(
                "sortDirection",
                format!("expected asc or desc, got {s:?}"),
            )),
        }
    }
}

/// Ordering of a listing: one field plus direction, with `id` ascending as
/// the final tie-breaker so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(field: Field, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn compare(&self, a: &UserRecord, b: &UserRecord) -> Ordering {
        let primary = a.get(self.field).cmp(&b.get(self.field));
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::new(Field::Id, SortDirection::Asc)
    }
}

/// Constraint on a single column. Range bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Equals(FieldValue),
    Range {
        from: Option<FieldValue>,
        to: Option<FieldValue>,
    },
}

impl FilterValue {
    /// Parse a raw filter parameter for `field`.
    ///
    /// For range-typed fields `a..b` is a range and either side may be empty.
    /// Other fields take the whole value as an equality match. A bare
    /// `YYYY-MM-DD` for a timestamp field covers that whole UTC day.
    pub fn parse(field: Field, raw: &str) -> Result<Self, ValidationError> {
        if field.supports_range()
            && let Some((from, to)) = raw.split_once("..")
        {
            let from = match from.trim() {
                "" => None,
                s => Some(parse_bound(field, s, Bound::Lower)?),
            };
            let to = match to.trim() {
                "" => None,
                s => Some(parse_bound(field, s, Bound::Upper)?),
            };
            return match (&from, &to) {
                (None, None) => Err(ValidationError::new(
                    "filter",
                    format!("range for {field} has no bounds"),
                )),
                (Some(lo), Some(hi)) if lo.as_field_ref() > hi.as_field_ref() => {
                    Err(ValidationError::new(
                        "filter",
                        format!("range for {field} has its lower bound above its upper bound"),
                    ))
                }
                _ => Ok(Self::Range { from, to }),
            };
        }

        let raw = raw.trim();
        if field.kind() == FieldKind::Timestamp
            && let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        {
            let (start, end) = day_bounds(field, day)?;
            return Ok(Self::Range {
                from: Some(FieldValue::Timestamp(start)),
                to: Some(FieldValue::Timestamp(end)),
            });
        }

        parse_value(field, raw).map(Self::Equals)
    }

    pub fn matches(&self, value: FieldRef<'_>) -> bool {
        match self {
            Self::Equals(expected) => value == expected.as_field_ref(),
            Self::Range { from, to } => {
                from.as_ref().is_none_or(|lo| value >= lo.as_field_ref())
                    && to.as_ref().is_none_or(|hi| value <= hi.as_field_ref())
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn parse_bound(field: Field, raw: &str, bound: Bound) -> Result<FieldValue, ValidationError> {
    if field.kind() == FieldKind::Timestamp
        && let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    {
        let (start, end) = day_bounds(field, day)?;
        return Ok(FieldValue::Timestamp(match bound {
            Bound::Lower => start,
            Bound::Upper => end,
        }));
    }
    parse_value(field, raw)
}

/// First and last representable instant (microsecond precision, matching
/// PostgreSQL `timestamptz`) of `day` in UTC.
fn day_bounds(
    field: Field,
    day: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
    let out_of_range = || ValidationError::new("filter", format!("{field}: date out of range"));
    let start = day.and_hms_opt(0, 0, 0).ok_or_else(out_of_range)?.and_utc();
    let end = start
        .checked_add_signed(TimeDelta::days(1) - TimeDelta::microseconds(1))
        .ok_or_else(out_of_range)?;
    Ok((start, end))
}

fn parse_value(field: Field, raw: &str) -> Result<FieldValue, ValidationError> {
    let invalid = |what: &str| ValidationError::new("filter", format!("{field}: {what} {raw:?}"));
    match field.kind() {
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| invalid("expected an integer, got")),
        FieldKind::Text => Ok(FieldValue::Text(raw.to_owned())),
        FieldKind::Role => raw
            .parse::<Role>()
            .map(FieldValue::Role)
            .map_err(|_| invalid("unknown role")),
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(raw)
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc).trunc_subsecs(6)))
            .map_err(|_| invalid("expected an RFC 3339 timestamp or YYYY-MM-DD, got")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub field: Field,
    pub value: FilterValue,
}

/// Combined row predicate: search AND every column filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    search: Option<String>,
    needle: Option<String>,
    columns: Vec<ColumnFilter>,
}

impl RecordFilter {
    pub fn new(search: Option<String>, columns: Vec<ColumnFilter>) -> Self {
        let needle = search.as_deref().map(str::to_lowercase);
        Self {
            search,
            needle,
            columns,
        }
    }

    /// The search term as the client sent it (after truncation).
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn columns(&self) -> &[ColumnFilter] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.columns.is_empty()
    }

    pub fn matches(&self, record: &UserRecord) -> bool {
        if let Some(needle) = &self.needle {
            let found = Field::SEARCHABLE.into_iter().any(|field| match record.get(field) {
                FieldRef::Text(text) => text.to_lowercase().contains(needle.as_str()),
                _ => false,
            });
            if !found {
                return false;
            }
        }

        self.columns
            .iter()
            .all(|filter| filter.value.matches(record.get(filter.field)))
    }
}

/// The slice of the ordered, filtered sequence to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Everything from the start; used by exports.
    pub fn unbounded() -> Self {
        Self::new(0, u64::MAX)
    }
}
