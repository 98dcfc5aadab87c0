//! Listing request parsing.
//!
//! Data-table clients send every parameter as a string, with nested names such
//! as `order[0][column]` or `columns[2][search][value]`. [`RawListingParams`]
//! keeps those pairs untouched; [`QuerySpec::parse`] validates them and
//! produces the typed [`QuerySpec`] the engine runs. Nothing downstream of
//! this module ever sees a raw parameter.
//!
//! Accepted parameters:
//!
//! | parameter | meaning |
//! |---|---|
//! | `page`, `pageSize` / `length` | 1-based page and page size |
//! | `start` | row offset, used when `page` is absent |
//! | `search[value]` / `search` | free-text search |
//! | `order[0][column]` + `columns[i][data]`, or `sort` | sort field |
//! | `order[0][dir]` / `dir` | `asc` or `desc` |
//! | `columns[i][search][value]`, `filter[<field>]` | column filters |
//! | `draw` | echo token |

use std::collections::{BTreeMap, HashMap};

use super::error::ValidationError;
use super::filter::{ColumnFilter, FilterValue, RecordFilter, SortDirection, SortOrder, Window};
use crate::users::record::Field;

/// Bounds applied while building a [`QuerySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_page_size: u32,
    pub default_page_size: u32,
    pub search_max_len: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 10,
            search_max_len: 256,
        }
    }
}

/// Validated description of one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    page: u32,
    page_size: u32,
    sort: SortOrder,
    filter: RecordFilter,
    echo: Option<u64>,
}

impl QuerySpec {
    pub fn builder(limits: QueryLimits) -> QuerySpecBuilder {
        QuerySpecBuilder::new(limits)
    }

    /// Validate raw listing parameters.
    pub fn parse(raw: &RawListingParams, limits: QueryLimits) -> Result<Self, ValidationError> {
        let mut builder = Self::builder(limits);

        if let Some(draw) = raw.get("draw") {
            let draw = draw.trim().parse::<u64>().map_err(|_| {
                ValidationError::new("draw", format!("expected a non-negative integer, got {draw:?}"))
            })?;
            builder = builder.echo(draw);
        }

        let page_size = match raw.get("pageSize").or_else(|| raw.get("length")) {
            Some(value) => parse_positive("pageSize", value)?,
            None => limits.default_page_size,
        };
        builder = builder.page_size(page_size);

        if let Some(page) = raw.get("page") {
            builder = builder.page(parse_positive("page", page)?);
        } else if let Some(start) = raw.get("start") {
            let start = start.trim().parse::<u64>().map_err(|_| {
                ValidationError::new("start", format!("expected a non-negative integer, got {start:?}"))
            })?;
            if start % u64::from(page_size) != 0 {
                return Err(ValidationError::new(
                    "start",
                    format!("offset {start} is not a multiple of the page size {page_size}"),
                ));
            }
            let page = u32::try_from(start / u64::from(page_size) + 1)
                .map_err(|_| ValidationError::new("start", format!("offset {start} is too large")))?;
            builder = builder.page(page);
        }

        if let Some(term) = raw.get("search[value]").or_else(|| raw.get("search")) {
            builder = builder.search(term);
        }

        let columns = raw.columns();

        let sort_field = match raw.get("order[0][column]") {
            Some(index) => {
                let index = index.trim().parse::<usize>().map_err(|_| {
                    ValidationError::new("sort", format!("expected a column index, got {index:?}"))
                })?;
                let data = columns
                    .get(&index)
                    .and_then(|column| column.data)
                    .ok_or_else(|| {
                        ValidationError::new("sort", format!("column {index} is not declared"))
                    })?;
                Some(data)
            }
            None => raw.get("sort"),
        };
        if let Some(name) = sort_field {
            builder = builder.sort_field(parse_field("sort", name)?);
        }

        if let Some(dir) = raw.get("order[0][dir]").or_else(|| raw.get("dir")) {
            builder = builder.sort_direction(dir.parse()?);
        }

        for column in columns.values() {
            let Some(value) = column.search.filter(|v| !v.is_empty()) else {
                continue;
            };
            let name = column.data.ok_or_else(|| {
                ValidationError::new("filter", "column search without a data name")
            })?;
            let field = parse_field("filter", name)?;
            builder = builder.filter(field, FilterValue::parse(field, value)?);
        }

        for (name, value) in raw.prefixed("filter[") {
            if value.is_empty() {
                continue;
            }
            let field = parse_field("filter", name)?;
            builder = builder.filter(field, FilterValue::parse(field, value)?);
        }

        builder.build()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn echo(&self) -> Option<u64> {
        self.echo
    }

    /// Rows to skip and take for this page.
    pub fn window(&self) -> Window {
        let offset = u64::from(self.page - 1) * u64::from(self.page_size);
        Window::new(offset, u64::from(self.page_size))
    }
}

/// Typed construction of a [`QuerySpec`]; `build` enforces the limits.
#[derive(Debug, Clone)]
pub struct QuerySpecBuilder {
    limits: QueryLimits,
    page: u32,
    page_size: Option<u32>,
    search: Option<String>,
    sort_field: Field,
    sort_direction: SortDirection,
    filters: BTreeMap<Field, FilterValue>,
    echo: Option<u64>,
}

impl QuerySpecBuilder {
    fn new(limits: QueryLimits) -> Self {
        Self {
            limits,
            page: 1,
            page_size: None,
            search: None,
            sort_field: SortOrder::default().field,
            sort_direction: SortDirection::default(),
            filters: BTreeMap::new(),
            echo: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the search term. Empty terms clear the search; terms longer than
    /// the configured cap are truncated on a character boundary.
    pub fn search(mut self, term: &str) -> Self {
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.chars().take(self.limits.search_max_len).collect())
        };
        self
    }

    pub fn sort_field(mut self, field: Field) -> Self {
        self.sort_field = field;
        self
    }

    pub fn sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    /// Add a column filter; a later filter on the same field replaces the earlier one.
    pub fn filter(mut self, field: Field, value: FilterValue) -> Self {
        self.filters.insert(field, value);
        self
    }

    pub fn echo(mut self, echo: u64) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn build(self) -> Result<QuerySpec, ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::new("page", "must be at least 1"));
        }

        let page_size = self.page_size.unwrap_or(self.limits.default_page_size);
        if page_size == 0 {
            return Err(ValidationError::new("pageSize", "must be at least 1"));
        }
        if page_size > self.limits.max_page_size {
            return Err(ValidationError::new(
                "pageSize",
                format!("must not exceed {}", self.limits.max_page_size),
            ));
        }

        let columns = self
            .filters
            .into_iter()
            .map(|(field, value)| ColumnFilter { field, value })
            .collect();

        Ok(QuerySpec {
            page: self.page,
            page_size,
            sort: SortOrder::new(self.sort_field, self.sort_direction),
            filter: RecordFilter::new(self.search, columns),
            echo: self.echo,
        })
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => u32::try_from(value)
            .map_err(|_| ValidationError::new(field, format!("{value} is too large"))),
        Ok(value) => Err(ValidationError::new(
            field,
            format!("must be at least 1, got {value}"),
        )),
        Err(_) => Err(ValidationError::new(
            field,
            format!("expected an integer, got {raw:?}"),
        )),
    }
}

fn parse_field(param: &'static str, name: &str) -> Result<Field, ValidationError> {
    name.parse::<Field>()
        .map_err(|err| ValidationError::new(param, err.to_string()))
}

/// Raw listing parameters as received; later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListingParams {
    params: HashMap<String, String>,
}

/// The `columns[i][...]` entries of one declared column.
#[derive(Debug, Clone, Copy, Default)]
struct ColumnParams<'a> {
    data: Option<&'a str>,
    search: Option<&'a str>,
}

impl RawListingParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// `(name, value)` for every `<prefix><name>]` key.
    fn prefixed<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let mut entries: Vec<_> = self
            .params
            .iter()
            .filter_map(move |(key, value)| {
                let name = key.strip_prefix(prefix)?.strip_suffix(']')?;
                Some((name, value.as_str()))
            })
            .collect();
        // HashMap order is arbitrary; keep error reporting stable.
        entries.sort_unstable();
        entries.into_iter()
    }

    /// Collect the `columns[i][data]` / `columns[i][search][value]` entries by index.
    fn columns(&self) -> BTreeMap<usize, ColumnParams<'_>> {
        let mut columns: BTreeMap<usize, ColumnParams<'_>> = BTreeMap::new();
        for (key, value) in &self.params {
            let Some(rest) = key.strip_prefix("columns[") else {
                continue;
            };
            let Some((index, attr)) = rest.split_once(']') else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };
            match attr {
                "[data]" => columns.entry(index).or_default().data = Some(value.as_str()),
                "[search][value]" => {
                    columns.entry(index).or_default().search = Some(value.as_str());
                }
                _ => {}
            }
        }
        columns
    }
}
