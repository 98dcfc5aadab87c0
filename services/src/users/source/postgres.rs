//! PostgreSQL record source with the whole query pushed down into SQL.
//!
//! Expects the table:
//!
//! ```sql
//! CREATE TABLE users (
//!     id          BIGINT PRIMARY KEY,
//!     name        TEXT NOT NULL,
//!     email       TEXT NOT NULL,
//!     role        TEXT NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! `created_at` keeps microseconds, the precision [`UserRecord::get`] compares
//! at. Search uses `ILIKE`, whose case folding follows the database's
//! `LC_CTYPE`.
//!
//! Text columns are ordered under `COLLATE "C"` so PostgreSQL sorts them
//! byte-wise, the same way [`SortOrder::compare`] does.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{FetchAll, RecordSource, Selection};
use crate::table::filter::{FilterValue, RecordFilter, SortDirection, SortOrder, Window};
use crate::users::record::{Field, FieldKind, FieldValue, UnknownRole, UserRecord};

const COLUMNS: &str = "id, name, email, role, created_at";
const TOTAL_STATEMENT: &str = "SELECT COUNT(*) FROM users";

#[derive(Debug, thiserror::Error)]
pub enum PgSourceError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("corrupt user row: {0}")]
    Decode(#[from] UnknownRole),
}

#[derive(Clone)]
pub struct PgUserSource {
    pool: PgPool,
}

impl PgUserSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = UnknownRole;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord::new(
            row.id,
            row.name,
            row.email,
            row.role.parse()?,
            row.created_at,
        ))
    }
}

fn decode_rows(rows: Vec<UserRow>) -> Result<Vec<UserRecord>, PgSourceError> {
    rows.into_iter()
        .map(|row| UserRecord::try_from(row).map_err(PgSourceError::from))
        .collect()
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Integer(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
        FieldValue::Role(v) => qb.push_bind(v.as_str()),
        FieldValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filter: &RecordFilter) {
    qb.push(" WHERE TRUE");

    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (");
        for (i, field) in Field::SEARCHABLE.into_iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(field.as_str()).push(" ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\'");
        }
        qb.push(")");
    }

    for column in filter.columns() {
        let name = column.field.as_str();
        match &column.value {
            FilterValue::Equals(value) => {
                qb.push(" AND ").push(name).push(" = ");
                push_value(qb, value);
            }
            FilterValue::Range { from, to } => {
                if let Some(lo) = from {
                    qb.push(" AND ").push(name).push(" >= ");
                    push_value(qb, lo);
                }
                if let Some(hi) = to {
                    qb.push(" AND ").push(name).push(" <= ");
                    push_value(qb, hi);
                }
            }
        }
    }
}

pub(crate) fn count_statement(filter: &RecordFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_where(&mut qb, filter);
    qb
}

pub(crate) fn select_statement(
    filter: &RecordFilter,
    sort: SortOrder,
    window: Window,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM users"));
    push_where(&mut qb, filter);

    qb.push(" ORDER BY ").push(sort.field.as_str());
    if matches!(sort.field.kind(), FieldKind::Text | FieldKind::Role) {
        qb.push(" COLLATE \"C\"");
    }
    qb.push(match sort.direction {
        SortDirection::Asc => " ASC",
        SortDirection::Desc => " DESC",
    });
    if sort.field != Field::Id {
        qb.push(", id ASC");
    }

    qb.push(" LIMIT ");
    qb.push_bind(i64::try_from(window.limit).unwrap_or(i64::MAX));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
    qb
}

impl RecordSource for PgUserSource {
    type Error = PgSourceError;

    async fn count(&self) -> Result<u64, Self::Error> {
        let total: i64 = sqlx::query_scalar(TOTAL_STATEMENT)
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn query(
        &self,
        filter: &RecordFilter,
        sort: SortOrder,
        window: Window,
    ) -> Result<Selection, Self::Error> {
        // Both counts and the page must come from the same snapshot.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(TOTAL_STATEMENT)
            .fetch_one(&mut *tx)
            .await?;
        let filtered: i64 = count_statement(filter)
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await?;
        let rows: Vec<UserRow> = select_statement(filter, sort, window)
            .build_query_as()
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Selection {
            total_count: total.max(0) as u64,
            filtered_count: filtered.max(0) as u64,
            records: decode_rows(rows)?,
        })
    }

    async fn is_connected(&self) -> bool {
        self.ping().await
    }
}

impl FetchAll for PgUserSource {
    type Error = PgSourceError;

    async fn fetch_all(&self) -> Result<Vec<UserRecord>, Self::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM users"))
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn is_connected(&self) -> bool {
        self.ping().await
    }
}
