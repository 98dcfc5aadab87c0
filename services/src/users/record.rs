//! The user record served by the listing and its declared column set.
//!
//! `Field` is the single whitelist the rest of the crate consults: a column
//! name that does not parse into a `Field` can never reach a sort, a filter
//! or a SQL statement.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

/// A user as listed by the data table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable unique identifier; the final tie-breaker of every ordering.
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            created_at,
        }
    }

    /// Borrow the value stored under `field`.
    ///
    /// Timestamps are truncated to microseconds, the precision PostgreSQL
    /// stores, so in-process comparisons agree with the pushed-down ones.
    pub fn get(&self, field: Field) -> FieldRef<'_> {
        match field {
            Field::Id => FieldRef::Integer(self.id),
            Field::Name => FieldRef::Text(&self.name),
            Field::Email => FieldRef::Text(&self.email),
            Field::Role => FieldRef::Role(self.role),
            Field::CreatedAt => FieldRef::Timestamp(self.created_at.trunc_subsecs(6)),
        }
    }
}

/// Access level of a user.
///
/// Roles order by their name, the same order PostgreSQL produces for the
/// `role` text column under the `C` collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// How a field's values are compared and parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Role,
    Timestamp,
}

/// A declared column of `UserRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Id,
    Name,
    Email,
    Role,
    CreatedAt,
}

impl Field {
    pub const ALL: [Self; 5] = [
        Self::Id,
        Self::Name,
        Self::Email,
        Self::Role,
        Self::CreatedAt,
    ];

    /// Fields matched by the free-text search.
    pub const SEARCHABLE: [Self; 2] = [Self::Name, Self::Email];

    /// Wire name of the field, also its column name in the `users` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Role => "role",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Id => FieldKind::Integer,
            Self::Name | Self::Email => FieldKind::Text,
            Self::Role => FieldKind::Role,
            Self::CreatedAt => FieldKind::Timestamp,
        }
    }

    /// Range filters (`from..to`) are only meaningful for ordered numeric kinds.
    pub fn supports_range(self) -> bool {
        matches!(self.kind(), FieldKind::Integer | FieldKind::Timestamp)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}

/// A borrowed field value.
///
/// Ordering is only meaningful between values of the same field; text
/// compares byte-wise, which makes it case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldRef<'a> {
    Integer(i64),
    Text(&'a str),
    Role(Role),
    Timestamp(DateTime<Utc>),
}

/// An owned field value, as parsed from a filter parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Role(Role),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_field_ref(&self) -> FieldRef<'_> {
        match self {
            Self::Integer(v) => FieldRef::Integer(*v),
            Self::Text(v) => FieldRef::Text(v),
            Self::Role(v) => FieldRef::Role(*v),
            Self::Timestamp(v) => FieldRef::Timestamp(*v),
        }
    }
}
