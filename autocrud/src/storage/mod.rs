//! Storage capability consumed by the repository and the generated routes.
//!
//! Drivers work on JSON rows keyed by column name and receive the table
//! identity at runtime through [`TableRef`]. A missing row is never an error
//! at this level: lookups return `Ok(None)` and writes report the number of
//! affected rows, leaving the `NotFound` decision to the caller.

mod memory;
mod sql;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::context::Context;
use crate::metadata::{EntityDescriptor, FieldDescriptor, KeyKind};

pub use self::memory::MemoryDriver;
pub use self::sql::SeaOrmDriver;

/// A row keyed by storage column name.
pub type Row = Map<String, Value>;

/// Table identity resolved from an entity descriptor.
#[derive(Debug, Clone, Copy)]
pub struct TableRef<'a> {
    pub name: &'a str,
    /// Primary key column, if the entity declares one.
    pub primary_key: Option<&'a str>,
    pub key_kind: KeyKind,
    /// Declared fields, used to type bound column values. Empty for ad-hoc tables.
    pub fields: &'a [FieldDescriptor],
}

impl<'a> TableRef<'a> {
    /// A table known only by name and key.
    #[must_use]
    pub const fn new(name: &'a str, primary_key: Option<&'a str>, key_kind: KeyKind) -> Self {
        Self {
            name,
            primary_key,
            key_kind,
            fields: &[],
        }
    }

    #[must_use]
    pub fn for_entity(descriptor: &'a EntityDescriptor) -> Self {
        let pk = descriptor.primary_key();
        Self {
            name: descriptor.table_name(),
            primary_key: pk.map(|f| f.column.as_str()),
            key_kind: pk.map_or(KeyKind::Integer, |f| f.key_kind()),
            fields: descriptor.fields(),
        }
    }

    /// Key kind of a column: the table key, or a declared field stored there.
    #[must_use]
    pub fn column_kind(&self, column: &str) -> Option<KeyKind> {
        if self.primary_key == Some(column) {
            return Some(self.key_kind);
        }
        self.fields
            .iter()
            .find(|field| field.column == column)
            .map(FieldDescriptor::key_kind)
    }

    /// The primary key column.
    ///
    /// # Errors
    ///
    /// [`StorageError::MissingKey`] when the table has no primary key.
    pub fn key_column(&self) -> Result<&'a str, StorageError> {
        self.primary_key.ok_or_else(|| StorageError::MissingKey {
            table: self.name.to_string(),
        })
    }
}

/// Primary key value used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    Int(i64),
    Uuid(Uuid),
    Text(String),
}

impl EntityId {
    /// Parses a URL path segment according to the key kind.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the segment is not a valid key.
    pub fn parse(raw: &str, kind: KeyKind) -> Result<Self, String> {
        match kind {
            KeyKind::Integer => i64::from_str(raw)
                .map(Self::Int)
                .map_err(|_| format!("'{raw}' is not a valid integer id")),
            KeyKind::Uuid => Uuid::parse_str(raw)
                .map(Self::Uuid)
                .map_err(|_| format!("'{raw}' is not a valid UUID")),
            KeyKind::Text if raw.is_empty() => Err("id must not be empty".to_string()),
            KeyKind::Text => Ok(Self::Text(raw.to_string())),
        }
    }

    /// Reads a key out of a stored JSON value.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(
                Uuid::parse_str(s)
                    .map(Self::Uuid)
                    .unwrap_or_else(|_| Self::Text(s.clone())),
            ),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Uuid(u) => Value::String(u.to_string()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Failures reported by storage drivers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("table `{table}` has no primary key")]
    MissingKey { table: String },
    #[error("duplicate key {key} in table `{table}`")]
    DuplicateKey { table: String, key: String },
    #[error("invalid row for table `{table}`: {reason}")]
    InvalidRow { table: String, reason: String },
    #[error("failed to build query: {0}")]
    Query(String),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

/// Storage capability. Implementations must honor the caller's [`Context`].
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Inserts `row`, generating the primary key when it is absent, and
    /// returns the stored row.
    async fn insert(&self, ctx: &Context, table: TableRef<'_>, row: Row)
    -> Result<Row, StorageError>;

    async fn find_by_id(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<Option<Row>, StorageError>;

    async fn find_all(&self, ctx: &Context, table: TableRef<'_>) -> Result<Vec<Row>, StorageError>;

    /// Replaces the row with key `id`; returns the number of affected rows.
    async fn update(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
        row: Row,
    ) -> Result<u64, StorageError>;

    /// Removes the row with key `id`; returns the number of affected rows.
    async fn delete(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<u64, StorageError>;

    async fn count(&self, ctx: &Context, table: TableRef<'_>) -> Result<u64, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_by_kind() {
        assert_eq!(EntityId::parse("42", KeyKind::Integer), Ok(EntityId::Int(42)));
        assert!(EntityId::parse("abc", KeyKind::Integer).is_err());
        let uuid = Uuid::new_v4();
        assert_eq!(
            EntityId::parse(&uuid.to_string(), KeyKind::Uuid),
            Ok(EntityId::Uuid(uuid))
        );
        assert!(EntityId::parse("42", KeyKind::Uuid).is_err());
        assert_eq!(
            EntityId::parse("sku-1", KeyKind::Text),
            Ok(EntityId::Text("sku-1".into()))
        );
        assert!(EntityId::parse("", KeyKind::Text).is_err());
    }

    #[test]
    fn test_json_conversion() {
        let id = EntityId::from_json(&Value::from(9)).unwrap();
        assert_eq!(id, EntityId::Int(9));
        assert_eq!(id.to_json(), Value::from(9));
        assert_eq!(EntityId::from_json(&Value::Null), None);
        assert_eq!(
            EntityId::from_json(&Value::from("sku-1")),
            Some(EntityId::Text("sku-1".into()))
        );
    }
}
