use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{EntityId, Row, StorageDriver, StorageError, TableRef};
use crate::context::Context;
use crate::metadata::KeyKind;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    last_id: i64,
}

impl Table {
    fn position(&self, column: &str, id: &EntityId) -> Option<usize> {
        let key = id.to_json();
        self.rows.iter().position(|row| row.get(column) == Some(&key))
    }
}

/// In-process storage driver. Rows keep insertion order; integer keys are
/// assigned from a per-table counter and UUID keys are generated.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        mut row: Row,
    ) -> Result<Row, StorageError> {
        ctx.check()?;
        let mut tables = self.tables();
        let state = tables.entry(table.name.to_string()).or_default();

        if let Some(column) = table.primary_key {
            let key = match row.get(column).and_then(EntityId::from_json) {
                Some(id) => {
                    if state.position(column, &id).is_some() {
                        return Err(StorageError::DuplicateKey {
                            table: table.name.to_string(),
                            key: id.to_string(),
                        });
                    }
                    if let EntityId::Int(value) = id {
                        state.last_id = state.last_id.max(value);
                    }
                    id.to_json()
                }
                None => match table.key_kind {
                    KeyKind::Integer => {
                        state.last_id = state.last_id.checked_add(1).ok_or_else(|| {
                            StorageError::InvalidRow {
                                table: table.name.to_string(),
                                reason: "integer key space exhausted".to_string(),
                            }
                        })?;
                        Value::from(state.last_id)
                    }
                    KeyKind::Uuid => Value::String(Uuid::new_v4().to_string()),
                    KeyKind::Text => {
                        return Err(StorageError::InvalidRow {
                            table: table.name.to_string(),
                            reason: format!("missing value for key column `{column}`"),
                        });
                    }
                },
            };
            row.insert(column.to_string(), key);
        }

        state.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<Option<Row>, StorageError> {
        ctx.check()?;
        let column = table.key_column()?;
        let tables = self.tables();
        Ok(tables
            .get(table.name)
            .and_then(|state| state.position(column, id).map(|idx| state.rows[idx].clone())))
    }

    async fn find_all(&self, ctx: &Context, table: TableRef<'_>) -> Result<Vec<Row>, StorageError> {
        ctx.check()?;
        Ok(self
            .tables()
            .get(table.name)
            .map(|state| state.rows.clone())
            .unwrap_or_default())
    }

    async fn update(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
        mut row: Row,
    ) -> Result<u64, StorageError> {
        ctx.check()?;
        let column = table.key_column()?;
        let mut tables = self.tables();
        let Some(state) = tables.get_mut(table.name) else {
            return Ok(0);
        };
        let Some(idx) = state.position(column, id) else {
            return Ok(0);
        };
        row.insert(column.to_string(), id.to_json());
        state.rows[idx] = row;
        Ok(1)
    }

    async fn delete(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<u64, StorageError> {
        ctx.check()?;
        let column = table.key_column()?;
        let mut tables = self.tables();
        let Some(state) = tables.get_mut(table.name) else {
            return Ok(0);
        };
        match state.position(column, id) {
            Some(idx) => {
                state.rows.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count(&self, ctx: &Context, table: TableRef<'_>) -> Result<u64, StorageError> {
        ctx.check()?;
        Ok(self
            .tables()
            .get(table.name)
            .map_or(0, |state| state.rows.len() as u64))
    }
}
