use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Order, Query, SimpleExpr, Value as SqlValue};
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, FromQueryResult, JsonValue,
    Statement,
};
use serde_json::Value;
use uuid::Uuid;

use super::{EntityId, Row, StorageDriver, StorageError, TableRef};
use crate::context::Context;
use crate::metadata::KeyKind;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Storage driver over a Sea-ORM connection (SQLite, Postgres or MySQL).
///
/// Statements are built with `sea-query` and limited to primary key lookups,
/// full scans and counts. Postgres inserts use `RETURNING *`; the other
/// backends read the row back through the last insert id.
#[derive(Debug, Clone)]
pub struct SeaOrmDriver {
    db: DatabaseConnection,
}

impl SeaOrmDriver {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a connection from a database URL such as `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] when the connection cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        Ok(Self::new(Database::connect(url).await?))
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn db_backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    fn key_expr(&self, table: TableRef<'_>, id: &EntityId) -> Result<SimpleExpr, StorageError> {
        let column = table.key_column()?;
        let value = bind_value(self.db_backend(), Some(table.key_kind), id.to_json());
        Ok(Expr::col(Alias::new(column)).eq(value))
    }

    async fn fetch_one(&self, stmt: Statement) -> Result<Option<Row>, StorageError> {
        JsonValue::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .map(into_row)
            .transpose()
    }

    async fn select_by_id(
        &self,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<Option<Row>, StorageError> {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(Alias::new(table.name))
            .and_where(self.key_expr(table, id)?);
        self.fetch_one(self.db_backend().build(&select)).await
    }
}

/// Binds a JSON value for a column of the given kind.
///
/// UUID columns bind natively on Postgres, including nulls, and as text elsewhere.
fn bind_value(backend: DatabaseBackend, kind: Option<KeyKind>, value: Value) -> SqlValue {
    if kind == Some(KeyKind::Uuid) && backend == DatabaseBackend::Postgres {
        match &value {
            Value::Null => return SqlValue::Uuid(None),
            Value::String(s) => {
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return SqlValue::Uuid(Some(Box::new(uuid)));
                }
            }
            _ => {}
        }
    }
    match value {
        Value::Null => SqlValue::String(None),
        Value::Bool(b) => SqlValue::Bool(Some(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::BigInt(Some(i))
            } else if let Some(u) = n.as_u64() {
                SqlValue::BigUnsigned(Some(u))
            } else {
                SqlValue::Double(n.as_f64())
            }
        }
        Value::String(s) => SqlValue::String(Some(Box::new(s))),
        other => SqlValue::Json(Some(Box::new(other))),
    }
}

fn into_row(value: JsonValue) -> Result<Row, StorageError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::InvalidRow {
            table: String::new(),
            reason: format!("expected an object row, got {other}"),
        }),
    }
}

fn query_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::Query(err.to_string())
}

#[async_trait]
impl StorageDriver for SeaOrmDriver {
    fn backend(&self) -> &'static str {
        match self.db_backend() {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }

    async fn insert(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        mut row: Row,
    ) -> Result<Row, StorageError> {
        ctx.run(async {
            if let Some(column) = table.primary_key {
                if table.key_kind == KeyKind::Uuid && !row.contains_key(column) {
                    row.insert(column.to_string(), Value::String(Uuid::new_v4().to_string()));
                }
            }
            let explicit_key = table
                .primary_key
                .and_then(|column| row.get(column))
                .and_then(EntityId::from_json);
            let submitted = row.clone();

            let mut insert = Query::insert();
            insert.into_table(Alias::new(table.name));
            let mut columns = Vec::with_capacity(row.len());
            let mut values = Vec::with_capacity(row.len());
            for (column, value) in row {
                let kind = table.column_kind(&column);
                values.push(SimpleExpr::Value(bind_value(self.db_backend(), kind, value)));
                columns.push(Alias::new(column));
            }
            if columns.is_empty() {
                insert.or_default_values();
            } else {
                insert.columns(columns);
                insert.values(values).map_err(query_error)?;
            }

            if self.db_backend() == DatabaseBackend::Postgres {
                insert.returning_all();
                return self
                    .fetch_one(self.db_backend().build(&insert))
                    .await?
                    .ok_or_else(|| StorageError::InvalidRow {
                        table: table.name.to_string(),
                        reason: "insert returned no row".to_string(),
                    });
            }

            let result = self.db.execute(self.db_backend().build(&insert)).await?;
            if table.primary_key.is_none() {
                return Ok(submitted);
            }
            let key = match explicit_key {
                Some(key) => key,
                None => EntityId::Int(i64::try_from(result.last_insert_id()).map_err(query_error)?),
            };
            self.select_by_id(table, &key)
                .await?
                .ok_or_else(|| StorageError::InvalidRow {
                    table: table.name.to_string(),
                    reason: format!("inserted row {key} could not be read back"),
                })
        })
        .await?
    }

    async fn find_by_id(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<Option<Row>, StorageError> {
        ctx.run(self.select_by_id(table, id)).await?
    }

    async fn find_all(&self, ctx: &Context, table: TableRef<'_>) -> Result<Vec<Row>, StorageError> {
        ctx.run(async {
            let mut select = Query::select();
            select.column(Asterisk).from(Alias::new(table.name));
            if let Some(column) = table.primary_key {
                select.order_by(Alias::new(column), Order::Asc);
            }
            JsonValue::find_by_statement(self.db_backend().build(&select))
                .all(&self.db)
                .await?
                .into_iter()
                .map(into_row)
                .collect()
        })
        .await?
    }

    async fn update(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
        row: Row,
    ) -> Result<u64, StorageError> {
        ctx.run(async {
            let key_column = table.key_column()?;
            let values: Vec<(Alias, SimpleExpr)> = row
                .into_iter()
                .filter(|(column, _)| column != key_column)
                .map(|(column, value)| {
                    let value = bind_value(self.db_backend(), table.column_kind(&column), value);
                    (Alias::new(column), SimpleExpr::Value(value))
                })
                .collect();

            if values.is_empty() {
                let exists = self.select_by_id(table, id).await?.is_some();
                return Ok(u64::from(exists));
            }

            let mut update = Query::update();
            update
                .table(Alias::new(table.name))
                .values(values)
                .and_where(self.key_expr(table, id)?);
            let result = self.db.execute(self.db_backend().build(&update)).await?;
            Ok(result.rows_affected())
        })
        .await?
    }

    async fn delete(
        &self,
        ctx: &Context,
        table: TableRef<'_>,
        id: &EntityId,
    ) -> Result<u64, StorageError> {
        ctx.run(async {
            let mut delete = Query::delete();
            delete
                .from_table(Alias::new(table.name))
                .and_where(self.key_expr(table, id)?);
            let result = self.db.execute(self.db_backend().build(&delete)).await?;
            Ok(result.rows_affected())
        })
        .await?
    }

    async fn count(&self, ctx: &Context, table: TableRef<'_>) -> Result<u64, StorageError> {
        ctx.run(async {
            let mut select = Query::select();
            select
                .expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
                .from(Alias::new(table.name));
            let row = CountRow::find_by_statement(self.db_backend().build(&select))
                .one(&self.db)
                .await?;
            Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or_default()))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Declaration, Declare, FieldDeclaration, StructDeclaration};
    use crate::registry::Registry;
    use serde_json::json;

    #[allow(dead_code)]
    struct Membership {
        id: i64,
        member_id: Uuid,
        sponsor_id: Option<Uuid>,
        note: String,
    }

    impl Declare for Membership {
        fn declaration() -> Declaration {
            Declaration::Struct(
                StructDeclaration::of::<Self>("Membership")
                    .field(FieldDeclaration::new("id", "i64").tag("pk"))
                    .field(FieldDeclaration::new("member_id", "Uuid"))
                    .field(FieldDeclaration::new("sponsor_id", "Option<Uuid>"))
                    .field(FieldDeclaration::new("note", "String")),
            )
        }
    }

    #[test]
    fn test_uuid_columns_bind_natively_on_postgres() {
        let descriptor = Registry::new().parse::<Membership>().unwrap();
        let table = TableRef::for_entity(&descriptor);
        let member = Uuid::new_v4();
        let text = json!(member.to_string());

        let kind = table.column_kind("member_id");
        assert_eq!(kind, Some(KeyKind::Uuid));
        assert_eq!(
            bind_value(DatabaseBackend::Postgres, kind, text.clone()),
            SqlValue::Uuid(Some(Box::new(member)))
        );
        assert_eq!(
            bind_value(DatabaseBackend::Postgres, table.column_kind("sponsor_id"), Value::Null),
            SqlValue::Uuid(None)
        );
        assert_eq!(
            bind_value(DatabaseBackend::Sqlite, kind, text),
            SqlValue::String(Some(Box::new(member.to_string())))
        );
        assert_eq!(
            bind_value(DatabaseBackend::Postgres, table.column_kind("note"), json!("x")),
            SqlValue::String(Some(Box::new("x".to_string())))
        );
    }

    #[test]
    fn test_structured_values_bind_as_json() {
        let value = json!([{ "price": 2 }]);
        assert_eq!(
            bind_value(DatabaseBackend::Sqlite, None, value.clone()),
            SqlValue::Json(Some(Box::new(value)))
        );
    }
}
