//! Conversions between entities, API payloads and storage rows.
//!
//! Three shapes are involved: the entity's serde form keyed by field name,
//! the storage row keyed by column name, and the API form (the serde form
//! with aggregates filled in and hidden fields removed).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate;
use crate::errors::CrudError;
use crate::metadata::EntityDescriptor;
use crate::storage::Row;

/// A request body that cannot become an entity.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request body is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("request body does not match the entity: {0}")]
    Mismatch(#[source] serde_json::Error),
}

/// Serializes an entity into its field-keyed object.
///
/// # Errors
///
/// [`CrudError::Mapping`] when the entity does not serialize to an object.
pub fn to_row<T: Serialize>(descriptor: &EntityDescriptor, entity: &T) -> Result<Row, CrudError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CrudError::mapping(
            descriptor.name(),
            serde::ser::Error::custom(format!("expected an object, got {other}")),
        )),
        Err(err) => Err(CrudError::mapping(descriptor.name(), err)),
    }
}

/// Deserializes a field-keyed object into an entity.
///
/// # Errors
///
/// [`CrudError::Mapping`] when the object does not match `T`.
pub fn from_row<T: DeserializeOwned>(
    descriptor: &EntityDescriptor,
    row: Row,
) -> Result<T, CrudError> {
    serde_json::from_value(Value::Object(row)).map_err(|err| CrudError::mapping(descriptor.name(), err))
}

/// Field-keyed object to storage row: declared fields only, columns renamed,
/// aggregate fields left out.
#[must_use]
pub fn to_columns(descriptor: &EntityDescriptor, mut row: Row) -> Row {
    descriptor
        .fields()
        .iter()
        .filter(|field| !descriptor.is_aggregate_field(&field.name))
        .filter_map(|field| {
            row.remove(&field.name)
                .map(|value| (field.column.clone(), value))
        })
        .collect()
}

/// Storage row back to a field-keyed object; unknown columns are dropped.
///
/// Structured fields read back as JSON text (SQLite, MySQL) are decoded.
#[must_use]
pub fn from_columns(descriptor: &EntityDescriptor, mut row: Row) -> Row {
    descriptor
        .fields()
        .iter()
        .filter_map(|field| {
            row.remove(&field.column).map(|value| {
                let value = if field.is_structured() {
                    decode_json_text(value)
                } else {
                    value
                };
                (field.name.clone(), value)
            })
        })
        .collect()
}

fn decode_json_text(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded @ (Value::Array(_) | Value::Object(_))) => decoded,
            _ => Value::String(text),
        },
        other => other,
    }
}

/// Whether a key value means "not assigned yet".
#[must_use]
pub fn is_unset_key(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_i64() == Some(0) || n.as_u64() == Some(0),
        Value::String(s) => s.is_empty() || Uuid::parse_str(s).is_ok_and(|u| u.is_nil()),
        _ => false,
    }
}

/// Merges a JSON object body over `base`.
///
/// Read-only and aggregate fields in the body are ignored, so they keep the
/// value they have in `base`.
///
/// # Errors
///
/// [`PayloadError::Malformed`] or [`PayloadError::NotAnObject`].
pub fn merge_payload(
    descriptor: &EntityDescriptor,
    mut base: Row,
    body: &[u8],
) -> Result<Row, PayloadError> {
    let Value::Object(payload) =
        serde_json::from_slice::<Value>(body).map_err(PayloadError::Malformed)?
    else {
        return Err(PayloadError::NotAnObject);
    };

    for (key, value) in payload {
        let ignored = descriptor
            .field(&key)
            .is_some_and(|field| field.is_read_only)
            || descriptor.is_aggregate_field(&key);
        if !ignored {
            base.insert(key, value);
        }
    }
    Ok(base)
}

/// Decodes a request body into an entity, starting from `base`.
///
/// # Errors
///
/// Any [`PayloadError`].
pub fn decode_payload<T: DeserializeOwned>(
    descriptor: &EntityDescriptor,
    base: Row,
    body: &[u8],
) -> Result<T, PayloadError> {
    let merged = merge_payload(descriptor, base, body)?;
    serde_json::from_value(Value::Object(merged)).map_err(PayloadError::Mismatch)
}

/// API form of an entity object: aggregates computed, hidden fields removed.
#[must_use]
pub fn to_api(descriptor: &EntityDescriptor, mut object: Map<String, Value>) -> Value {
    aggregate::apply(descriptor, &mut object);
    for field in descriptor.fields().iter().filter(|f| f.is_hidden) {
        object.remove(&field.name);
    }
    Value::Object(object)
}
