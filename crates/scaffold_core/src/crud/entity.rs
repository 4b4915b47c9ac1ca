//! Entity descriptors and field encoding.
//!
//! # Responsibility
//! - Describe how a serde-backed record maps onto one SQLite table.
//! - Convert between plain field maps and SQLite storage values.
//!
//! # Invariants
//! - Every entity has exactly one scalar integer primary key column.
//! - Field maps are JSON objects keyed by column name.

use crate::session::{SessionError, SessionResult};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Primary key value for every entity.
pub type EntityId = i64;

/// Plain field-name to value mapping produced by [`encode_fields`].
pub type FieldMap = Map<String, Value>;

/// Storage kind of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    /// Stored as `0`/`1`.
    Bool,
    /// Stored as JSON text.
    Json,
}

/// One mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Type descriptor for a persisted record.
///
/// The serialized field names of the implementing type must match
/// [`Entity::COLUMNS`]. The primary key field should deserialize from `null`
/// so that a record can exist before its first flush.
pub trait Entity: Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [Column];

    fn column(name: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|column| column.name == name)
    }
}

/// Encodes any serializable shape into a field map.
pub fn encode_fields<T: Serialize + ?Sized>(value: &T) -> SessionResult<FieldMap> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(SessionError::InvalidData(format!(
            "expected a field mapping, got `{other}`"
        ))),
    }
}

/// Builds an entity from a field map.
pub fn decode_entity<E: Entity>(fields: FieldMap) -> SessionResult<E> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Reads the primary key of an entity, if it has been assigned.
pub fn primary_key_of<E: Entity>(entity: &E) -> SessionResult<Option<EntityId>> {
    let fields = encode_fields(entity)?;
    Ok(fields.get(E::PRIMARY_KEY).and_then(Value::as_i64))
}

/// Returns `entity` with its primary key replaced by `id`.
pub fn with_primary_key<E: Entity>(entity: E, id: EntityId) -> SessionResult<E> {
    let mut fields = encode_fields(&entity)?;
    fields.insert(E::PRIMARY_KEY.to_string(), Value::from(id));
    decode_entity(fields)
}

pub(crate) fn to_sql_value(
    table: &str,
    column: &Column,
    value: &Value,
) -> SessionResult<SqlValue> {
    let mismatch = || {
        SessionError::InvalidData(format!(
            "value `{value}` does not fit {table}.{} ({:?})",
            column.name, column.kind
        ))
    };

    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    let converted = match column.kind {
        ColumnKind::Integer => SqlValue::Integer(value.as_i64().ok_or_else(mismatch)?),
        ColumnKind::Real => SqlValue::Real(value.as_f64().ok_or_else(mismatch)?),
        ColumnKind::Text => SqlValue::Text(value.as_str().ok_or_else(mismatch)?.to_string()),
        ColumnKind::Bool => match value {
            Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
            Value::Number(number) => match number.as_i64() {
                Some(0) => SqlValue::Integer(0),
                Some(1) => SqlValue::Integer(1),
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        },
        ColumnKind::Json => SqlValue::Text(value.to_string()),
    };
    Ok(converted)
}

pub(crate) fn from_sql_value(
    table: &str,
    column: &Column,
    value: ValueRef<'_>,
) -> SessionResult<Value> {
    let invalid = |message: &str| {
        SessionError::InvalidData(format!("{message} in {table}.{}", column.name))
    };

    match (column.kind, value) {
        (_, ValueRef::Null) => Ok(Value::Null),
        (ColumnKind::Bool, ValueRef::Integer(0)) => Ok(Value::Bool(false)),
        (ColumnKind::Bool, ValueRef::Integer(1)) => Ok(Value::Bool(true)),
        (ColumnKind::Bool, ValueRef::Integer(other)) => {
            Err(invalid(&format!("invalid bool value `{other}`")))
        }
        (_, ValueRef::Integer(number)) => Ok(Value::from(number)),
        (_, ValueRef::Real(number)) => Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| invalid("non-finite real value")),
        (ColumnKind::Json, ValueRef::Text(bytes)) => Ok(serde_json::from_slice(bytes)?),
        (_, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| invalid("non UTF-8 text")),
        (_, ValueRef::Blob(_)) => Err(invalid("unsupported blob value")),
    }
}

#[cfg(test)]
mod tests {
    use super::{from_sql_value, to_sql_value, Column, ColumnKind};
    use rusqlite::types::{Value as SqlValue, ValueRef};
    use serde_json::json;

    #[test]
    fn bool_columns_round_through_integers() {
        let column = Column::new("is_active", ColumnKind::Bool);
        assert_eq!(
            to_sql_value("users", &column, &json!(true)).expect("bool should encode"),
            SqlValue::Integer(1)
        );
        assert_eq!(
            from_sql_value("users", &column, ValueRef::Integer(0)).expect("0 should decode"),
            json!(false)
        );
        assert!(from_sql_value("users", &column, ValueRef::Integer(7)).is_err());
    }

    #[test]
    fn json_columns_are_stored_as_text() {
        let column = Column::new("settings", ColumnKind::Json);
        let stored = to_sql_value("shops", &column, &json!({"theme": "dark"}))
            .expect("json should encode");
        assert_eq!(stored, SqlValue::Text("{\"theme\":\"dark\"}".to_string()));

        let loaded =
            from_sql_value("shops", &column, ValueRef::Text(b"{\"theme\":\"dark\"}"))
                .expect("json text should decode");
        assert_eq!(loaded, json!({"theme": "dark"}));
    }

    #[test]
    fn text_column_rejects_numbers() {
        let column = Column::new("email", ColumnKind::Text);
        let err = to_sql_value("users", &column, &json!(12)).expect_err("number is not text");
        assert!(err.to_string().contains("users.email"));
    }

    #[test]
    fn null_passes_through_every_kind() {
        let column = Column::new("created_at", ColumnKind::Integer);
        assert_eq!(
            to_sql_value("users", &column, &json!(null)).expect("null should encode"),
            SqlValue::Null
        );
        assert_eq!(
            from_sql_value("users", &column, ValueRef::Null).expect("null should decode"),
            json!(null)
        );
    }
}
