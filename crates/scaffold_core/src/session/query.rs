//! Query builder bound to a session.

use super::{Session, SessionError, SessionResult};
use crate::crud::entity::{decode_entity, from_sql_value, to_sql_value, Entity, EntityId, FieldMap};
use rusqlite::types::Value as SqlValue;
use rusqlite::params_from_iter;
use serde_json::Value;
use std::marker::PhantomData;

/// Lazily built `SELECT` over one entity table.
///
/// Filters are equality matches joined with `AND`. Without filters the
/// backend's natural order applies; no sort order is promised.
pub struct Query<'s, 'conn, E: Entity> {
    session: &'s mut Session<'conn>,
    filters: Vec<(String, Value)>,
    offset: u64,
    limit: Option<u64>,
    _entity: PhantomData<E>,
}

impl<'s, 'conn, E: Entity> Query<'s, 'conn, E> {
    pub(super) fn new(session: &'s mut Session<'conn>) -> Self {
        Self {
            session,
            filters: Vec::new(),
            offset: 0,
            limit: None,
            _entity: PhantomData,
        }
    }

    /// Adds an equality filter on `column`.
    pub fn filter_by(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Looks one record up by primary key. Missing ids yield `None`.
    pub fn get(self, id: EntityId) -> SessionResult<Option<E>> {
        let mut rows = self
            .filter_by(E::PRIMARY_KEY, id)
            .limit(1)
            .fetch()?;
        Ok(rows.pop())
    }

    pub fn all(self) -> SessionResult<Vec<E>> {
        self.fetch()
    }

    pub fn first(self) -> SessionResult<Option<E>> {
        let mut rows = self.limit(1).fetch()?;
        Ok(rows.pop())
    }

    fn fetch(self) -> SessionResult<Vec<E>> {
        self.session.flush()?;

        let names = E::COLUMNS
            .iter()
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {names} FROM {}", E::TABLE);
        let mut bind_values: Vec<SqlValue> = Vec::new();

        for (index, (name, value)) in self.filters.iter().enumerate() {
            let column = E::column(name).ok_or_else(|| SessionError::UnknownColumn {
                table: E::TABLE,
                column: name.clone(),
            })?;
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            if value.is_null() {
                sql.push_str(&format!("{} IS NULL", column.name));
            } else {
                bind_values.push(to_sql_value(E::TABLE, column, value)?);
                sql.push_str(&format!("{} = ?", column.name));
            }
        }

        match self.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(SqlValue::Integer(clamp_i64(limit)));
            }
            None if self.offset > 0 => sql.push_str(" LIMIT -1"),
            None => {}
        }
        if self.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(SqlValue::Integer(clamp_i64(self.offset)));
        }

        let conn = self.session.connection();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = FieldMap::new();
            for (index, column) in E::COLUMNS.iter().enumerate() {
                let value = from_sql_value(E::TABLE, column, row.get_ref(index)?)?;
                fields.insert(column.name.to_string(), value);
            }
            records.push(decode_entity(fields)?);
        }

        Ok(records)
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
