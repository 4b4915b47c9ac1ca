//! Unit of work over a borrowed SQLite connection.
//!
//! # Responsibility
//! - Queue record inserts, updates and deletes until `flush`.
//! - Open the transaction lazily and end it only on `commit`/`rollback`.
//! - Reload records on demand (`refresh`) and expose a `Query` builder.
//!
//! # Invariants
//! - A session never opens or closes the connection it borrows.
//! - Pending changes are applied in registration order.
//! - A failed flush rolls the open transaction back and clears the queue.
//! - Dropping a session with an open transaction rolls it back.

mod query;

pub use query::Query;

use crate::crud::entity::{encode_fields, to_sql_value, Column, Entity, EntityId, FieldMap};
use log::{debug, error, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Persistence-level failure surfaced by sessions and `CrudBase`.
#[derive(Debug)]
pub enum SessionError {
    Sqlite(rusqlite::Error),
    Encode(serde_json::Error),
    MissingPrimaryKey { table: &'static str },
    RecordNotFound { table: &'static str, id: EntityId },
    UnknownColumn { table: &'static str, column: String },
    InvalidData(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Encode(err) => write!(f, "field encoding failed: {err}"),
            Self::MissingPrimaryKey { table } => {
                write!(f, "{table} record has no primary key assigned")
            }
            Self::RecordNotFound { table, id } => write!(f, "{table} record not found: {id}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` on {table}")
            }
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Ticket returned by [`Session::add`] for an insert, resolved after flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u64);

/// What one `flush` wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushSummary {
    inserted: Vec<(PendingId, EntityId)>,
    updated: usize,
    deleted: usize,
}

impl FlushSummary {
    /// Primary key generated for the insert registered under `ticket`.
    pub fn generated_key(&self, ticket: PendingId) -> Option<EntityId> {
        self.inserted
            .iter()
            .find(|(pending, _)| *pending == ticket)
            .map(|(_, id)| *id)
    }

    pub fn inserted(&self) -> usize {
        self.inserted.len()
    }

    pub fn updated(&self) -> usize {
        self.updated
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated == 0 && self.deleted == 0
    }
}

#[derive(Debug)]
enum PendingChange {
    Insert {
        ticket: PendingId,
        table: &'static str,
        columns: &'static [Column],
        primary_key: &'static str,
        fields: FieldMap,
    },
    Update {
        table: &'static str,
        columns: &'static [Column],
        primary_key: &'static str,
        id: EntityId,
        fields: FieldMap,
    },
    Delete {
        table: &'static str,
        primary_key: &'static str,
        id: EntityId,
    },
}

/// Request-scoped unit of work.
///
/// One session serves one logical request; several `CrudBase` instances may
/// share it so their flush-only calls land in the same transaction.
pub struct Session<'conn> {
    conn: &'conn Connection,
    pending: Vec<PendingChange>,
    next_ticket: u64,
    in_transaction: bool,
}

impl<'conn> Session<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            next_ticket: 0,
            in_transaction: false,
        }
    }

    /// Whether this session currently holds an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Number of changes waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Registers `entity` for persistence.
    ///
    /// Records without a primary key are inserted on flush. Records with one
    /// are updated in place from their non-null fields; a null field never
    /// overwrites the stored value. Use [`Session::update_fields`] to write
    /// an explicit set of columns, nulls included.
    pub fn add<E: Entity>(&mut self, entity: &E) -> SessionResult<PendingId> {
        let mut fields = encode_fields(entity)?;
        let id = fields.remove(E::PRIMARY_KEY).and_then(|value| value.as_i64());
        let ticket = PendingId(self.next_ticket);
        self.next_ticket += 1;

        let change = match id {
            Some(id) => {
                fields.retain(|_, value| !value.is_null());
                PendingChange::Update {
                    table: E::TABLE,
                    columns: E::COLUMNS,
                    primary_key: E::PRIMARY_KEY,
                    id,
                    fields,
                }
            }
            None => PendingChange::Insert {
                ticket,
                table: E::TABLE,
                columns: E::COLUMNS,
                primary_key: E::PRIMARY_KEY,
                fields,
            },
        };
        self.pending.push(change);
        Ok(ticket)
    }

    /// Registers a write of exactly `changes` to the `E` record with key `id`.
    ///
    /// Columns absent from `changes` keep their stored value. The primary key
    /// and keys that name no column are skipped.
    pub fn update_fields<E: Entity>(&mut self, id: EntityId, changes: FieldMap) {
        self.pending.push(PendingChange::Update {
            table: E::TABLE,
            columns: E::COLUMNS,
            primary_key: E::PRIMARY_KEY,
            id,
            fields: changes,
        });
    }

    /// Registers `entity` for deletion on the next flush.
    pub fn delete<E: Entity>(&mut self, entity: &E) -> SessionResult<()> {
        let id = crate::crud::entity::primary_key_of(entity)?
            .ok_or(SessionError::MissingPrimaryKey { table: E::TABLE })?;
        self.pending.push(PendingChange::Delete {
            table: E::TABLE,
            primary_key: E::PRIMARY_KEY,
            id,
        });
        Ok(())
    }

    /// Executes pending changes inside the session transaction without
    /// committing it.
    pub fn flush(&mut self) -> SessionResult<FlushSummary> {
        if self.pending.is_empty() {
            return Ok(FlushSummary::default());
        }

        self.begin()?;
        let pending = std::mem::take(&mut self.pending);
        let mut summary = FlushSummary::default();
        for change in &pending {
            if let Err(err) = self.apply(change, &mut summary) {
                error!("event=session_flush module=session status=error error={err}");
                self.rollback()?;
                return Err(err);
            }
        }

        debug!(
            "event=session_flush module=session status=ok inserted={} updated={} deleted={}",
            summary.inserted(),
            summary.updated(),
            summary.deleted()
        );
        Ok(summary)
    }

    /// Flushes and makes all changes durable.
    pub fn commit(&mut self) -> SessionResult<()> {
        self.flush()?;
        if self.in_transaction {
            self.conn.execute_batch("COMMIT;")?;
            self.in_transaction = false;
            debug!("event=session_commit module=session status=ok");
        }
        Ok(())
    }

    /// Discards pending changes and undoes everything flushed since the
    /// transaction began.
    pub fn rollback(&mut self) -> SessionResult<()> {
        self.pending.clear();
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.execute_batch("ROLLBACK;")?;
            debug!("event=session_rollback module=session status=ok");
        }
        Ok(())
    }

    /// Reloads `entity` from storage, picking up column defaults.
    pub fn refresh<E: Entity>(&mut self, entity: &mut E) -> SessionResult<()> {
        let id = crate::crud::entity::primary_key_of(entity)?
            .ok_or(SessionError::MissingPrimaryKey { table: E::TABLE })?;
        *entity = self
            .query::<E>()
            .get(id)?
            .ok_or(SessionError::RecordNotFound { table: E::TABLE, id })?;
        Ok(())
    }

    /// Starts a query over `E`. Pending changes are flushed before it runs.
    pub fn query<E: Entity>(&mut self) -> Query<'_, 'conn, E> {
        Query::new(self)
    }

    pub(crate) fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn begin(&mut self) -> SessionResult<()> {
        if !self.in_transaction && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN;")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn apply(&self, change: &PendingChange, summary: &mut FlushSummary) -> SessionResult<()> {
        match change {
            PendingChange::Insert {
                ticket,
                table,
                columns,
                primary_key,
                fields,
            } => {
                // Nulls are left out so column defaults apply.
                let mut names = Vec::new();
                let mut values = Vec::new();
                for column in columns.iter().filter(|column| column.name != *primary_key) {
                    if let Some(value) = fields.get(column.name).filter(|value| !value.is_null()) {
                        names.push(column.name);
                        values.push(to_sql_value(table, column, value)?);
                    }
                }

                let sql = if names.is_empty() {
                    format!("INSERT INTO {table} DEFAULT VALUES;")
                } else {
                    format!(
                        "INSERT INTO {table} ({}) VALUES ({});",
                        names.join(", "),
                        placeholders(names.len())
                    )
                };
                self.conn.execute(&sql, params_from_iter(values))?;
                summary
                    .inserted
                    .push((*ticket, self.conn.last_insert_rowid()));
            }
            PendingChange::Update {
                table,
                columns,
                primary_key,
                id,
                fields,
            } => {
                let mut assignments = Vec::new();
                let mut values = Vec::new();
                for column in columns.iter().filter(|column| column.name != *primary_key) {
                    if let Some(value) = fields.get(column.name) {
                        values.push(to_sql_value(table, column, value)?);
                        assignments.push(format!("{} = ?{}", column.name, values.len()));
                    }
                }
                if assignments.is_empty() {
                    return Ok(());
                }

                values.push(SqlValue::Integer(*id));
                let sql = format!(
                    "UPDATE {table} SET {} WHERE {primary_key} = ?{};",
                    assignments.join(", "),
                    values.len()
                );
                let changed = self.conn.execute(&sql, params_from_iter(values))?;
                if changed == 0 {
                    return Err(SessionError::RecordNotFound { table: *table, id: *id });
                }
                summary.updated += 1;
            }
            PendingChange::Delete {
                table,
                primary_key,
                id,
            } => {
                let changed = self
                    .conn
                    .execute(&format!("DELETE FROM {table} WHERE {primary_key} = ?1;"), [id])?;
                if changed == 0 {
                    return Err(SessionError::RecordNotFound { table: *table, id: *id });
                }
                summary.deleted += 1;
            }
        }
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!(
                "event=session_drop module=session status=rollback pending={}",
                self.pending.len()
            );
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                error!("event=session_drop module=session status=error error={err}");
            }
        }
    }
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}
