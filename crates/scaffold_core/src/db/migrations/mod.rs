//! Ordered schema steps for the scaffold tables.
//!
//! # Invariants
//! - Steps are listed in ascending `version` order without gaps.
//! - A run applies every pending step in one transaction, so a failing step
//!   leaves the previous version in place.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// `(version, name, sql)` for every known step.
const STEPS: &[(u32, &str, &str)] = &[
    (1, "users", include_str!("0001_users.sql")),
    (2, "shops", include_str!("0002_shops.sql")),
];

/// Schema version produced by the last known step.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _, _)| *version)
}

/// Schema version currently recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the schema up to [`latest_version`].
///
/// # Errors
/// - [`DbError::SchemaTooNew`] when the database is ahead of this build.
/// - [`DbError::Migration`] naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<_> = STEPS
        .iter()
        .filter(|(version, _, _)| *version > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &&(version, name, sql) in &pending {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration {
                version,
                name,
                source,
            })?;
        debug!("event=db_migrate_step module=db status=ok version={version} name={name}");
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={found} to_version={supported}");
    Ok(())
}
