//! Persistence for plans, monthly assignments and count records
//!
//! Every function takes a `&mut SqliteConnection` so the same query runs on a
//! pooled connection or inside a transaction (`&mut *tx`).

pub mod assignments;
pub mod plans;
pub mod records;

use activos_common::uuid_utils::parse_stored;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::ConteoResult;

pub(crate) fn uuid_col(row: &SqliteRow, column: &str) -> ConteoResult<Uuid> {
    Ok(parse_stored(column, &row.get::<String, _>(column))?)
}

pub(crate) fn opt_uuid_col(row: &SqliteRow, column: &str) -> ConteoResult<Option<Uuid>> {
    row.get::<Option<String>, _>(column)
        .map(|s| parse_stored(column, &s))
        .transpose()
        .map_err(Into::into)
}

/// UNIQUE constraint violation reported by SQLite
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Begin a transaction that holds the SQLite write lock from its first statement
///
/// Every service mutation reads before it writes. Under WAL a deferred
/// transaction cannot upgrade a read snapshot once another writer has
/// committed (SQLITE_BUSY_SNAPSHOT), so writers take the lock up front and
/// queue on the pool's busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
