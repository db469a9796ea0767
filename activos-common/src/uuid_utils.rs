//! UUID utilities
//!
//! Identifiers are stored as hyphenated TEXT in SQLite.

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a UUID read back from a TEXT column
pub fn parse_stored(column: &str, s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| Error::StoredValue {
        column: column.to_string(),
        value: s.to_string(),
    })
}
