//! Errors shared by the registry and the count services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The database folder could not be created
    #[error("Database folder: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML config source that cannot be read or parsed
    #[error("Config {origin}: {reason}")]
    Config { origin: String, reason: String },

    /// Referenced area, subclassification or asset does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty names, duplicate codes, impossible calendar months
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unreadable {column} value '{value}'")]
    StoredValue { column: String, value: String },
}

impl Error {
    /// True when the wrapped database error is a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
