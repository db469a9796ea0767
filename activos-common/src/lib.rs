//! # Activos Common Library
//!
//! Shared code for the fixed-asset inventory services:
//! - Error type and result alias
//! - Bootstrap configuration (TOML + root folder resolution)
//! - SQLite schema, migrations and the asset registry
//! - Time and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
