//! Database schema, migrations and asset registry

pub mod init;
pub mod migrations;
pub mod models;
pub mod registry;

pub use init::*;
pub use migrations::*;
pub use models::*;
