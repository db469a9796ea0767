//! HTTP API handlers for activos-conteo

pub mod assignments;
pub mod health;
pub mod plans;
pub mod records;
pub mod registry;
pub mod user;

pub use assignments::assignment_routes;
pub use health::health_routes;
pub use plans::plan_routes;
pub use records::record_routes;
pub use registry::registry_routes;
pub use user::ActingUser;
