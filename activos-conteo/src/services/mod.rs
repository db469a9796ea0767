//! Count-plan services
//!
//! `distribution` and the helpers of `aggregator` are pure; the other
//! services own a pool handle and run each mutation in one transaction.

pub mod aggregator;
pub mod distribution;
pub mod ledger;
pub mod lifecycle;
pub mod plan_manager;

pub use ledger::CountLedger;
pub use lifecycle::LifecycleController;
pub use plan_manager::PlanManager;
