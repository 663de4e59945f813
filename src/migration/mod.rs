//! Migration Module
//!
//! Plans how to move from one snapshot to the next:
//! - Step templates per change kind, with forward and inverse operations
//! - Priority ordering for review
//! - Rollback plan generation

pub mod planner;
pub mod types;

pub use planner::{MigrationPlanner, STEP_DURATION_MINUTES};
pub use types::{MigrationPlan, Operation, Priority, Step};
