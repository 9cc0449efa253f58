//! Repository layer for pair statements.
//!
//! # Responsibility
//! - Keep SQL for both pair tables inside the core persistence boundary.
//! - Expose one method per statement so callers control ordering.
//!
//! # Invariants
//! - Repository methods never begin, commit or roll back transactions.

pub mod pair_repo;
