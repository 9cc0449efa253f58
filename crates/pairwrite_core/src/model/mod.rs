//! Domain model for the linked small/large number pair.
//!
//! # Responsibility
//! - Define the values written to both tables as one logical unit.
//! - Keep wire-shape presence checks next to the types they produce.
//!
//! # Invariants
//! - A pair is identified by the generated key of its primary row.
//! - Both halves of a pair are created, updated and deleted together.

pub mod pair;
