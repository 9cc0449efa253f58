//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository statements into atomic pair writes.
//! - Keep HTTP layers decoupled from storage details.

pub mod pair_writer;
