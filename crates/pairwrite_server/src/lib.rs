#![forbid(unsafe_code)]

//! HTTP surface for pairwrite.
//!
//! # Responsibility
//! - Route insert/edit/delete requests to the transactional pair writer.
//! - Map writer outcomes to status codes and JSON bodies.
//! - Load an optional `.env` file before configuration is read.
//!
//! # Invariants
//! - Handlers never touch SQLite on the async runtime threads.
//! - Every response body carries exactly one of `message` or `error`.

pub mod api;
pub mod env_file;

pub use api::{router, ApiResponse, AppState};
pub use env_file::{load_env_file, load_env_file_from};
