//! Core domain logic for pairwrite.
//! This crate owns the pair invariant: both tables change together or not at all.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, DbConfig, MissingPairPolicy, ServerConfig};
pub use db::tx::{parse_tx_behavior, tx_behavior_name, TxEnd, TxScope};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::pair::{PairDraft, PairId, PairValidationError, PairValues};
pub use repo::pair_repo::{PairRepository, SqlitePairRepository};
pub use service::pair_writer::{
    Operation, PairChange, PairWriter, Stage, Step, WriteError, WriteResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
