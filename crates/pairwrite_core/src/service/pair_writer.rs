//! Transactional pair writer.
//!
//! # Responsibility
//! - Run insert, edit and delete as two dependent statements in one
//!   transaction on a connection opened for that call alone.
//! - Map each failing stage to its own `WriteError`.
//!
//! # Invariants
//! - Stages run strictly in order: connect, begin, first statement, second
//!   statement, commit.
//! - The second statement never runs after the first failed.
//! - Any failure after `begin` rolls back before the connection closes.
//! - The connection is released exactly once on every exit path.
//! - A failed rollback is logged; the original error is still returned.

use crate::config::{DbConfig, MissingPairPolicy};
use crate::db::tx::{TxEnd, TxScope};
use crate::db::{connect, DbError};
use crate::model::pair::{PairId, PairValues};
use crate::repo::pair_repo::{PairRepository, SqlitePairRepository};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type WriteResult<T> = Result<T, WriteError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Edit,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    fn data_phrase(self) -> &'static str {
        match self {
            Self::Insert => "inserting data into",
            Self::Edit => "editing data in",
            Self::Delete => "deleting data from",
        }
    }
}

/// Which of the two statements of an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Statement on `small_numbers`.
    Primary,
    /// Statement on `large_numbers`.
    Secondary,
}

impl Step {
    fn table_number(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
        }
    }
}

/// Point in the write chain at which an operation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Begin,
    FirstStatement,
    SecondStatement,
    Commit,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Begin => "begin",
            Self::FirstStatement => "first_statement",
            Self::SecondStatement => "second_statement",
            Self::Commit => "commit",
        }
    }
}

#[derive(Debug)]
pub enum WriteError {
    Connect(DbError),
    Begin(rusqlite::Error),
    Statement {
        operation: Operation,
        step: Step,
        source: DbError,
    },
    Commit(rusqlite::Error),
    /// Only produced under `MissingPairPolicy::NotFound`.
    NotFound { operation: Operation, id: PairId },
}

impl WriteError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Connect(_) => Stage::Connect,
            Self::Begin(_) => Stage::Begin,
            Self::Statement {
                step: Step::Primary,
                ..
            } => Stage::FirstStatement,
            Self::Statement {
                step: Step::Secondary,
                ..
            } => Stage::SecondStatement,
            Self::Commit(_) => Stage::Commit,
            Self::NotFound { .. } => Stage::FirstStatement,
        }
    }

    /// Stage-specific message safe to hand to HTTP clients.
    ///
    /// Database error text stays out of it; it is logged instead.
    pub fn client_message(&self) -> String {
        match self {
            Self::Connect(_) => "failed to open database connection".to_string(),
            Self::Begin(_) => "failed to begin transaction".to_string(),
            Self::Statement {
                operation, step, ..
            } => format!(
                "error while {} table {}",
                operation.data_phrase(),
                step.table_number()
            ),
            Self::Commit(_) => "error while committing transaction".to_string(),
            Self::NotFound { id, .. } => format!("pair {id} not found"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(err) => write!(f, "failed to open database connection: {err}"),
            Self::Begin(err) => write!(f, "failed to begin transaction: {err}"),
            Self::Statement {
                operation,
                step,
                source,
            } => write!(
                f,
                "{} statement on table {} failed: {source}",
                operation.as_str(),
                step.table_number()
            ),
            Self::Commit(err) => write!(f, "failed to commit transaction: {err}"),
            Self::NotFound { operation, id } => {
                write!(f, "{} matched no pair with id {id}", operation.as_str())
            }
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect(err) => Some(err),
            Self::Begin(err) => Some(err),
            Self::Statement { source, .. } => Some(source),
            Self::Commit(err) => Some(err),
            Self::NotFound { .. } => None,
        }
    }
}

/// Affected row counts of an edit or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairChange {
    pub primary_rows: usize,
    pub secondary_rows: usize,
}

/// Writes pairs atomically, one fresh connection per call.
#[derive(Debug, Clone)]
pub struct PairWriter {
    config: DbConfig,
}

impl PairWriter {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Inserts a pair and returns the generated key of its primary row.
    ///
    /// The secondary row's `primary_id` is the key generated by the first
    /// statement of this same transaction.
    pub fn insert(&self, values: &PairValues) -> WriteResult<PairId> {
        self.run(Operation::Insert, |repo| {
            let id = repo
                .insert_primary(values.field_a, values.field_b)
                .map_err(|source| statement_error(Operation::Insert, Step::Primary, source))?;
            debug!("event=pair_write module=writer op=insert step=primary status=ok id={id}");
            repo.insert_secondary(id, values.field_c, values.field_d)
                .map_err(|source| statement_error(Operation::Insert, Step::Secondary, source))?;
            Ok(id)
        })
    }

    /// Replaces both halves of the pair keyed by `id`.
    ///
    /// Matching zero rows is success unless the policy is `NotFound`.
    pub fn edit(&self, id: PairId, values: &PairValues) -> WriteResult<PairChange> {
        let policy = self.config.missing_pair;
        self.run(Operation::Edit, |repo| {
            let primary_rows = repo
                .update_primary(id, values.field_a, values.field_b)
                .map_err(|source| statement_error(Operation::Edit, Step::Primary, source))?;
            ensure_matched(policy, Operation::Edit, id, primary_rows)?;
            let secondary_rows = repo
                .update_secondary(id, values.field_c, values.field_d)
                .map_err(|source| statement_error(Operation::Edit, Step::Secondary, source))?;
            Ok(PairChange {
                primary_rows,
                secondary_rows,
            })
        })
    }

    /// Deletes both halves of the pair keyed by `id`.
    ///
    /// Matching zero rows is success unless the policy is `NotFound`.
    pub fn delete(&self, id: PairId) -> WriteResult<PairChange> {
        let policy = self.config.missing_pair;
        self.run(Operation::Delete, |repo| {
            let primary_rows = repo
                .delete_primary(id)
                .map_err(|source| statement_error(Operation::Delete, Step::Primary, source))?;
            ensure_matched(policy, Operation::Delete, id, primary_rows)?;
            let secondary_rows = repo
                .delete_secondary(id)
                .map_err(|source| statement_error(Operation::Delete, Step::Secondary, source))?;
            Ok(PairChange {
                primary_rows,
                secondary_rows,
            })
        })
    }

    fn run<T, F>(&self, operation: Operation, steps: F) -> WriteResult<T>
    where
        F: FnOnce(&SqlitePairRepository<'_>) -> WriteResult<T>,
    {
        let started_at = Instant::now();
        let conn = connect(&self.config).map_err(WriteError::Connect);
        let result = match conn {
            Ok(conn) => {
                let result = self.run_in_transaction(&conn, operation, steps);
                release(conn, operation);
                result
            }
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => info!(
                "event=pair_write module=writer op={} status=ok duration_ms={}",
                operation.as_str(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=pair_write module=writer op={} status=error stage={} duration_ms={} error={}",
                operation.as_str(),
                err.stage().as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn run_in_transaction<T, F>(
        &self,
        conn: &Connection,
        operation: Operation,
        steps: F,
    ) -> WriteResult<T>
    where
        F: FnOnce(&SqlitePairRepository<'_>) -> WriteResult<T>,
    {
        let mut tx = TxScope::begin(conn, self.config.tx_behavior).map_err(WriteError::Begin)?;
        let outcome = steps(&SqlitePairRepository::new(tx.conn()));
        finish(&mut tx, operation, outcome)
    }
}

/// Commits after successful steps; rolls back after any failure.
///
/// A rollback failure is logged and the original error is returned.
fn finish<T, E>(tx: &mut E, operation: Operation, outcome: WriteResult<T>) -> WriteResult<T>
where
    E: TxEnd,
{
    let outcome =
        outcome.and_then(|value| tx.commit().map(|()| value).map_err(WriteError::Commit));

    if let Err(err) = &outcome {
        match tx.rollback() {
            Ok(()) => info!(
                "event=tx_rollback module=writer op={} status=ok stage={}",
                operation.as_str(),
                err.stage().as_str()
            ),
            Err(rollback_err) => error!(
                "event=tx_rollback module=writer op={} status=error stage={} error={}",
                operation.as_str(),
                err.stage().as_str(),
                rollback_err
            ),
        }
    }
    outcome
}

fn statement_error(operation: Operation, step: Step, source: DbError) -> WriteError {
    WriteError::Statement {
        operation,
        step,
        source,
    }
}

fn ensure_matched(
    policy: MissingPairPolicy,
    operation: Operation,
    id: PairId,
    primary_rows: usize,
) -> WriteResult<()> {
    if primary_rows == 0 && policy == MissingPairPolicy::NotFound {
        return Err(WriteError::NotFound { operation, id });
    }
    Ok(())
}

fn release(conn: Connection, operation: Operation) {
    if let Err((_conn, err)) = conn.close() {
        // The returned handle closes again when dropped here.
        warn!(
            "event=db_close module=writer op={} status=error error={}",
            operation.as_str(),
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{finish, Operation, Stage, Step, WriteError, WriteResult};
    use crate::db::tx::TxEnd;
    use crate::db::DbError;

    /// Transaction end whose commit and rollback can be made to fail.
    #[derive(Default)]
    struct ScriptedEnd {
        fail_commit: bool,
        fail_rollback: bool,
        commits: usize,
        rollbacks: usize,
    }

    impl TxEnd for ScriptedEnd {
        fn commit(&mut self) -> rusqlite::Result<()> {
            self.commits += 1;
            if self.fail_commit {
                return Err(rusqlite::Error::InvalidQuery);
            }
            Ok(())
        }

        fn rollback(&mut self) -> rusqlite::Result<()> {
            self.rollbacks += 1;
            if self.fail_rollback {
                return Err(rusqlite::Error::ExecuteReturnedResults);
            }
            Ok(())
        }
    }

    fn statement(operation: Operation, step: Step) -> WriteError {
        WriteError::Statement {
            operation,
            step,
            source: DbError::Sqlite(rusqlite::Error::InvalidQuery),
        }
    }

    #[test]
    fn client_messages_name_the_failing_stage() {
        assert_eq!(
            statement(Operation::Insert, Step::Primary).client_message(),
            "error while inserting data into table 1"
        );
        assert_eq!(
            statement(Operation::Edit, Step::Secondary).client_message(),
            "error while editing data in table 2"
        );
        assert_eq!(
            statement(Operation::Delete, Step::Secondary).client_message(),
            "error while deleting data from table 2"
        );
        assert_eq!(
            WriteError::Commit(rusqlite::Error::InvalidQuery).client_message(),
            "error while committing transaction"
        );
    }

    #[test]
    fn stage_follows_step() {
        assert_eq!(
            statement(Operation::Edit, Step::Primary).stage(),
            Stage::FirstStatement
        );
        assert_eq!(
            statement(Operation::Edit, Step::Secondary).stage(),
            Stage::SecondStatement
        );
        assert_eq!(
            WriteError::Begin(rusqlite::Error::InvalidQuery).stage(),
            Stage::Begin
        );
        let not_found = WriteError::NotFound {
            operation: Operation::Delete,
            id: 9,
        };
        assert!(not_found.is_not_found());
        assert_eq!(not_found.client_message(), "pair 9 not found");
    }

    #[test]
    fn failed_rollback_keeps_the_statement_error() {
        let mut tx = ScriptedEnd {
            fail_rollback: true,
            ..ScriptedEnd::default()
        };

        let result: WriteResult<()> = finish(
            &mut tx,
            Operation::Edit,
            Err(statement(Operation::Edit, Step::Secondary)),
        );
        let err = result.unwrap_err();

        assert_eq!(err.stage(), Stage::SecondStatement);
        assert_eq!(err.client_message(), "error while editing data in table 2");
        assert_eq!((tx.commits, tx.rollbacks), (0, 1));
    }

    #[test]
    fn failed_rollback_keeps_the_commit_error() {
        let mut tx = ScriptedEnd {
            fail_commit: true,
            fail_rollback: true,
            ..ScriptedEnd::default()
        };

        let err = finish(&mut tx, Operation::Insert, Ok(7)).unwrap_err();

        assert!(matches!(err, WriteError::Commit(rusqlite::Error::InvalidQuery)));
        assert_eq!((tx.commits, tx.rollbacks), (1, 1));
    }

    #[test]
    fn successful_steps_commit_without_rollback() {
        let mut tx = ScriptedEnd::default();
        assert_eq!(finish(&mut tx, Operation::Delete, Ok(3)).unwrap(), 3);
        assert_eq!((tx.commits, tx.rollbacks), (1, 0));
    }
}
