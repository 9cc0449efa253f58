//! Pair statement contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the six single-table statements a pair write is built from.
//! - Report generated keys and affected row counts back to the writer.
//!
//! # Invariants
//! - Every method issues exactly one SQL statement.
//! - Secondary rows are always addressed by `primary_id`, never by their own id.

use crate::db::DbResult;
use crate::model::pair::PairId;
use rusqlite::{params, Connection};

/// Single-statement operations over the two pair tables.
pub trait PairRepository {
    /// Inserts the primary row and returns its generated key.
    fn insert_primary(&self, field_a: i64, field_b: i64) -> DbResult<PairId>;
    /// Inserts the secondary row linked to `primary_id`.
    fn insert_secondary(&self, primary_id: PairId, field_c: i64, field_d: i64) -> DbResult<()>;
    fn update_primary(&self, id: PairId, field_a: i64, field_b: i64) -> DbResult<usize>;
    fn update_secondary(&self, primary_id: PairId, field_c: i64, field_d: i64)
        -> DbResult<usize>;
    fn delete_primary(&self, id: PairId) -> DbResult<usize>;
    fn delete_secondary(&self, primary_id: PairId) -> DbResult<usize>;
}

/// SQLite-backed pair statements over a borrowed connection.
pub struct SqlitePairRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePairRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PairRepository for SqlitePairRepository<'_> {
    fn insert_primary(&self, field_a: i64, field_b: i64) -> DbResult<PairId> {
        self.conn.execute(
            "INSERT INTO small_numbers (field_a, field_b) VALUES (?1, ?2);",
            params![field_a, field_b],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_secondary(&self, primary_id: PairId, field_c: i64, field_d: i64) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO large_numbers (field_c, field_d, primary_id) VALUES (?1, ?2, ?3);",
            params![field_c, field_d, primary_id],
        )?;
        Ok(())
    }

    fn update_primary(&self, id: PairId, field_a: i64, field_b: i64) -> DbResult<usize> {
        let changed = self.conn.execute(
            "UPDATE small_numbers
             SET field_a = ?1, field_b = ?2
             WHERE id = ?3;",
            params![field_a, field_b, id],
        )?;
        Ok(changed)
    }

    fn update_secondary(
        &self,
        primary_id: PairId,
        field_c: i64,
        field_d: i64,
    ) -> DbResult<usize> {
        let changed = self.conn.execute(
            "UPDATE large_numbers
             SET field_c = ?1, field_d = ?2
             WHERE primary_id = ?3;",
            params![field_c, field_d, primary_id],
        )?;
        Ok(changed)
    }

    fn delete_primary(&self, id: PairId) -> DbResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM small_numbers WHERE id = ?1;", [id])?;
        Ok(changed)
    }

    fn delete_secondary(&self, primary_id: PairId) -> DbResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM large_numbers WHERE primary_id = ?1;", [primary_id])?;
        Ok(changed)
    }
}
