//! Convergence ledger persistence.
//!
//! Loss readings form an append-only, timestamp-ordered sequence per
//! simulation. Timestamps are assigned by the database clock at insert
//! time, so they are monotonically non-decreasing in insertion order but
//! not guaranteed strictly increasing under a coarse clock.
//!
//! Reads do not validate that the simulation exists: an unknown ID
//! yields an empty sequence, and callers that want a 404 must check
//! existence themselves before reading.

use chrono::{DateTime, Utc};
use simtrack_types::{ConvergencePoint, PointId, SimulationId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `convergence_points` table.
pub struct ConvergenceStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ConvergenceStore<'a> {
    /// Create a new convergence store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a loss reading with a database-assigned timestamp.
    ///
    /// Concurrent appends for the same simulation are independent
    /// inserts; nothing beyond the store clock orders them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// foreign-key violation for an unknown simulation; callers check
    /// existence first to surface that as a not-found instead).
    pub async fn append(
        &self,
        simulation_id: Uuid,
        loss_value: f64,
    ) -> Result<ConvergencePointRow, DbError> {
        let row = sqlx::query_as::<_, ConvergencePointRow>(
            r"INSERT INTO convergence_points (id, simulation_id, loss_value)
              VALUES ($1, $2, $3)
              RETURNING id, simulation_id, timestamp, loss_value",
        )
        .bind(PointId::new().into_inner())
        .bind(simulation_id)
        .bind(loss_value)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(simulation_id = %simulation_id, loss_value, "Appended convergence point");
        Ok(row)
    }

    /// Read the full history for a simulation, ascending by timestamp.
    ///
    /// An unknown simulation yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn read_all(
        &self,
        simulation_id: Uuid,
    ) -> Result<Vec<ConvergencePointRow>, DbError> {
        self.read_since(simulation_id, None).await
    }

    /// Read points strictly newer than the cursor, ascending by
    /// timestamp. A `None` cursor reads the full history.
    ///
    /// Points whose timestamp equals the cursor are excluded, so callers
    /// must advance the cursor with the last returned point's exact
    /// timestamp: anything else either redelivers the tail or skips
    /// readings that share a coarse clock tick.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn read_since(
        &self,
        simulation_id: Uuid,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<Vec<ConvergencePointRow>, DbError> {
        let rows = sqlx::query_as::<_, ConvergencePointRow>(
            r"SELECT id, simulation_id, timestamp, loss_value
              FROM convergence_points
              WHERE simulation_id = $1
                AND ($2::TIMESTAMPTZ IS NULL OR timestamp > $2)
              ORDER BY timestamp ASC",
        )
        .bind(simulation_id)
        .bind(cursor)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// True iff the owning simulation's status is `finished`.
    ///
    /// Returns `false` for an unknown simulation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn is_finished(&self, simulation_id: Uuid) -> Result<bool, DbError> {
        let row: (bool,) = sqlx::query_as(
            r"SELECT EXISTS(SELECT 1 FROM simulations WHERE id = $1 AND status = 'finished')",
        )
        .bind(simulation_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }
}

/// A row from the `convergence_points` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConvergencePointRow {
    /// Point UUID.
    pub id: Uuid,
    /// Owning simulation UUID.
    pub simulation_id: Uuid,
    /// Database-assigned insertion timestamp.
    pub timestamp: DateTime<Utc>,
    /// The loss measurement.
    pub loss_value: f64,
}

impl From<ConvergencePointRow> for ConvergencePoint {
    fn from(row: ConvergencePointRow) -> Self {
        Self {
            id: PointId::from(row.id),
            simulation_id: SimulationId::from(row.simulation_id),
            timestamp: row.timestamp,
            loss_value: row.loss_value,
        }
    }
}
