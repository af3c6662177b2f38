//! Machine registry persistence.
//!
//! Machines are referenced by simulations but never owned by them: a
//! machine outlives every simulation scheduled on it, and there is no
//! cascade in either direction. The store exposes the existence check the
//! simulation lifecycle needs at creation time, plus plain registry CRUD.

use chrono::{DateTime, Utc};
use simtrack_types::{Machine, MachineId, MachineSnapshot};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Attributes for registering a new machine.
#[derive(Debug, Clone)]
pub struct NewMachine {
    /// Unique machine name.
    pub name: String,
    /// CPU descriptor.
    pub cpu: String,
    /// GPU descriptor (`"None"` for CPU-only machines).
    pub gpu: String,
    /// Memory size in gigabytes.
    pub memory: f64,
    /// Initial status (conventionally `available`).
    pub status: String,
}

/// Operations on the `machines` table.
pub struct MachineStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MachineStore<'a> {
    /// Create a new machine store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a new machine with an app-generated ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// unique-name violation).
    pub async fn insert(&self, machine: &NewMachine) -> Result<MachineRow, DbError> {
        let row = sqlx::query_as::<_, MachineRow>(
            r"INSERT INTO machines (id, name, cpu, gpu, memory, status)
              VALUES ($1, $2, $3, $4, $5, $6)
              RETURNING id, name, cpu, gpu, memory, status, created_at",
        )
        .bind(MachineId::new().into_inner())
        .bind(&machine.name)
        .bind(&machine.cpu)
        .bind(&machine.gpu)
        .bind(machine.memory)
        .bind(&machine.status)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(machine_id = %row.id, name = row.name, "Registered machine");
        Ok(row)
    }

    /// List all machines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<MachineRow>, DbError> {
        let rows = sqlx::query_as::<_, MachineRow>(
            r"SELECT id, name, cpu, gpu, memory, status, created_at
              FROM machines
              ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch a machine by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: Uuid) -> Result<Option<MachineRow>, DbError> {
        let row = sqlx::query_as::<_, MachineRow>(
            r"SELECT id, name, cpu, gpu, memory, status, created_at
              FROM machines
              WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a machine by its unique name. Used by seeding to stay
    /// idempotent across restarts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<MachineRow>, DbError> {
        let row = sqlx::query_as::<_, MachineRow>(
            r"SELECT id, name, cpu, gpu, memory, status, created_at
              FROM machines
              WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// True iff a machine with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn exists(&self, id: Uuid) -> Result<bool, DbError> {
        let row: (bool,) =
            sqlx::query_as(r"SELECT EXISTS(SELECT 1 FROM machines WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(row.0)
    }

    /// Update a machine's status. Status values are free-form.
    ///
    /// Returns `None` when the machine does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<Option<MachineRow>, DbError> {
        let row = sqlx::query_as::<_, MachineRow>(
            r"UPDATE machines
              SET status = $2
              WHERE id = $1
              RETURNING id, name, cpu, gpu, memory, status, created_at",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}

/// A row from the `machines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MachineRow {
    /// Machine UUID.
    pub id: Uuid,
    /// Unique machine name.
    pub name: String,
    /// CPU descriptor.
    pub cpu: String,
    /// GPU descriptor.
    pub gpu: String,
    /// Memory size in gigabytes.
    pub memory: f64,
    /// Operational status.
    pub status: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<MachineRow> for Machine {
    fn from(row: MachineRow) -> Self {
        Self {
            id: MachineId::from(row.id),
            name: row.name,
            cpu: row.cpu,
            gpu: row.gpu,
            memory: row.memory,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

impl From<MachineRow> for MachineSnapshot {
    fn from(row: MachineRow) -> Self {
        Self {
            id: MachineId::from(row.id),
            name: row.name,
            cpu: row.cpu,
            gpu: row.gpu,
            memory: row.memory,
            status: row.status,
        }
    }
}
