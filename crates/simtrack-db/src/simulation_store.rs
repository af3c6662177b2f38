//! Simulation lifecycle persistence.
//!
//! Simulations are created `pending` with `created_at = updated_at`,
//! advance only through explicit updates, and cascade-delete their
//! convergence readings. Reads join the owning machine so responses can
//! carry a snapshot of its current attributes.
//!
//! The update path is deliberately permissive: any status value is
//! accepted (including backward or skipping moves) and a new
//! `machine_id` is not checked for existence. Only creation validates
//! the machine reference.

use chrono::{DateTime, Utc};
use simtrack_types::{
    MachineId, MachineSnapshot, Simulation, SimulationDetail, SimulationId, SimulationStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Columns the list endpoint may order by.
///
/// Unrecognized request values silently fall back to
/// [`OrderField::CreatedAt`]; the fallback is a defensive default, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    /// Order by simulation name.
    Name,
    /// Order by creation time.
    CreatedAt,
    /// Order by last-mutation time.
    UpdatedAt,
}

impl OrderField {
    /// Parse a request parameter, falling back to `created_at`.
    pub fn from_param(value: &str) -> Self {
        match value {
            "name" => Self::Name,
            "updated_at" => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }

    /// The column name this field orders by.
    ///
    /// Returned values are a closed set; interpolating them into query
    /// text keeps the SQL parameterizable everywhere user data appears.
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Sort direction for the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// Parse a request parameter; anything other than `"desc"` sorts
    /// ascending.
    pub fn from_param(value: &str) -> Self {
        if value == "desc" { Self::Desc } else { Self::Asc }
    }

    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter, ordering, and pagination for a simulation listing.
#[derive(Debug, Clone, Copy)]
pub struct SimulationListQuery<'q> {
    /// Restrict to one lifecycle status, or list all.
    pub status: Option<&'q str>,
    /// Order-by column.
    pub order_by: OrderField,
    /// Sort direction.
    pub direction: OrderDirection,
    /// Maximum rows to return.
    pub limit: i64,
    /// Rows to skip before the first returned row.
    pub offset: i64,
}

/// Partial update of a simulation. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SimulationPatch {
    /// New name, if provided.
    pub name: Option<String>,
    /// New status, if provided. Not checked against transition rules.
    pub status: Option<SimulationStatus>,
    /// New machine reference, if provided. Not checked for existence.
    pub machine_id: Option<Uuid>,
}

impl SimulationPatch {
    /// True when no field is set; the update still refreshes
    /// `updated_at`.
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.machine_id.is_none()
    }
}

/// Operations on the `simulations` table.
pub struct SimulationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SimulationStore<'a> {
    /// Create a new simulation store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new simulation in the `pending` state.
    ///
    /// Both timestamps are assigned from the same statement clock, so
    /// `updated_at == created_at` until the first mutation. The caller
    /// is responsible for having validated the machine reference.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// foreign-key violation for a vanished machine).
    pub async fn insert(&self, name: &str, machine_id: Uuid) -> Result<SimulationRow, DbError> {
        let row = sqlx::query_as::<_, SimulationRow>(
            r"INSERT INTO simulations (id, name, status, machine_id, created_at, updated_at)
              VALUES ($1, $2, 'pending', $3, now(), now())
              RETURNING id, name, status, machine_id, created_at, updated_at",
        )
        .bind(SimulationId::new().into_inner())
        .bind(name)
        .bind(machine_id)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(simulation_id = %row.id, name = row.name, "Created simulation");
        Ok(row)
    }

    /// Fetch a simulation by ID, without the machine join.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: Uuid) -> Result<Option<SimulationRow>, DbError> {
        let row = sqlx::query_as::<_, SimulationRow>(
            r"SELECT id, name, status, machine_id, created_at, updated_at
              FROM simulations
              WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a simulation joined with its machine's current attributes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_detail(&self, id: Uuid) -> Result<Option<SimulationDetailRow>, DbError> {
        let row = sqlx::query_as::<_, SimulationDetailRow>(
            r"SELECT s.id, s.name, s.status, s.machine_id, s.created_at, s.updated_at,
                     m.name AS machine_name, m.cpu AS machine_cpu, m.gpu AS machine_gpu,
                     m.memory AS machine_memory, m.status AS machine_status
              FROM simulations s
              JOIN machines m ON s.machine_id = m.id
              WHERE s.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// True iff a simulation with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn exists(&self, id: Uuid) -> Result<bool, DbError> {
        let row: (bool,) =
            sqlx::query_as(r"SELECT EXISTS(SELECT 1 FROM simulations WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(row.0)
    }

    /// List simulations joined with machine attributes.
    ///
    /// The `ORDER BY` clause is composed from the closed
    /// [`OrderField`]/[`OrderDirection`] sets; the status filter and
    /// pagination values are bound parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(
        &self,
        query: &SimulationListQuery<'_>,
    ) -> Result<Vec<SimulationDetailRow>, DbError> {
        let sql = format!(
            r"SELECT s.id, s.name, s.status, s.machine_id, s.created_at, s.updated_at,
                     m.name AS machine_name, m.cpu AS machine_cpu, m.gpu AS machine_gpu,
                     m.memory AS machine_memory, m.status AS machine_status
              FROM simulations s
              JOIN machines m ON s.machine_id = m.id
              WHERE ($1::TEXT IS NULL OR s.status = $1)
              ORDER BY s.{column} {direction}
              LIMIT $2 OFFSET $3",
            column = query.order_by.as_sql(),
            direction = query.direction.as_sql(),
        );

        let rows = sqlx::query_as::<_, SimulationDetailRow>(&sql)
            .bind(query.status)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Count simulations matching the status filter, independent of
    /// pagination.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self, status: Option<&str>) -> Result<i64, DbError> {
        let row: (i64,) = sqlx::query_as(
            r"SELECT COUNT(*) FROM simulations WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(row.0)
    }

    /// Apply a partial update, refreshing `updated_at`.
    ///
    /// Returns `None` when the simulation does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails (including a
    /// foreign-key violation when the patched `machine_id` references a
    /// row that never existed).
    pub async fn update(
        &self,
        id: Uuid,
        patch: &SimulationPatch,
    ) -> Result<Option<SimulationRow>, DbError> {
        let row = sqlx::query_as::<_, SimulationRow>(
            r"UPDATE simulations
              SET name = COALESCE($2, name),
                  status = COALESCE($3, status),
                  machine_id = COALESCE($4, machine_id),
                  updated_at = now()
              WHERE id = $1
              RETURNING id, name, status, machine_id, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.status.map(SimulationStatus::as_str))
        .bind(patch.machine_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete a simulation; its convergence readings cascade.
    ///
    /// Returns `false` when the simulation does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM simulations WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(simulation_id = %id, "Deleted simulation");
        }
        Ok(deleted)
    }
}

/// A row from the `simulations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimulationRow {
    /// Simulation UUID.
    pub id: Uuid,
    /// Simulation name.
    pub name: String,
    /// Lifecycle status in its lowercase database form.
    pub status: String,
    /// Owning machine UUID.
    pub machine_id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SimulationRow> for Simulation {
    type Error = DbError;

    fn try_from(row: SimulationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SimulationId::from(row.id),
            name: row.name,
            status: row.status.parse()?,
            machine_id: MachineId::from(row.machine_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A simulation row joined with its machine's attributes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimulationDetailRow {
    /// Simulation UUID.
    pub id: Uuid,
    /// Simulation name.
    pub name: String,
    /// Lifecycle status in its lowercase database form.
    pub status: String,
    /// Owning machine UUID.
    pub machine_id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Machine name at read time.
    pub machine_name: String,
    /// Machine CPU descriptor.
    pub machine_cpu: String,
    /// Machine GPU descriptor.
    pub machine_gpu: String,
    /// Machine memory in gigabytes.
    pub machine_memory: f64,
    /// Machine status at read time.
    pub machine_status: String,
}

impl TryFrom<SimulationDetailRow> for SimulationDetail {
    type Error = DbError;

    fn try_from(row: SimulationDetailRow) -> Result<Self, Self::Error> {
        let machine_id = MachineId::from(row.machine_id);
        Ok(Self {
            id: SimulationId::from(row.id),
            name: row.name,
            status: row.status.parse()?,
            machine_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            machine: MachineSnapshot {
                id: machine_id,
                name: row.machine_name,
                cpu: row.machine_cpu,
                gpu: row.machine_gpu,
                memory: row.machine_memory,
                status: row.machine_status,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_field_recognizes_known_columns() {
        assert_eq!(OrderField::from_param("name"), OrderField::Name);
        assert_eq!(OrderField::from_param("created_at"), OrderField::CreatedAt);
        assert_eq!(OrderField::from_param("updated_at"), OrderField::UpdatedAt);
    }

    #[test]
    fn order_field_falls_back_to_created_at() {
        assert_eq!(OrderField::from_param("loss_value"), OrderField::CreatedAt);
        assert_eq!(OrderField::from_param(""), OrderField::CreatedAt);
        // Case matters: the parameter contract is lowercase.
        assert_eq!(OrderField::from_param("Name"), OrderField::CreatedAt);
    }

    #[test]
    fn order_direction_defaults_to_asc_for_unknown() {
        assert_eq!(OrderDirection::from_param("desc"), OrderDirection::Desc);
        assert_eq!(OrderDirection::from_param("asc"), OrderDirection::Asc);
        assert_eq!(OrderDirection::from_param("sideways"), OrderDirection::Asc);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(SimulationPatch::default().is_empty());
        let patch = SimulationPatch {
            status: Some(SimulationStatus::Running),
            ..SimulationPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn detail_row_converts_to_model() {
        let row = SimulationDetailRow {
            id: Uuid::now_v7(),
            name: String::from("waterflood-01"),
            status: String::from("running"),
            machine_id: Uuid::now_v7(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            machine_name: String::from("gpu-cluster-01"),
            machine_cpu: String::from("AMD EPYC 7742"),
            machine_gpu: String::from("NVIDIA A100"),
            machine_memory: 64.0,
            machine_status: String::from("busy"),
        };
        let detail = SimulationDetail::try_from(row);
        assert!(detail.is_ok());
        let detail = detail.ok();
        assert_eq!(
            detail.as_ref().map(|d| d.status),
            Some(SimulationStatus::Running)
        );
        assert_eq!(
            detail.map(|d| d.machine.name),
            Some(String::from("gpu-cluster-01"))
        );
    }

    #[test]
    fn unknown_status_fails_conversion() {
        let row = SimulationRow {
            id: Uuid::now_v7(),
            name: String::from("bad"),
            status: String::from("archived"),
            machine_id: Uuid::now_v7(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(Simulation::try_from(row).is_err());
    }
}
