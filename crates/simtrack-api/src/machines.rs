//! Machine registry endpoints.
//!
//! The registry is plain CRUD: the scheduling core only consumes it for
//! existence checks and attribute snapshots. A machine's status is
//! free-form and never blocks scheduling.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/machines` | Register a machine |
//! | `GET` | `/machines` | List all machines |
//! | `GET` | `/machines/{id}` | Single machine |
//! | `PATCH` | `/machines/{id}/status` | Update status |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use simtrack_db::{MachineStore, NewMachine};
use simtrack_types::Machine;

use crate::error::{parse_uuid, ApiError};
use crate::state::AppState;

/// Body for `POST /machines`.
#[derive(Debug, Deserialize)]
pub struct CreateMachineRequest {
    /// Unique machine name.
    pub name: String,
    /// CPU descriptor.
    pub cpu: String,
    /// GPU descriptor (`"None"` for CPU-only machines).
    pub gpu: String,
    /// Memory size in gigabytes.
    pub memory: f64,
    /// Initial status; defaults to `available`.
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    String::from("available")
}

/// Query parameters for `PATCH /machines/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusQuery {
    /// The new status value (free-form).
    pub status: String,
}

/// Register a new machine.
pub async fn create_machine(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMachineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let machines = MachineStore::new(state.pool());
    let row = machines
        .insert(&NewMachine {
            name: req.name,
            cpu: req.cpu,
            gpu: req.gpu,
            memory: req.memory,
            status: req.status,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Machine::from(row))))
}

/// List all registered machines.
pub async fn list_machines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Machine>>, ApiError> {
    let machines = MachineStore::new(state.pool());
    let rows = machines.list().await?;
    Ok(Json(rows.into_iter().map(Machine::from).collect()))
}

/// Fetch one machine by ID.
pub async fn get_machine(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Machine>, ApiError> {
    let id = parse_uuid(&id_str)?;

    let machines = MachineStore::new(state.pool());
    let row = machines
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("machine {id}")))?;

    Ok(Json(Machine::from(row)))
}

/// Update a machine's status.
pub async fn update_machine_status(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Query(params): Query<UpdateStatusQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_uuid(&id_str)?;

    let machines = MachineStore::new(state.pool());
    machines
        .update_status(id, &params.status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("machine {id}")))?;

    Ok(Json(serde_json::json!({
        "message": format!("Machine {id} status updated to {}", params.status)
    })))
}
