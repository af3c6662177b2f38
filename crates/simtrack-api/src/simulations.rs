//! Simulation lifecycle endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/simulations` | Create a simulation (machine must exist) |
//! | `GET` | `/simulations` | Filtered/ordered/paginated listing |
//! | `GET` | `/simulations/{id}` | Single simulation + machine snapshot |
//! | `PUT` | `/simulations/{id}` | Partial update |
//! | `DELETE` | `/simulations/{id}` | Delete, cascading convergence data |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use simtrack_db::{
    MachineStore, OrderDirection, OrderField, SimulationListQuery, SimulationPatch,
    SimulationStore,
};
use simtrack_types::{Simulation, SimulationDetail, SimulationStatus};
use uuid::Uuid;

use crate::error::{parse_uuid, ApiError};
use crate::state::AppState;

/// Default page size for the listing endpoint.
const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on the page size; larger requests are clamped, keeping
/// reads bounded.
const MAX_PAGE_SIZE: u32 = 1000;

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

/// Body for `POST /simulations`.
#[derive(Debug, Deserialize)]
pub struct CreateSimulationRequest {
    /// Simulation name.
    pub name: String,
    /// Machine to schedule on; must exist.
    pub machine_id: Uuid,
}

/// Body for `PUT /simulations/{id}`. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateSimulationRequest {
    /// New name, if provided.
    pub name: Option<String>,
    /// New status, if provided. Any enum value is accepted; transition
    /// legality is deliberately not checked.
    pub status: Option<SimulationStatus>,
    /// New machine reference, if provided. Not re-validated against the
    /// registry (creation is the only point that checks).
    pub machine_id: Option<Uuid>,
}

/// Query parameters for `GET /simulations`.
#[derive(Debug, Deserialize)]
pub struct ListSimulationsQuery {
    /// Restrict to one lifecycle status.
    pub status: Option<SimulationStatus>,
    /// Order-by column: `name`, `created_at`, or `updated_at`.
    /// Unrecognized values fall back to `created_at`.
    pub order_by: Option<String>,
    /// `asc` or `desc` (default `desc`).
    pub order_direction: Option<String>,
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 100, clamped to 1000).
    pub size: Option<u32>,
}

/// Response body for `GET /simulations`.
#[derive(Debug, Serialize)]
pub struct SimulationListResponse {
    /// The requested page of simulations, each joined with its machine.
    pub simulations: Vec<SimulationDetail>,
    /// Total count matching the filter, independent of pagination.
    pub total: i64,
    /// Echoed page number.
    pub page: u32,
    /// Echoed (clamped) page size.
    pub size: u32,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Create a simulation in the `pending` state.
///
/// Fails with 404 when the machine does not exist; nothing is persisted
/// in that case.
pub async fn create_simulation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSimulationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let machines = MachineStore::new(state.pool());
    if !machines.exists(req.machine_id).await? {
        return Err(ApiError::NotFound(format!("machine {}", req.machine_id)));
    }

    let simulations = SimulationStore::new(state.pool());
    let created = simulations.insert(&req.name, req.machine_id).await?;
    let detail = simulations
        .get_detail(created.id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("simulation {} vanished after create", created.id)))?;

    Ok((
        StatusCode::CREATED,
        Json(SimulationDetail::try_from(detail)?),
    ))
}

/// List simulations with filtering, ordering, and pagination.
pub async fn list_simulations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSimulationsQuery>,
) -> Result<Json<SimulationListResponse>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let size = params
        .size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let order_by = OrderField::from_param(params.order_by.as_deref().unwrap_or("created_at"));
    let direction =
        OrderDirection::from_param(params.order_direction.as_deref().unwrap_or("desc"));
    let status = params.status.map(SimulationStatus::as_str);
    let offset = i64::from(page.saturating_sub(1)).saturating_mul(i64::from(size));

    let simulations = SimulationStore::new(state.pool());
    let rows = simulations
        .list(&SimulationListQuery {
            status,
            order_by,
            direction,
            limit: i64::from(size),
            offset,
        })
        .await?;
    let total = simulations.count(status).await?;

    let page_items = rows
        .into_iter()
        .map(SimulationDetail::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(SimulationListResponse {
        simulations: page_items,
        total,
        page,
        size,
    }))
}

/// Fetch one simulation joined with its machine's current attributes.
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<SimulationDetail>, ApiError> {
    let id = parse_uuid(&id_str)?;

    let simulations = SimulationStore::new(state.pool());
    let row = simulations
        .get_detail(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("simulation {id}")))?;

    Ok(Json(SimulationDetail::try_from(row)?))
}

/// Apply a partial update, refreshing `updated_at`.
pub async fn update_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(req): Json<UpdateSimulationRequest>,
) -> Result<Json<Simulation>, ApiError> {
    let id = parse_uuid(&id_str)?;

    let patch = SimulationPatch {
        name: req.name,
        status: req.status,
        machine_id: req.machine_id,
    };

    let simulations = SimulationStore::new(state.pool());
    let row = simulations
        .update(id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("simulation {id}")))?;

    Ok(Json(Simulation::try_from(row)?))
}

/// Delete a simulation and, by cascade, its convergence readings.
pub async fn delete_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_uuid(&id_str)?;

    let simulations = SimulationStore::new(state.pool());
    if !simulations.delete(id).await? {
        return Err(ApiError::NotFound(format!("simulation {id}")));
    }

    Ok(Json(serde_json::json!({
        "message": "Simulation deleted successfully"
    })))
}
