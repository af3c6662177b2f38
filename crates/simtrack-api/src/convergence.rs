//! Convergence ledger endpoints.
//!
//! The ledger itself does not validate simulation existence on reads, so
//! every handler here checks first and maps an unknown simulation to
//! 404 before touching the ledger.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/convergence/data` | Append a loss reading |
//! | `GET` | `/convergence/{id}/data` | Full ordered history |
//! | `GET` | `/convergence/{id}/graph` | History + `is_complete` |
//! | `GET` | `/convergence/{id}/stream` | One-shot incremental poll |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simtrack_db::{ConvergenceStore, SimulationStore};
use simtrack_types::{ConvergencePoint, SimulationId};
use uuid::Uuid;

use crate::error::{parse_uuid, ApiError};
use crate::state::AppState;

/// Body for `POST /convergence/data`.
#[derive(Debug, Deserialize)]
pub struct AppendConvergenceRequest {
    /// The simulation producing the reading.
    pub simulation_id: Uuid,
    /// The loss measurement. Unconstrained sign and range.
    pub loss_value: f64,
}

/// Query parameters for the one-shot stream endpoint.
///
/// `last_timestamp` is the cursor: only points strictly newer are
/// returned. Callers advance it with the last returned point's exact
/// timestamp.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Cursor timestamp (ISO-8601); absent means full history.
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Ordered convergence data plus the completion flag.
///
/// Served by both the graph endpoint (full history) and the stream
/// endpoint (incremental window).
#[derive(Debug, Serialize)]
pub struct ConvergenceSeriesResponse {
    /// The simulation the data belongs to.
    pub simulation_id: SimulationId,
    /// Points ascending by timestamp.
    pub data_points: Vec<ConvergencePoint>,
    /// Whether the simulation has reached its terminal state.
    pub is_complete: bool,
}

/// Resolve the path ID and 404 unless the simulation exists.
async fn require_simulation(state: &AppState, id_str: &str) -> Result<Uuid, ApiError> {
    let id = parse_uuid(id_str)?;
    let simulations = SimulationStore::new(state.pool());
    if !simulations.exists(id).await? {
        return Err(ApiError::NotFound(format!("simulation {id}")));
    }
    Ok(id)
}

/// Append a loss reading with a store-assigned timestamp.
pub async fn append_convergence_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AppendConvergenceRequest>,
) -> Result<Json<ConvergencePoint>, ApiError> {
    let simulations = SimulationStore::new(state.pool());
    if !simulations.exists(req.simulation_id).await? {
        return Err(ApiError::NotFound(format!(
            "simulation {}",
            req.simulation_id
        )));
    }

    let ledger = ConvergenceStore::new(state.pool());
    let row = ledger.append(req.simulation_id, req.loss_value).await?;

    Ok(Json(ConvergencePoint::from(row)))
}

/// Fetch the full ordered history for a simulation.
pub async fn get_convergence_data(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<ConvergencePoint>>, ApiError> {
    let id = require_simulation(&state, &id_str).await?;

    let ledger = ConvergenceStore::new(state.pool());
    let rows = ledger.read_all(id).await?;

    Ok(Json(rows.into_iter().map(ConvergencePoint::from).collect()))
}

/// Fetch the full history plus the completion flag, for graph rendering.
pub async fn get_convergence_graph(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<ConvergenceSeriesResponse>, ApiError> {
    let id = require_simulation(&state, &id_str).await?;

    let ledger = ConvergenceStore::new(state.pool());
    let rows = ledger.read_all(id).await?;
    let is_complete = ledger.is_finished(id).await?;

    Ok(Json(ConvergenceSeriesResponse {
        simulation_id: SimulationId::from(id),
        data_points: rows.into_iter().map(ConvergencePoint::from).collect(),
        is_complete,
    }))
}

/// One-shot incremental poll: the HTTP analog of the push feed.
pub async fn stream_convergence_data(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Query(params): Query<StreamQuery>,
) -> Result<Json<ConvergenceSeriesResponse>, ApiError> {
    let id = require_simulation(&state, &id_str).await?;

    let ledger = ConvergenceStore::new(state.pool());
    let rows = ledger.read_since(id, params.last_timestamp).await?;
    let is_complete = ledger.is_finished(id).await?;

    Ok(Json(ConvergenceSeriesResponse {
        simulation_id: SimulationId::from(id),
        data_points: rows.into_iter().map(ConvergencePoint::from).collect(),
        is_complete,
    }))
}
