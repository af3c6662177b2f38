//! Axum router construction for the API server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{convergence, handlers, machines, simulations, ws};

/// Build the complete Axum router for the API server.
///
/// The router includes:
/// - `GET /` -- service identity
/// - `GET /health` -- liveness check
/// - machine registry CRUD under `/machines`
/// - simulation lifecycle CRUD under `/simulations`
/// - convergence ledger endpoints under `/convergence`
/// - `GET /ws/convergence/{simulation_id}` -- live convergence feed
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Service identity + liveness
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Machine registry
        .route(
            "/machines",
            get(machines::list_machines).post(machines::create_machine),
        )
        .route("/machines/{id}", get(machines::get_machine))
        .route(
            "/machines/{id}/status",
            patch(machines::update_machine_status),
        )
        // Simulation lifecycle
        .route(
            "/simulations",
            get(simulations::list_simulations).post(simulations::create_simulation),
        )
        .route(
            "/simulations/{id}",
            get(simulations::get_simulation)
                .put(simulations::update_simulation)
                .delete(simulations::delete_simulation),
        )
        // Convergence ledger
        .route(
            "/convergence/data",
            post(convergence::append_convergence_data),
        )
        .route(
            "/convergence/{simulation_id}/data",
            get(convergence::get_convergence_data),
        )
        .route(
            "/convergence/{simulation_id}/graph",
            get(convergence::get_convergence_graph),
        )
        .route(
            "/convergence/{simulation_id}/stream",
            get(convergence::stream_convergence_data),
        )
        // WebSocket feed
        .route("/ws/convergence/{simulation_id}", get(ws::ws_convergence))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
