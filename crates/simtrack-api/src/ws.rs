//! `WebSocket` handler for live convergence streaming.
//!
//! Clients connect to `GET /ws/convergence/{simulation_id}` and receive
//! the [`FeedMessage`] protocol: one `initial_data` frame with the full
//! history, `new_data` frames as the poll loop finds fresh points, and a
//! terminal `simulation_finished` frame after which the server closes
//! the feed.
//!
//! The simulation must exist before the upgrade; an unknown ID is
//! rejected with 404 and no feed is established. A client disconnecting
//! only deregisters that client -- the shared poll loop keeps serving
//! any remaining subscribers.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use simtrack_db::{ConvergenceStore, SimulationStore};
use simtrack_types::SimulationId;
use tracing::{debug, warn};

use crate::error::{parse_uuid, ApiError};
use crate::feed::{FeedMessage, FeedPoint};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` convergence feed.
///
/// # Route
///
/// `GET /ws/convergence/{simulation_id}`
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] before the upgrade when the simulation
/// does not exist, and [`ApiError::InvalidUuid`] for a malformed ID.
pub async fn ws_convergence(
    ws: WebSocketUpgrade,
    Path(id_str): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&id_str)?;

    let simulations = SimulationStore::new(state.pool());
    if !simulations.exists(id).await? {
        return Err(ApiError::NotFound(format!("simulation {id}")));
    }

    let simulation_id = SimulationId::from(id);
    Ok(ws.on_upgrade(move |socket| handle_feed(socket, state, simulation_id)))
}

/// Handle one feed subscription: deliver the initial history, register
/// with the shared poll loop, and forward broadcast frames until the
/// feed completes or the client disconnects.
async fn handle_feed(mut socket: WebSocket, state: Arc<AppState>, simulation_id: SimulationId) {
    debug!(%simulation_id, "Feed client connected");

    let ledger = ConvergenceStore::new(state.pool());
    let history = match ledger.read_all(simulation_id.into_inner()).await {
        Ok(history) => history,
        Err(e) => {
            warn!(%simulation_id, error = %e, "Failed to read initial history");
            return;
        }
    };

    // The poll loop picks up strictly after what this initial frame
    // already carries.
    let seed_cursor = history.last().map(|p| p.timestamp);

    let initial = FeedMessage::InitialData {
        simulation_id,
        data_points: history.into_iter().map(FeedPoint::from).collect(),
    };
    if !send_frame(&mut socket, &initial).await {
        debug!(%simulation_id, "Feed client disconnected before activation");
        return;
    }

    let mut rx = state.feeds.join(&state.db, simulation_id, seed_cursor).await;

    loop {
        tokio::select! {
            // A frame from the shared poll loop.
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        let terminal = matches!(message, FeedMessage::SimulationFinished { .. });
                        if !send_frame(&mut socket, &message).await {
                            debug!(%simulation_id, "Feed client disconnected (send failed)");
                            break;
                        }
                        if terminal {
                            debug!(%simulation_id, "Feed completed");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%simulation_id, skipped = n, "Feed client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!(%simulation_id, "Feed channel closed");
                        break;
                    }
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%simulation_id, "Feed client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%simulation_id, "Feed client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%simulation_id, error = %e, "Feed transport error");
                        break;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }

    state.feeds.leave(simulation_id).await;
}

/// Serialize and send one frame. Returns `false` when the transport is
/// gone; a serialization failure skips the frame but keeps the feed.
async fn send_frame(socket: &mut WebSocket, message: &FeedMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize feed message");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
