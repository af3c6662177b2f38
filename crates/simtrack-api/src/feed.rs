//! Live convergence feed: subscriber registry and per-simulation polling.
//!
//! Each simulation with at least one subscriber gets exactly one polling
//! task. The task re-reads the ledger on a fixed interval and fans new
//! points out to every subscriber through a [`broadcast`] channel, so N
//! subscribers cost one ledger read per interval, not N. When the
//! simulation reaches its terminal state the task emits
//! [`FeedMessage::SimulationFinished`] and tears the feed down; when the
//! last subscriber leaves first, the departing subscriber aborts the
//! task instead. Either way no timer outlives its feed.
//!
//! Registry mutation happens in three places -- subscribe, unsubscribe,
//! and terminal completion -- and all three go through the same
//! [`Mutex`], since a subscriber can disconnect at the same moment its
//! feed completes.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use simtrack_db::{ConvergencePointRow, ConvergenceStore, PostgresPool};
use simtrack_types::{PointId, SimulationId};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Interval between ledger polls for an active feed.
pub const FEED_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Capacity of each feed's broadcast channel.
///
/// A subscriber that falls more than this many messages behind receives
/// a [`broadcast::error::RecvError::Lagged`] and resumes from the newest
/// message.
const FEED_CHANNEL_CAPACITY: usize = 256;

/// One convergence reading as carried by feed messages.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPoint {
    /// Point identifier.
    pub id: PointId,
    /// Store-assigned timestamp (serialized ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// The loss measurement.
    pub loss_value: f64,
}

impl From<ConvergencePointRow> for FeedPoint {
    fn from(row: ConvergencePointRow) -> Self {
        Self {
            id: PointId::from(row.id),
            timestamp: row.timestamp,
            loss_value: row.loss_value,
        }
    }
}

/// A message delivered over a convergence feed.
///
/// Every subscriber first receives `initial_data` with the full history,
/// then zero or more `new_data` batches, and -- if the simulation
/// finishes while the feed is open -- a final `simulation_finished`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Full history at subscribe time.
    InitialData {
        /// The simulation this feed follows.
        simulation_id: SimulationId,
        /// Every point recorded so far, ascending by timestamp.
        data_points: Vec<FeedPoint>,
    },
    /// Points appended since the previous poll.
    NewData {
        /// The simulation this feed follows.
        simulation_id: SimulationId,
        /// Newly appended points, ascending by timestamp.
        data_points: Vec<FeedPoint>,
        /// Whether the simulation has reached its terminal state.
        is_complete: bool,
    },
    /// Terminal message; the feed closes after delivering it.
    SimulationFinished {
        /// The simulation that finished.
        simulation_id: SimulationId,
    },
}

/// The shared fan-out state for one simulation's feed.
struct FeedGroup {
    /// Broadcast sender every subscriber listens on.
    tx: broadcast::Sender<FeedMessage>,
    /// Number of live subscribers.
    subscribers: usize,
    /// The polling task serving this feed.
    poller: JoinHandle<()>,
}

/// Registry of live feeds, keyed by simulation.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct FeedRegistry {
    inner: Arc<Mutex<HashMap<SimulationId, FeedGroup>>>,
}

impl FeedRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a simulation's feed, spawning its polling task if
    /// this is the first subscriber.
    ///
    /// `seed_cursor` is the timestamp of the last point the founding
    /// subscriber already holds from its initial-history read; the poll
    /// loop starts strictly after it so history is not re-broadcast as
    /// `new_data`. Later joiners' cursors are ignored -- the running
    /// loop's cursor already covers everything broadcast so far.
    pub async fn join(
        &self,
        db: &PostgresPool,
        simulation_id: SimulationId,
        seed_cursor: Option<DateTime<Utc>>,
    ) -> broadcast::Receiver<FeedMessage> {
        let mut groups = self.inner.lock().await;
        match groups.entry(simulation_id) {
            Entry::Occupied(mut entry) => {
                let group = entry.get_mut();
                group.subscribers = group.subscribers.saturating_add(1);
                group.tx.subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = broadcast::channel(FEED_CHANNEL_CAPACITY);
                let poller = tokio::spawn(poll_feed(
                    db.clone(),
                    self.clone(),
                    simulation_id,
                    seed_cursor,
                    tx.clone(),
                ));
                entry.insert(FeedGroup {
                    tx,
                    subscribers: 1,
                    poller,
                });
                tracing::debug!(%simulation_id, "Started convergence poll loop");
                rx
            }
        }
    }

    /// Unsubscribe one subscriber. Aborts the polling task and removes
    /// the group when the last subscriber leaves.
    ///
    /// A feed already torn down by terminal completion is a no-op here.
    pub async fn leave(&self, simulation_id: SimulationId) {
        let mut groups = self.inner.lock().await;
        let Some(group) = groups.get_mut(&simulation_id) else {
            return;
        };
        group.subscribers = group.subscribers.saturating_sub(1);
        if group.subscribers == 0 {
            if let Some(group) = groups.remove(&simulation_id) {
                group.poller.abort();
                tracing::debug!(%simulation_id, "Last subscriber left, stopped poll loop");
            }
        }
    }

    /// Drop a feed's registry entry. Called by the polling task itself
    /// on terminal completion or poll failure, so the handle inside the
    /// removed group is simply detached, not aborted.
    async fn remove(&self, simulation_id: SimulationId) {
        let mut groups = self.inner.lock().await;
        groups.remove(&simulation_id);
    }

    /// Number of simulations with an active feed.
    pub async fn active_feeds(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Poll loop body for one simulation's feed.
///
/// Sleeps between iterations, reads strictly after the cursor, fans out
/// non-empty batches, and closes the feed when the simulation finishes.
/// Any ledger error terminates only this loop; other simulations' feeds
/// are unaffected.
async fn poll_feed(
    db: PostgresPool,
    registry: FeedRegistry,
    simulation_id: SimulationId,
    mut cursor: Option<DateTime<Utc>>,
    tx: broadcast::Sender<FeedMessage>,
) {
    let sim_uuid = simulation_id.into_inner();
    loop {
        tokio::time::sleep(FEED_POLL_INTERVAL).await;

        let ledger = ConvergenceStore::new(db.pool());
        let batch = match ledger.read_since(sim_uuid, cursor).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(%simulation_id, error = %e, "Convergence poll failed, closing feed");
                break;
            }
        };
        let finished = match ledger.is_finished(sim_uuid).await {
            Ok(finished) => finished,
            Err(e) => {
                tracing::warn!(%simulation_id, error = %e, "Terminal check failed, closing feed");
                break;
            }
        };

        if let Some(last) = batch.last() {
            // Advance with the exact stored timestamp; anything else
            // either redelivers the tail or skips same-tick readings.
            cursor = Some(last.timestamp);
        }
        if !batch.is_empty() {
            let data_points: Vec<FeedPoint> = batch.into_iter().map(FeedPoint::from).collect();
            // send only fails when no receivers remain, and then the
            // last leave() already tears the group down.
            let _ = tx.send(FeedMessage::NewData {
                simulation_id,
                data_points,
                is_complete: finished,
            });
        }

        if finished {
            let _ = tx.send(FeedMessage::SimulationFinished { simulation_id });
            tracing::debug!(%simulation_id, "Simulation finished, closing feed");
            break;
        }
    }
    registry.remove(simulation_id).await;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;

    fn sample_point() -> FeedPoint {
        FeedPoint {
            id: PointId::new(),
            timestamp: Utc::now(),
            loss_value: 0.25,
        }
    }

    #[test]
    fn initial_data_wire_shape() {
        let simulation_id = SimulationId::new();
        let message = FeedMessage::InitialData {
            simulation_id,
            data_points: vec![sample_point()],
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "initial_data");
        assert_eq!(value["simulation_id"], simulation_id.to_string());
        assert_eq!(value["data_points"].as_array().map(Vec::len), Some(1));
        assert!(value.get("is_complete").is_none());
    }

    #[test]
    fn new_data_wire_shape() {
        let message = FeedMessage::NewData {
            simulation_id: SimulationId::new(),
            data_points: vec![sample_point(), sample_point()],
            is_complete: false,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "new_data");
        assert_eq!(value["is_complete"], false);
        let point = &value["data_points"][0];
        assert!(point["id"].is_string());
        assert!(point["timestamp"].is_string());
        assert!(point["loss_value"].is_number());
    }

    #[test]
    fn terminal_wire_shape() {
        let simulation_id = SimulationId::new();
        let message = FeedMessage::SimulationFinished { simulation_id };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "simulation_finished");
        assert_eq!(value["simulation_id"], simulation_id.to_string());
        assert!(value.get("data_points").is_none());
    }

    #[tokio::test]
    async fn registry_starts_empty() {
        let registry = FeedRegistry::new();
        assert_eq!(registry.active_feeds().await, 0);
        // Leaving a feed that never existed is harmless.
        registry.leave(SimulationId::new()).await;
        assert_eq!(registry.active_feeds().await, 0);
    }
}
