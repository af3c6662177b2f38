//! Entity and read-model structs served by the API.
//!
//! [`Machine`], [`Simulation`], and [`ConvergencePoint`] mirror the
//! persistent entities. [`SimulationDetail`] is the read-time join of a
//! simulation with a [`MachineSnapshot`] of its machine's current
//! attributes; the snapshot is assembled per request, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{MachineId, PointId, SimulationId};
use crate::status::SimulationStatus;

/// A compute resource (CPU/GPU/memory profile) that simulations run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Machine {
    /// Unique machine identifier.
    pub id: MachineId,
    /// Unique human-readable machine name (e.g. `gpu-cluster-01`).
    pub name: String,
    /// CPU descriptor.
    pub cpu: String,
    /// GPU descriptor (`"None"` for CPU-only machines).
    pub gpu: String,
    /// Memory size in gigabytes.
    pub memory: f64,
    /// Operational status. Conventionally `available`, `busy`, or
    /// `maintenance`, but free-form; it is not consulted when a
    /// simulation is scheduled onto the machine.
    pub status: String,
    /// When the machine was registered.
    pub created_at: DateTime<Utc>,
}

/// Machine attributes embedded in simulation responses.
///
/// A read-time projection of [`Machine`] taken at response-assembly time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MachineSnapshot {
    /// Machine identifier.
    pub id: MachineId,
    /// Machine name.
    pub name: String,
    /// CPU descriptor.
    pub cpu: String,
    /// GPU descriptor.
    pub gpu: String,
    /// Memory size in gigabytes.
    pub memory: f64,
    /// Machine status at read time.
    pub status: String,
}

/// A scheduled unit of work bound to one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Simulation {
    /// Unique simulation identifier.
    pub id: SimulationId,
    /// Simulation name (not required to be unique).
    pub name: String,
    /// Current lifecycle state.
    pub status: SimulationStatus,
    /// The machine this simulation is scheduled on. The machine must
    /// exist when the simulation is created; updates do not re-validate
    /// the reference.
    pub machine_id: MachineId,
    /// When the simulation was created.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation; equals `created_at` at creation.
    pub updated_at: DateTime<Utc>,
}

/// A simulation joined with its machine's current attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationDetail {
    /// Unique simulation identifier.
    pub id: SimulationId,
    /// Simulation name.
    pub name: String,
    /// Current lifecycle state.
    pub status: SimulationStatus,
    /// The machine this simulation is scheduled on.
    pub machine_id: MachineId,
    /// When the simulation was created.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Snapshot of the machine's attributes at read time.
    pub machine: MachineSnapshot,
}

/// One timestamped loss reading belonging to a simulation.
///
/// Points form an append-only sequence per simulation, ordered by their
/// store-assigned timestamps; they are never mutated and are deleted only
/// by the owning simulation's cascade delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConvergencePoint {
    /// Unique point identifier.
    pub id: PointId,
    /// The owning simulation.
    pub simulation_id: SimulationId,
    /// Store-assigned insertion timestamp. Monotonically non-decreasing
    /// in insertion order per simulation; ties are possible when the
    /// store clock is coarser than the insertion rate.
    pub timestamp: DateTime<Utc>,
    /// The loss measurement. Unconstrained sign and range.
    pub loss_value: f64,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn simulation_serializes_status_lowercase() {
        let sim = Simulation {
            id: SimulationId::new(),
            name: String::from("reservoir-sweep"),
            status: SimulationStatus::Pending,
            machine_id: MachineId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&sim).ok();
        assert!(value.is_some());
        let value = value.unwrap_or_default();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["name"], "reservoir-sweep");
    }

    #[test]
    fn point_timestamp_serializes_iso8601() {
        let point = ConvergencePoint {
            id: PointId::new(),
            simulation_id: SimulationId::new(),
            timestamp: Utc::now(),
            loss_value: 0.42,
        };
        let value = serde_json::to_value(&point).ok().unwrap_or_default();
        let ts = value["timestamp"].as_str().unwrap_or_default();
        // RFC 3339 / ISO-8601: date, 'T' separator, trailing zone.
        assert!(ts.contains('T'));
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn detail_embeds_machine_snapshot() {
        let machine_id = MachineId::new();
        let detail = SimulationDetail {
            id: SimulationId::new(),
            name: String::from("history-match"),
            status: SimulationStatus::Running,
            machine_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            machine: MachineSnapshot {
                id: machine_id,
                name: String::from("gpu-cluster-01"),
                cpu: String::from("Intel Xeon E5-2686 v4"),
                gpu: String::from("NVIDIA Tesla V100"),
                memory: 32.0,
                status: String::from("available"),
            },
        };
        let value = serde_json::to_value(&detail).ok().unwrap_or_default();
        assert_eq!(value["machine"]["name"], "gpu-cluster-01");
        assert_eq!(value["machine_id"], value["machine"]["id"]);
    }
}
