//! Simulation lifecycle status.
//!
//! The nominal lifecycle is linear: `pending -> running -> finished`. An
//! external scheduler drives the transitions through the update endpoint;
//! the service itself never advances a simulation automatically, and it
//! deliberately accepts any status value on update, including backward or
//! skipping moves. The enum bounds the value space, not the transitions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of a [`Simulation`](crate::Simulation).
///
/// Serializes to the lowercase wire form used in query parameters,
/// request bodies, and responses (`"pending"`, `"running"`,
/// `"finished"`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    /// Created and waiting to be picked up by a worker.
    #[default]
    Pending,
    /// Currently producing convergence readings.
    Running,
    /// Terminal state; the convergence feed completes here.
    Finished,
}

impl SimulationStatus {
    /// The lowercase wire/database form of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }

    /// True iff this is the terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl core::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SimulationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            other => Err(ParseStatusError {
                value: other.to_owned(),
            }),
        }
    }
}

/// Error returned when a string is not a recognized simulation status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown simulation status: {value}")]
pub struct ParseStatusError {
    /// The rejected input value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&SimulationStatus::Pending).ok();
        assert_eq!(json.as_deref(), Some("\"pending\""));
    }

    #[test]
    fn parses_wire_form() {
        assert_eq!("running".parse(), Ok(SimulationStatus::Running));
        assert_eq!("finished".parse(), Ok(SimulationStatus::Finished));
    }

    #[test]
    fn rejects_unknown_value() {
        let parsed: Result<SimulationStatus, _> = "cancelled".parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn roundtrips_through_as_str() {
        for status in [
            SimulationStatus::Pending,
            SimulationStatus::Running,
            SimulationStatus::Finished,
        ] {
            assert_eq!(status.as_str().parse(), Ok(status));
        }
    }

    #[test]
    fn only_finished_is_terminal() {
        assert!(SimulationStatus::Finished.is_terminal());
        assert!(!SimulationStatus::Pending.is_terminal());
        assert!(!SimulationStatus::Running.is_terminal());
    }

    #[test]
    fn default_is_pending() {
        assert_eq!(SimulationStatus::default(), SimulationStatus::Pending);
    }
}
