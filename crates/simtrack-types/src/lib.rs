//! Shared type definitions for the Simtrack scheduling service.
//!
//! This crate holds the data model shared by the persistence layer, the
//! HTTP/WebSocket API, and the server binary:
//!
//! - Strongly-typed UUID identifiers ([`MachineId`], [`SimulationId`],
//!   [`PointId`])
//! - The [`SimulationStatus`] lifecycle enum
//! - Entity and read-model structs ([`Machine`], [`Simulation`],
//!   [`SimulationDetail`], [`ConvergencePoint`])
//!
//! All types serialize to the JSON wire shapes served by the API and
//! export TypeScript bindings for the dashboard via `ts-rs`.

pub mod ids;
pub mod models;
pub mod status;

// Re-export primary types for convenience.
pub use ids::{MachineId, PointId, SimulationId};
pub use models::{ConvergencePoint, Machine, MachineSnapshot, Simulation, SimulationDetail};
pub use status::{ParseStatusError, SimulationStatus};
