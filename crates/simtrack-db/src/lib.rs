//! Data layer (`PostgreSQL`) for the Simtrack scheduling service.
//!
//! `PostgreSQL` is the single durable store: the machine registry, the
//! simulation lifecycle records, and the append-only convergence ledger
//! all live here. Each store call is one atomic unit against the
//! database; there are no cross-call transactions.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, configuration, migrations
//! - [`machine_store`] -- machine registry CRUD and existence checks
//! - [`simulation_store`] -- simulation lifecycle persistence with
//!   machine-joined reads, filtered/ordered/paginated listing, partial
//!   updates, cascade delete
//! - [`convergence_store`] -- append-only ledger with full-history and
//!   cursor-based incremental reads
//! - [`error`] -- shared error types

pub mod convergence_store;
pub mod error;
pub mod machine_store;
pub mod postgres;
pub mod simulation_store;

// Re-export primary types for convenience.
pub use convergence_store::{ConvergencePointRow, ConvergenceStore};
pub use error::DbError;
pub use machine_store::{MachineRow, MachineStore, NewMachine};
pub use postgres::{PostgresConfig, PostgresPool};
pub use simulation_store::{
    OrderDirection, OrderField, SimulationDetailRow, SimulationListQuery, SimulationPatch,
    SimulationRow, SimulationStore,
};
