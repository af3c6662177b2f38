//! API server for the Simtrack scheduling service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for the machine registry, simulation lifecycle,
//!   and convergence ledger
//! - **`WebSocket` endpoint** (`/ws/convergence/{simulation_id}`) for
//!   live convergence streaming via [`tokio::sync::broadcast`]
//!
//! # Architecture
//!
//! REST handlers are thin request/response wrappers over the
//! `simtrack-db` stores; any two requests for different simulations are
//! fully independent. The live feed is pull-based: one polling task per
//! actively-subscribed simulation re-reads the ledger every
//! [`FEED_POLL_INTERVAL`](feed::FEED_POLL_INTERVAL) and fans deltas out
//! to all of that simulation's subscribers, ending the feed with a
//! terminal message when the simulation finishes.

pub mod convergence;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod machines;
pub mod router;
pub mod server;
pub mod simulations;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use feed::{FeedMessage, FeedPoint, FeedRegistry};
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
