//! Shared application state for the API server.
//!
//! [`AppState`] holds the `PostgreSQL` pool every handler reads through
//! and the [`FeedRegistry`] that tracks live convergence feeds. It is
//! wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
//! extractor.

use simtrack_db::PostgresPool;
use sqlx::PgPool;

use crate::feed::FeedRegistry;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool to the durable store.
    pub db: PostgresPool,
    /// Live convergence feed registry (one poll loop per subscribed
    /// simulation).
    pub feeds: FeedRegistry,
}

impl AppState {
    /// Create application state around a connected pool.
    pub fn new(db: PostgresPool) -> Self {
        Self {
            db,
            feeds: FeedRegistry::new(),
        }
    }

    /// Shorthand for the raw [`PgPool`] the stores bind to.
    pub const fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}
