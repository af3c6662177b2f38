//! Error types for the server binary.
//!
//! [`ServerError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// A database operation failed during startup.
    #[error("database error: {source}")]
    Db {
        /// The underlying data-layer error.
        #[from]
        source: simtrack_db::DbError,
    },

    /// The API server failed to bind or serve.
    #[error("api error: {source}")]
    Api {
        /// The underlying API server error.
        #[from]
        source: simtrack_api::ServerError,
    },
}
