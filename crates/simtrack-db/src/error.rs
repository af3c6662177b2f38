//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into its domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<simtrack_types::ParseStatusError> for DbError {
    fn from(err: simtrack_types::ParseStatusError) -> Self {
        Self::Decode(err.to_string())
    }
}
