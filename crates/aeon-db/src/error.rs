//! Error types for the data layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors and the failures of
//! turning rows back into domain types. The repository trait sees these
//! through `From<DbError> for RepositoryError`.

use aeon_core::RepositoryError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid domain value.
    #[error("Decode error in {table}: {reason}")]
    Decode {
        /// Table the row came from.
        table: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub(crate) fn decode(table: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            table,
            reason: reason.to_string(),
        }
    }
}

impl From<DbError> for RepositoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Decode { .. } => Self::Corrupt(err.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}
