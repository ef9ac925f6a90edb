use std::time::Duration;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("note {0} not found")]
    NotFound(i64),

    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("failed to apply migrations: {0}")]
    Migration(#[from] refinery::Error),

    #[error("timed out after {0:?} connecting to database")]
    ConnectTimeout(Duration),
}

impl RepositoryError {
    pub(crate) fn database(context: &'static str, source: tokio_postgres::Error) -> Self {
        Self::Database { context, source }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Failures of the underlying store, as opposed to expected outcomes and
    /// caller errors. Nothing in this crate retries them.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::Migration(_) | Self::ConnectTimeout(_)
        )
    }
}
