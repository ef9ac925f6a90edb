//! Note storage backends.
//!
//! Callers hold an `Arc<dyn NoteRepository>` and never depend on the concrete
//! backend. Both backends share the same ordering, cursor and error rules:
//!
//! - listings are ordered by `(created_at DESC, id DESC)` and paginated with
//!   keyset cursors (see [`crate::pagination`]);
//! - `get_many` returns the existing notes ordered by ascending id, each once;
//! - `search` is a case-insensitive substring match on title or content,
//!   newest first, capped at [`SEARCH_LIMIT`] notes.
//!
//! Every operation receives a [`CancellationToken`] and fails with
//! [`RepositoryError::Cancelled`] if it has fired before storage is touched.
//! A write that has already reached storage is never reported as cancelled:
//! it returns its real outcome.

mod embedded;
pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Backend, Config, ConfigError},
    error::{RepositoryError, Result},
    models::{NewNote, Note, NoteChanges},
    pagination::{ListParams, Page},
};

/// Upper bound on the number of notes a single search returns.
pub const SEARCH_LIMIT: usize = 50;

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Stores a new note, assigning its id and timestamps.
    async fn create(&self, cancel: &CancellationToken, note: NewNote) -> Result<Note>;

    async fn get(&self, cancel: &CancellationToken, id: i64) -> Result<Note>;

    /// Fetches every existing note among `ids`, ordered by id. Unknown ids
    /// are skipped.
    async fn get_many(&self, cancel: &CancellationToken, ids: &[i64]) -> Result<Vec<Note>>;

    /// Returns one page of notes, newest first.
    async fn list(&self, cancel: &CancellationToken, params: ListParams) -> Result<Page>;

    async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<Note>>;

    /// Replaces title and content and refreshes `updated_at`.
    async fn update(
        &self,
        cancel: &CancellationToken,
        id: i64,
        changes: NoteChanges,
    ) -> Result<Note>;

    async fn delete(&self, cancel: &CancellationToken, id: i64) -> Result<()>;
}

/// Builds the backend selected by `config`.
///
/// The PostgreSQL backend is connected and migrated before it is returned.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or the database
/// cannot be reached or migrated.
pub async fn open(config: &Config) -> std::result::Result<Arc<dyn NoteRepository>, OpenError> {
    config.validate()?;

    match config.backend {
        Backend::Memory => {
            tracing::info!("Using in-memory note repository");
            Ok(Arc::new(MemoryRepository::new()))
        }
        Backend::Postgres => {
            let Some(pg) = &config.postgres else {
                return Err(ConfigError::MissingDsn.into());
            };

            let mut repo = PostgresRepository::connect(pg).await?;
            repo.migrate().await?;

            tracing::info!("Using PostgreSQL note repository");
            Ok(Arc::new(repo))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

pub(crate) fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RepositoryError::EmptyQuery);
    }
    Ok(())
}
