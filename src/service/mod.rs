use crate::{
    dto::{NotePage, SearchResults},
    error::Result,
    pagination::ListParams,
    repository::NoteRepository,
};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Entry point for request handlers that pass query parameters through as
/// they arrived.
#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub const fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    #[must_use]
    pub const fn repository(&self) -> &Arc<dyn NoteRepository> {
        &self.repo
    }

    /// Lists one page of notes. A malformed `cursor` restarts from the first
    /// page.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn list_notes(
        &self,
        cancel: &CancellationToken,
        page_size: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<NotePage> {
        let params = ListParams::from_request(page_size, cursor);
        let page = self.repo.list(cancel, params).await?;

        Ok(NotePage {
            next_cursor: page.next_cursor.map(|cursor| cursor.encode()),
            data: page.notes,
        })
    }

    /// # Errors
    ///
    /// Returns [`crate::RepositoryError::EmptyQuery`] for an empty query and
    /// propagates repository failures.
    pub async fn search_notes(
        &self,
        cancel: &CancellationToken,
        query: &str,
    ) -> Result<SearchResults> {
        let notes = self.repo.search(cancel, query).await?;

        tracing::debug!("Search '{}' matched {} notes", query, notes.len());

        Ok(SearchResults {
            query: query.to_string(),
            count: notes.len(),
            data: notes,
        })
    }
}
