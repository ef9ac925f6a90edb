//! In-process backend.
//!
//! All notes live in one map behind a single `RwLock`. Writers hold the write
//! lock for the whole operation. Readers hold the read lock only long enough
//! to copy what they need, then sort and filter the copy without it, so a
//! listing reflects the state at the moment of the copy.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{NoteRepository, SEARCH_LIMIT, ensure_active, validate_query};
use crate::{
    error::{RepositoryError, Result},
    models::{NewNote, Note, NoteChanges},
    pagination::{self, ListParams, Page},
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct MemoryRepository {
    state: RwLock<State>,
    clock: Clock,
}

struct State {
    notes: HashMap<i64, Note>,
    next_id: i64,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Creates a repository that reads time from `clock` instead of the
    /// system clock.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            state: RwLock::new(State {
                notes: HashMap::new(),
                next_id: 1,
            }),
            clock: Arc::new(clock),
        }
    }

    // Truncated to the precision PostgreSQL stores.
    fn now(&self) -> DateTime<Utc> {
        (self.clock)().trunc_subsecs(6)
    }

    async fn snapshot(&self) -> Vec<Note> {
        let state = self.state.read().await;
        state.notes.values().cloned().collect()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteRepository for MemoryRepository {
    async fn create(&self, cancel: &CancellationToken, note: NewNote) -> Result<Note> {
        ensure_active(cancel)?;

        let mut state = self.state.write().await;
        let now = self.now();
        let id = state.next_id;
        state.next_id += 1;

        let note = Note {
            id,
            title: note.title,
            content: note.content,
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(id, note.clone());

        tracing::debug!("Created note {}", id);
        Ok(note)
    }

    async fn get(&self, cancel: &CancellationToken, id: i64) -> Result<Note> {
        ensure_active(cancel)?;

        let state = self.state.read().await;
        state
            .notes
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn get_many(&self, cancel: &CancellationToken, ids: &[i64]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ensure_active(cancel)?;

        let wanted: BTreeSet<i64> = ids.iter().copied().collect();

        let state = self.state.read().await;
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.notes.get(&id).cloned())
            .collect())
    }

    async fn list(&self, cancel: &CancellationToken, params: ListParams) -> Result<Page> {
        ensure_active(cancel)?;

        let snapshot = self.snapshot().await;
        let page = pagination::paginate(snapshot, &params);

        tracing::debug!(
            "Listed {} notes (page size {}, more: {})",
            page.notes.len(),
            params.effective_page_size(),
            page.has_more()
        );
        Ok(page)
    }

    async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<Note>> {
        validate_query(query)?;
        ensure_active(cancel)?;

        let needle = query.to_lowercase();
        let snapshot = self.snapshot().await;

        let mut found: Vec<Note> = snapshot
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .collect();
        found.sort_unstable_by(pagination::listing_order);
        found.truncate(SEARCH_LIMIT);

        Ok(found)
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: i64,
        changes: NoteChanges,
    ) -> Result<Note> {
        ensure_active(cancel)?;

        let mut state = self.state.write().await;
        let now = self.now();
        let note = state
            .notes
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        note.title = changes.title;
        note.content = changes.content;
        // Keeps updated_at strictly increasing even if the clock stalls.
        note.updated_at = now.max(note.updated_at + Duration::microseconds(1));

        tracing::debug!("Updated note {}", id);
        Ok(note.clone())
    }

    async fn delete(&self, cancel: &CancellationToken, id: i64) -> Result<()> {
        ensure_active(cancel)?;

        let mut state = self.state.write().await;
        if state.notes.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(id));
        }

        tracing::debug!("Deleted note {}", id);
        Ok(())
    }
}
