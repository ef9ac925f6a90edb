//! PostgreSQL backend.
//!
//! Pagination is pushed into the query: the cursor becomes a row-value
//! comparison `(created_at, id) < ($1, $2)` served by the
//! `(created_at DESC, id DESC)` index, and the database returns at most
//! `page_size + 1` rows.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};
use tokio_util::sync::CancellationToken;

use super::{NoteRepository, SEARCH_LIMIT, embedded::migrations, ensure_active, validate_query};
use crate::{
    config::PostgresConfig,
    error::{RepositoryError, Result},
    models::{NewNote, Note, NoteChanges},
    pagination::{self, ListParams, Page},
};

pub struct PostgresRepository {
    client: Client,
}

impl PostgresRepository {
    /// Opens a connection and drives it on a background task.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot be reached within the configured timeout.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let (client, con) =
            tokio::time::timeout(config.connect_timeout, tokio_postgres::connect(&config.dsn, NoTls))
                .await
                .map_err(|_| RepositoryError::ConnectTimeout(config.connect_timeout))?
                .map_err(|e| RepositoryError::database("failed to connect", e))?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        tracing::info!("Connected to PostgreSQL");

        Ok(Self { client })
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Migration`] if any migration fails.
    pub async fn migrate(&mut self) -> Result<()> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }
}

/// Runs a read-only query unless `cancel` fires first. Losing the race drops
/// the query future along with any rows it was buffering.
async fn cancellable<T, F>(cancel: &CancellationToken, context: &'static str, query: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, tokio_postgres::Error>>,
{
    ensure_active(cancel)?;

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RepositoryError::Cancelled),
        result = query => result.map_err(|e| RepositoryError::database(context, e)),
    }
}

/// Runs a statement that changes data. `cancel` is only checked before the
/// statement is sent. Once it is in flight the statement runs to completion
/// and its real outcome is returned, so a caller never sees `Cancelled` for a
/// change the database committed.
async fn committed<T, F>(
    cancel: &CancellationToken,
    context: &'static str,
    statement: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, tokio_postgres::Error>>,
{
    ensure_active(cancel)?;

    let result = statement.await;
    if cancel.is_cancelled() {
        tracing::debug!("{} finished after cancellation was requested", context);
    }
    result.map_err(|e| RepositoryError::database(context, e))
}

fn note_from_row(row: &Row) -> Result<Note> {
    let decode = |e| RepositoryError::database("failed to decode note row", e);

    Ok(Note {
        id: row.try_get("id").map_err(decode)?,
        title: row.try_get("title").map_err(decode)?,
        content: row.try_get("content").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn notes_from_rows(rows: &[Row]) -> Result<Vec<Note>> {
    rows.iter().map(note_from_row).collect()
}

/// Escapes `LIKE` metacharacters so the query matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl NoteRepository for PostgresRepository {
    async fn create(&self, cancel: &CancellationToken, note: NewNote) -> Result<Note> {
        let row = committed(
            cancel,
            "failed to create note",
            self.client.query_one(
                "INSERT INTO notes (title, content) VALUES ($1, $2) \
                 RETURNING id, title, content, created_at, updated_at",
                &[&note.title, &note.content],
            ),
        )
        .await?;

        let note = note_from_row(&row)?;
        tracing::debug!("Created note {}", note.id);
        Ok(note)
    }

    async fn get(&self, cancel: &CancellationToken, id: i64) -> Result<Note> {
        let row = cancellable(
            cancel,
            "failed to fetch note",
            self.client.query_opt(
                "SELECT id, title, content, created_at, updated_at FROM notes WHERE id = $1",
                &[&id],
            ),
        )
        .await?;

        row.map_or(Err(RepositoryError::NotFound(id)), |row| note_from_row(&row))
    }

    async fn get_many(&self, cancel: &CancellationToken, ids: &[i64]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = cancellable(
            cancel,
            "failed to fetch notes",
            self.client.query(
                "SELECT id, title, content, created_at, updated_at FROM notes \
                 WHERE id = ANY($1) ORDER BY id",
                &[&ids],
            ),
        )
        .await?;

        notes_from_rows(&rows)
    }

    async fn list(&self, cancel: &CancellationToken, params: ListParams) -> Result<Page> {
        let limit = to_limit(params.fetch_limit());

        let rows = match params.cursor {
            None => {
                cancellable(
                    cancel,
                    "failed to list notes",
                    self.client.query(
                        "SELECT id, title, content, created_at, updated_at FROM notes \
                         ORDER BY created_at DESC, id DESC LIMIT $1",
                        &[&limit],
                    ),
                )
                .await?
            }
            Some(cursor) => {
                cancellable(
                    cancel,
                    "failed to list notes",
                    self.client.query(
                        "SELECT id, title, content, created_at, updated_at FROM notes \
                         WHERE (created_at, id) < ($1, $2) \
                         ORDER BY created_at DESC, id DESC LIMIT $3",
                        &[&cursor.timestamp, &cursor.id, &limit],
                    ),
                )
                .await?
            }
        };

        let page = pagination::into_page(notes_from_rows(&rows)?, params.effective_page_size());

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

        let pattern = format!("%{}%", escape_like(query));
        let limit = to_limit(SEARCH_LIMIT);

        let rows = cancellable(
            cancel,
            "failed to search notes",
            self.client.query(
                "SELECT id, title, content, created_at, updated_at FROM notes \
                 WHERE title ILIKE $1 OR content ILIKE $1 \
                 ORDER BY created_at DESC, id DESC LIMIT $2",
                &[&pattern, &limit],
            ),
        )
        .await?;

        notes_from_rows(&rows)
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: i64,
        changes: NoteChanges,
    ) -> Result<Note> {
        let row = committed(
            cancel,
            "failed to update note",
            self.client.query_opt(
                "UPDATE notes SET title = $1, content = $2, \
                 updated_at = GREATEST(now(), updated_at + interval '1 microsecond') \
                 WHERE id = $3 \
                 RETURNING id, title, content, created_at, updated_at",
                &[&changes.title, &changes.content, &id],
            ),
        )
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound(id));
        };

        tracing::debug!("Updated note {}", id);
        note_from_row(&row)
    }

    async fn delete(&self, cancel: &CancellationToken, id: i64) -> Result<()> {
        let affected = committed(
            cancel,
            "failed to delete note",
            self.client
                .execute("DELETE FROM notes WHERE id = $1", &[&id]),
        )
        .await?;

        if affected == 0 {
            return Err(RepositoryError::NotFound(id));
        }

        tracing::debug!("Deleted note {}", id);
        Ok(())
    }
}
