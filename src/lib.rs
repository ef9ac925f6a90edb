//! Note storage with keyset pagination.
//!
//! Two interchangeable backends implement [`NoteRepository`]: an in-process
//! [`MemoryRepository`] and a PostgreSQL-backed [`PostgresRepository`]. Both
//! list notes newest first by `(created_at, id)` and hand out opaque
//! [`Cursor`] tokens that resume a listing after the last note returned.
//!
//! ```no_run
//! use notes_store::{config, pagination::ListParams, repository};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = repository::open(&config::load_config()?).await?;
//! let cancel = CancellationToken::new();
//!
//! let mut params = ListParams::first_page(50);
//! loop {
//!     let page = repo.list(&cancel, params).await?;
//!     for note in &page.notes {
//!         println!("{} {}", note.id, note.title);
//!     }
//!     match page.next_cursor {
//!         Some(cursor) => params.cursor = Some(cursor),
//!         None => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod service;

pub use error::{RepositoryError, Result};
pub use models::{NewNote, Note, NoteChanges};
pub use pagination::{Cursor, CursorError, ListParams, Page};
pub use repository::{MemoryRepository, NoteRepository, PostgresRepository};
pub use service::NoteService;
