use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::Cursor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Position of this note in the `(created_at DESC, id DESC)` listing order.
    #[must_use]
    pub const fn sort_key(&self) -> Cursor {
        Cursor::new(self.created_at, self.id)
    }
}

/// Fields supplied by the caller when creating a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Replacement title and content for an existing note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChanges {
    pub title: String,
    pub content: String,
}

impl NoteChanges {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}
