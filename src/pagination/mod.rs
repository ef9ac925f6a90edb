//! Keyset pagination shared by every repository backend.
//!
//! Notes are listed newest first, ordered by `(created_at DESC, id DESC)`.
//! A page request fetches one row more than it returns; the extra row only
//! signals that another page exists. The next cursor is the sort key of the
//! last row actually returned, and the following request resumes strictly
//! after it.

mod cursor;

pub use cursor::{Cursor, CursorError};

use std::cmp::Ordering;

use crate::models::Note;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Requested page size. Non-positive values fall back to
    /// [`DEFAULT_PAGE_SIZE`], larger ones are capped at [`MAX_PAGE_SIZE`].
    pub page_size: i64,
    pub cursor: Option<Cursor>,
}

impl ListParams {
    #[must_use]
    pub const fn new(page_size: i64, cursor: Option<Cursor>) -> Self {
        Self { page_size, cursor }
    }

    #[must_use]
    pub const fn first_page(page_size: i64) -> Self {
        Self::new(page_size, None)
    }

    /// Builds parameters from raw request values.
    ///
    /// A missing or malformed cursor token starts the listing from the first
    /// page rather than failing.
    #[must_use]
    pub fn from_request(page_size: Option<i64>, cursor: Option<&str>) -> Self {
        Self {
            page_size: page_size.unwrap_or(0),
            cursor: cursor
                .filter(|token| !token.trim().is_empty())
                .and_then(Cursor::decode_lenient),
        }
    }

    #[must_use]
    pub fn effective_page_size(&self) -> usize {
        normalize_page_size(self.page_size)
    }

    /// Number of rows a backend has to fetch to fill a page and detect the
    /// next one.
    #[must_use]
    pub fn fetch_limit(&self) -> usize {
        self.effective_page_size() + 1
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::first_page(0)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub notes: Vec<Note>,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

#[must_use]
pub fn normalize_page_size(page_size: i64) -> usize {
    if page_size <= 0 {
        return DEFAULT_PAGE_SIZE;
    }
    usize::try_from(page_size).map_or(MAX_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE))
}

/// Orders notes the way listings return them: newest first, ties broken by
/// the larger id first.
#[must_use]
pub fn listing_order(a: &Note, b: &Note) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Whether `note` comes strictly after `cursor` in listing order.
#[must_use]
pub fn is_after(note: &Note, cursor: &Cursor) -> bool {
    note.created_at < cursor.timestamp
        || (note.created_at == cursor.timestamp && note.id < cursor.id)
}

/// Turns up to `page_size + 1` candidates, already in listing order, into a
/// page.
#[must_use]
pub fn into_page(mut candidates: Vec<Note>, page_size: usize) -> Page {
    if candidates.len() <= page_size {
        return Page {
            notes: candidates,
            next_cursor: None,
        };
    }

    candidates.truncate(page_size);
    let next_cursor = candidates.last().map(Note::sort_key);

    Page {
        notes: candidates,
        next_cursor,
    }
}

/// Paginates an unordered in-memory snapshot.
#[must_use]
pub fn paginate(snapshot: Vec<Note>, params: &ListParams) -> Page {
    let page_size = params.effective_page_size();

    let mut candidates: Vec<Note> = match &params.cursor {
        Some(cursor) => snapshot
            .into_iter()
            .filter(|note| is_after(note, cursor))
            .collect(),
        None => snapshot,
    };

    candidates.sort_unstable_by(listing_order);
    candidates.truncate(params.fetch_limit());

    into_page(candidates, page_size)
}
