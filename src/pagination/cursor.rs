//! Opaque pagination tokens.
//!
//! A token is the sort key of the last note a client has seen, written as an
//! RFC 3339 UTC timestamp and the note id joined by `_`:
//!
//! ```text
//! 2024-05-01T10:00:00.123456Z_42
//! ```
//!
//! The fractional seconds use the shortest width that keeps every digit, so
//! decoding an encoded cursor always yields the exact same key.

use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};

const SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub id: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token has no '_' separator")]
    MissingSeparator,

    #[error("invalid cursor timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("invalid cursor id: {0}")]
    Id(#[from] ParseIntError),
}

impl Cursor {
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, id: i64) -> Self {
        Self { timestamp, id }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns a [`CursorError`] describing the first malformed part.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CursorError::Empty);
        }

        // RFC 3339 never contains '_', so the last one splits the two halves.
        let (timestamp, id) = token
            .rsplit_once(SEPARATOR)
            .ok_or(CursorError::MissingSeparator)?;

        let timestamp = DateTime::parse_from_rfc3339(timestamp)?.with_timezone(&Utc);
        let id = id.parse::<i64>()?;

        Ok(Self { timestamp, id })
    }

    /// Same as [`Cursor::decode`] but maps any malformed token to `None`.
    ///
    /// Callers that receive tokens from clients use this to restart from the
    /// first page instead of failing the request.
    #[must_use]
    pub fn decode_lenient(token: &str) -> Option<Self> {
        match Self::decode(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                tracing::warn!("ignoring malformed cursor '{}': {}", token, e);
                None
            }
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            SEPARATOR,
            self.id
        )
    }
}

impl FromStr for Cursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
