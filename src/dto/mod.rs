use serde::{Deserialize, Serialize};

use crate::models::Note;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePage {
    /// Notes on this page, newest first
    pub data: Vec<Note>,
    /// Token for the following page, absent on the last one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub count: usize,
    pub data: Vec<Note>,
}
