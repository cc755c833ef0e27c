use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Active,
    Complete,
    Errored,
}

/// A single prompt and the text generated for it
///
/// `accumulated_text` only ever grows while the session lives, and is kept as-is
/// when the session errors.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseSession {
    pub id: Uuid,
    pub prompt_text: String,
    pub accumulated_text: String,
    pub status: ResponseStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ResponseSession {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt_text: prompt_text.into(),
            accumulated_text: String::new(),
            status: ResponseStatus::Active,
            error: None,
            started_at: Utc::now(),
        }
    }

    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            session_id: self.id,
            prompt_text: self.prompt_text.clone(),
            accumulated_text: self.accumulated_text.clone(),
            status: self.status,
        }
    }
}

/// Full state pushed to listeners on every update
///
/// Applying the same snapshot twice leaves the view unchanged.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseSnapshot {
    pub session_id: Uuid,
    pub prompt_text: String,
    pub accumulated_text: String,
    pub status: ResponseStatus,
}

/// A typeahead query against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub raw_text: String,
    pub normalized_text: String,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn new(raw_text: impl Into<String>, page: u32, page_size: u32) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = raw_text.trim().to_string();
        Self {
            raw_text,
            normalized_text,
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Length in characters, not bytes
    pub fn normalized_len(&self) -> usize {
        self.normalized_text.chars().count()
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Pending,
    Resolved,
    Stale,
    Error,
}

/// One dispatched catalog query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSession {
    pub id: u64,
    pub query: SearchQuery,
    pub status: SearchStatus,
}
