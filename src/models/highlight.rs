use serde::{Deserialize, Serialize};

use super::{next_timestamp, now_millis};

/// Which textual encoding produced a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// `==text==`
    Delimiter,
    /// `<mark ...>text</mark>`
    Mark,
    /// `<span style="background-color: ...">text</span>`
    Span,
}

impl std::fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delimiter => write!(f, "delimiter"),
            Self::Mark => write!(f, "mark"),
            Self::Span => write!(f, "span"),
        }
    }
}

/// A highlight found by scanning raw document text. Produced fresh on every scan.
///
/// `position`, `paragraph_offset` and `original_length` are counted in characters
/// (Unicode scalar values), not bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightOccurrence {
    pub id: String,
    pub kind: HighlightKind,
    pub text: String,
    pub position: usize,
    pub paragraph_offset: usize,
    pub background_color: Option<String>,
    pub original_length: usize,
}

impl HighlightOccurrence {
    pub fn end(&self) -> usize {
        self.position + self.original_length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentItem {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CommentItem {
    pub fn new(content: &str) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persistent record pairing a highlight with its comment thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightComment {
    pub id: String,
    pub text: String,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_id: Option<String>,
    #[serde(default)]
    pub comments: Vec<CommentItem>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl HighlightComment {
    /// Starts a persistent record for a scanned highlight. The paragraph id is left
    /// for the store to derive.
    pub fn from_occurrence(occurrence: &HighlightOccurrence) -> Self {
        let now = now_millis();
        Self {
            id: occurrence.id.clone(),
            text: occurrence.text.clone(),
            position: occurrence.position,
            paragraph_offset: Some(occurrence.paragraph_offset),
            background_color: occurrence.background_color.clone(),
            paragraph_id: None,
            comments: Vec::new(),
            is_virtual: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// A highlight that exists only in the store, not in the scanned text.
    pub fn new_virtual(text: &str) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            position: 0,
            paragraph_offset: None,
            background_color: None,
            paragraph_id: None,
            comments: Vec::new(),
            is_virtual: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}
