use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::file_comment::FileComment;
use super::highlight::HighlightComment;

/// The durable blob: document path -> highlight id -> record, and document path ->
/// file comments in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnnotations {
    #[serde(default)]
    pub comments: BTreeMap<String, BTreeMap<String, HighlightComment>>,
    #[serde(default)]
    pub file_comments: BTreeMap<String, Vec<FileComment>>,
}

impl StoredAnnotations {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.file_comments.is_empty()
    }
}
