use serde::{Deserialize, Serialize};

use super::now_millis;

/// A comment attached to a whole document rather than to a highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComment {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub file_path: String,
}

impl FileComment {
    pub fn new(file_path: &str, content: &str) -> Self {
        let now = now_millis();
        Self {
            id: format!("{now}-{}", &uuid::Uuid::new_v4().simple().to_string()[..9]),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            file_path: file_path.to_string(),
        }
    }
}
