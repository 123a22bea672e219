use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::HighlightSettings;
use crate::error::AppError;
use crate::models::highlight::HighlightOccurrence;
use crate::services::exclusion_service::ExclusionFilter;
use crate::services::extraction_service;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHighlights {
    pub path: String,
    pub highlights: Vec<HighlightOccurrence>,
}

fn should_skip(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn has_document_extension(path: &Path, settings: &HighlightSettings) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| settings.extensions.iter().any(|allowed| allowed == ext))
}

/// `path` relative to `root`, with forward slashes.
fn document_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn documents<'a>(
    root: &'a Path,
    settings: &'a HighlightSettings,
) -> Result<impl Iterator<Item = walkdir::DirEntry> + 'a, AppError> {
    if !root.is_dir() {
        return Err(AppError::General(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    Ok(walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !should_skip(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(move |e| e.file_type().is_file() && has_document_extension(e.path(), settings)))
}

/// Every document under `root`, excluded or not. Feeds store cleanup.
pub fn live_document_paths(
    root: &Path,
    settings: &HighlightSettings,
) -> Result<Vec<String>, AppError> {
    Ok(documents(root, settings)?
        .map(|entry| document_path(root, entry.path()))
        .collect())
}

/// Extracts highlights from every non-excluded document under `root`. Documents
/// without highlights are left out; unreadable ones are logged and skipped.
pub fn scan_directory(
    root: &Path,
    settings: &HighlightSettings,
) -> Result<Vec<DocumentHighlights>, AppError> {
    let filter = ExclusionFilter::parse(&settings.exclude_rules);
    let mut results = Vec::new();

    for entry in documents(root, settings)? {
        let path = document_path(root, entry.path());
        if filter.is_excluded(&path) {
            debug!(path = %path, "excluded from scan");
            continue;
        }

        let text = match std::fs::read_to_string(entry.path()) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path, "failed to read document: {e}");
                continue;
            }
        };
        if !extraction_service::has_highlights(&text) {
            continue;
        }

        let highlights = extraction_service::extract_highlights(&text);
        debug!(path = %path, count = highlights.len(), "highlights extracted");
        results.push(DocumentHighlights { path, highlights });
    }

    Ok(results)
}
