use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::services::scan_service::{self, DocumentHighlights};
use crate::state::AppState;

pub fn scan(state: &AppState, root: &Path) -> Result<Vec<DocumentHighlights>, AppError> {
    let results = scan_service::scan_directory(root, &state.settings)?;
    info!(
        documents = results.len(),
        root = %root.display(),
        "scan complete"
    );
    Ok(results)
}

/// Forgets annotations of documents that no longer exist under `root`.
pub fn cleanup(state: &mut AppState, root: &Path) -> Result<usize, AppError> {
    let live: HashSet<String> = scan_service::live_document_paths(root, &state.settings)?
        .into_iter()
        .collect();
    state.store.cleanup(&live)
}
