use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::models::file_comment::FileComment;
use crate::models::highlight::HighlightComment;
use crate::scope_path;
use crate::services::block_id_service::{
    BlockIdAllocator, EditorBlockIdAllocator, EditorContext, TextBuffer,
};
use crate::services::extraction_service;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnnotations {
    pub path: String,
    pub highlights: Vec<HighlightComment>,
    pub file_comments: Vec<FileComment>,
}

pub fn list_annotations(state: &AppState, doc: &str) -> DocumentAnnotations {
    let path = scope_path::normalize(doc);
    DocumentAnnotations {
        highlights: state.store.get_highlights_for_document(&path),
        file_comments: state.store.get_file_comments(&path).to_vec(),
        path,
    }
}

/// Comments on the highlight covering `position` in `root/doc`, storing the
/// highlight first if it is new. A new block marker is written back to the file
/// before anything is persisted, and stored highlights on later lines move with it.
pub fn comment_on_highlight(
    state: &mut AppState,
    root: &Path,
    doc: &str,
    position: usize,
    content: &str,
) -> Result<HighlightComment, AppError> {
    let path = scope_path::normalize(doc);
    let file_path = root.join(&path);
    let text = std::fs::read_to_string(&file_path)?;
    comment_on_text(state, &path, &text, position, content, |marked| {
        std::fs::write(&file_path, marked)?;
        Ok(())
    })
}

/// Does the work of [`comment_on_highlight`] over the document's current
/// `text`, calling `write_back` with the marked text when a marker is added.
fn comment_on_text<W>(
    state: &mut AppState,
    path: &str,
    text: &str,
    position: usize,
    content: &str,
    write_back: W,
) -> Result<HighlightComment, AppError>
where
    W: FnOnce(&str) -> Result<(), AppError>,
{
    let occurrence = extraction_service::extract_highlights(text)
        .into_iter()
        .find(|o| o.position <= position && position < o.end())
        .ok_or_else(|| AppError::General(format!("no highlight at {path}:{position}")))?;

    let existing = state
        .store
        .get_highlights_for_document(path)
        .into_iter()
        .find(|r| !r.is_virtual && r.position == occurrence.position && r.text == occurrence.text)
        .map(|r| r.id);

    let highlight_id = match existing {
        Some(id) => id,
        None => {
            let mut record = HighlightComment::from_occurrence(&occurrence);
            let original = TextBuffer::new(text);
            let mut allocator = EditorBlockIdAllocator::new(original.clone());
            record.paragraph_id = allocator.allocate(path, occurrence.position);

            let buffer = allocator.into_editor();
            if buffer.is_modified() {
                write_back(&buffer.text())?;
                debug!(path, "block marker written");
                shift_after_marked_line(state, path, &original, &buffer, occurrence.position)?;
            }

            let id = record.id.clone();
            state.store.add_highlight(path, record)?;
            id
        }
    };

    state
        .store
        .add_comment_to_highlight(path, &highlight_id, content)?;
    state
        .store
        .get_highlight(path, &highlight_id)
        .cloned()
        .ok_or_else(|| AppError::General(format!("highlight vanished: {highlight_id}")))
}

/// Moves stored highlights that start after the line holding `position` by the
/// length the marker edit added to that line.
fn shift_after_marked_line(
    state: &mut AppState,
    path: &str,
    before: &TextBuffer,
    after: &TextBuffer,
    position: usize,
) -> Result<(), AppError> {
    let Some(line) = before.line_at_offset(position) else {
        return Ok(());
    };
    let (Some(old_next), Some(new_next)) = (before.line_start(line + 1), after.line_start(line + 1))
    else {
        return Ok(());
    };
    let delta = new_next as isize - old_next as isize;
    state.store.shift_positions(path, old_next, delta)?;
    Ok(())
}

pub fn add_note(state: &mut AppState, doc: &str, content: &str) -> Result<FileComment, AppError> {
    state
        .store
        .add_file_comment(&scope_path::normalize(doc), content)
}

pub fn remove_highlight(
    state: &mut AppState,
    doc: &str,
    highlight_id: &str,
) -> Result<(), AppError> {
    state
        .store
        .remove_highlight(&scope_path::normalize(doc), highlight_id)
}

/// Comments of one paragraph, served through the paragraph cache.
pub fn paragraph_comments(
    state: &mut AppState,
    doc: &str,
    paragraph_id: &str,
) -> Vec<HighlightComment> {
    let path = scope_path::normalize(doc);
    state
        .store
        .refresh_visible_paragraph_cache(&path, [paragraph_id]);
    state
        .store
        .cached_paragraph_comments(paragraph_id)
        .map(<[HighlightComment]>::to_vec)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(text: &str) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        fs::write(dir.path().join("notes/a.md"), text).unwrap();
        (dir, AppState::open_in_memory().unwrap())
    }

    #[test]
    fn commenting_stores_highlight_and_marks_line() {
        let (dir, mut state) = setup("first line\nsome ==key point== here\nlast");

        let record =
            comment_on_highlight(&mut state, dir.path(), "notes/a.md", 18, "why?").unwrap();
        assert_eq!(record.text, "key point");
        assert_eq!(record.comments.len(), 1);

        let paragraph_id = record.paragraph_id.clone().unwrap();
        let block = paragraph_id.strip_prefix("notes/a.md#^").unwrap();
        let written = fs::read_to_string(dir.path().join("notes/a.md")).unwrap();
        assert_eq!(
            written,
            format!("first line\nsome ==key point== here ^{block}\nlast")
        );

        let again =
            comment_on_highlight(&mut state, dir.path(), "./notes/a.md", 18, "because").unwrap();
        assert_eq!(again.id, record.id);
        assert_eq!(again.comments.len(), 2);

        let listed = list_annotations(&state, "notes/a.md");
        assert_eq!(listed.highlights.len(), 1);

        let cached = paragraph_comments(&mut state, "notes/a.md", &paragraph_id);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn markers_on_earlier_lines_keep_later_highlights_matched() {
        let (dir, mut state) = setup("==one== x\n==two== y");

        let first = comment_on_highlight(&mut state, dir.path(), "notes/a.md", 12, "a").unwrap();
        assert_eq!(first.text, "two");

        let one = comment_on_highlight(&mut state, dir.path(), "notes/a.md", 2, "b").unwrap();
        assert_eq!(one.text, "one");

        let written = fs::read_to_string(dir.path().join("notes/a.md")).unwrap();
        let shifted = written.find("==two==").map(|byte| written[..byte].chars().count());
        let shifted = shifted.unwrap();
        assert_eq!(state.store.get_highlight("notes/a.md", &first.id).unwrap().position, shifted);

        let again =
            comment_on_highlight(&mut state, dir.path(), "notes/a.md", shifted + 2, "c").unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.comments.len(), 2);
        assert_eq!(again.paragraph_id, first.paragraph_id);

        let records = list_annotations(&state, "notes/a.md").highlights;
        assert_eq!(records.iter().filter(|r| r.text == "two").count(), 1);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn failed_marker_write_persists_nothing() {
        let mut state = AppState::open_in_memory().unwrap();
        let result = comment_on_text(&mut state, "a.md", "==x== body", 2, "c", |_| {
            Err(AppError::Io(std::io::Error::other("disk full")))
        });

        assert!(result.is_err());
        assert!(state.store.document_paths().is_empty());

        let mut written = None;
        let record = comment_on_text(&mut state, "a.md", "==x== body", 2, "c", |text| {
            written = Some(text.to_string());
            Ok(())
        })
        .unwrap();
        let block = record.paragraph_id.as_deref().unwrap().strip_prefix("a.md#^").unwrap();
        assert_eq!(written.unwrap(), format!("==x== body ^{block}"));
    }

    #[test]
    fn unwritable_document_is_left_unannotated() {
        let (dir, mut state) = setup("==x== body");
        let file = dir.path().join("notes/a.md");
        let text = fs::read_to_string(&file).unwrap();
        fs::remove_file(&file).unwrap();
        fs::create_dir(&file).unwrap();

        let result = comment_on_text(&mut state, "notes/a.md", &text, 2, "c", |marked| {
            fs::write(&file, marked)?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(state.store.get_highlights_for_document("notes/a.md").is_empty());
    }

    #[test]
    fn commenting_outside_a_highlight_fails() {
        let (dir, mut state) = setup("nothing highlighted");
        assert!(comment_on_highlight(&mut state, dir.path(), "notes/a.md", 0, "x").is_err());
        assert!(state.store.document_paths().is_empty());
    }

    #[test]
    fn notes_and_removal() {
        let (dir, mut state) = setup("==x==");
        let note = add_note(&mut state, "notes/a.md", "whole doc").unwrap();
        assert_eq!(note.file_path, "notes/a.md");

        let record = comment_on_highlight(&mut state, dir.path(), "notes/a.md", 2, "c").unwrap();
        remove_highlight(&mut state, "notes/a.md", &record.id).unwrap();

        let listed = list_annotations(&state, "notes/a.md");
        assert!(listed.highlights.is_empty());
        assert_eq!(listed.file_comments.len(), 1);
    }
}
