//! Paragraph identity for highlights.
//!
//! A paragraph id is the document path plus a block marker (`path#^abc123`). The
//! marker lives at the end of the line in the document itself, so allocating a
//! new one means editing the host's buffer. That edit goes through
//! [`EditorContext`]; the store only sees the [`BlockIdAllocator`] capability.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::now_millis;

static BLOCK_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\^([A-Za-z0-9-]+)\s*$").expect("block marker pattern"));

const BLOCK_ID_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIdDerivation {
    pub block_id: String,
    /// Text to append to the line when the id is new, `None` when reused.
    pub marker_to_append: Option<String>,
}

/// Reuses the block marker already ending `line_text`, or makes a new one.
pub fn derive_block_id(line_text: &str) -> BlockIdDerivation {
    if let Some(caps) = BLOCK_MARKER_RE.captures(line_text) {
        return BlockIdDerivation {
            block_id: caps[1].to_string(),
            marker_to_append: None,
        };
    }

    let block_id = uuid::Uuid::new_v4().simple().to_string()[..BLOCK_ID_LEN].to_string();
    BlockIdDerivation {
        marker_to_append: Some(format!(" ^{block_id}")),
        block_id,
    }
}

pub fn paragraph_id(path: &str, block_id: &str) -> String {
    format!("{path}#^{block_id}")
}

/// Fallback when no editor can address the paragraph.
pub fn synthesized_paragraph_id(path: &str) -> String {
    format!("{path}#{}", now_millis())
}

/// Line addressing over the host's open document. Offsets are in characters.
pub trait EditorContext {
    fn line_at_offset(&self, offset: usize) -> Option<usize>;
    fn line_text(&self, line: usize) -> Option<String>;
    fn set_line_text(&mut self, line: usize, text: &str);
}

/// Resolves the paragraph id for a highlight at `position` in `path`.
/// Returning `None` makes the store fall back to a synthesized id.
pub trait BlockIdAllocator {
    fn allocate(&mut self, path: &str, position: usize) -> Option<String>;
}

/// Allocates ids by reading and, when needed, marking lines through an editor.
pub struct EditorBlockIdAllocator<E> {
    editor: E,
}

impl<E: EditorContext> EditorBlockIdAllocator<E> {
    pub fn new(editor: E) -> Self {
        Self { editor }
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn into_editor(self) -> E {
        self.editor
    }
}

impl<E: EditorContext> BlockIdAllocator for EditorBlockIdAllocator<E> {
    fn allocate(&mut self, path: &str, position: usize) -> Option<String> {
        let line = self.editor.line_at_offset(position)?;
        let text = self.editor.line_text(line)?;
        let derivation = derive_block_id(&text);
        if let Some(marker) = &derivation.marker_to_append {
            self.editor.set_line_text(line, &append_marker(&text, marker));
        }
        Some(paragraph_id(path, &derivation.block_id))
    }
}

/// Appends `marker` after the line's content, keeping a trailing `\r`.
fn append_marker(line: &str, marker: &str) -> String {
    let (content, ending) = match line.strip_suffix('\r') {
        Some(content) => (content, "\r"),
        None => (line, ""),
    };
    let content = content.trim_end_matches([' ', '\t']);
    format!("{content}{marker}{ending}")
}

/// An [`EditorContext`] over a plain text buffer, for hosts that edit files
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
    modified: bool,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            modified: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Character offset where `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line >= self.lines.len() {
            return None;
        }
        Some(
            self.lines[..line]
                .iter()
                .map(|text| text.chars().count() + 1)
                .sum(),
        )
    }
}

impl EditorContext for TextBuffer {
    fn line_at_offset(&self, offset: usize) -> Option<usize> {
        let mut start = 0usize;
        for (index, line) in self.lines.iter().enumerate() {
            let end = start + line.chars().count();
            if offset <= end {
                return Some(index);
            }
            start = end + 1;
        }
        None
    }

    fn line_text(&self, line: usize) -> Option<String> {
        self.lines.get(line).cloned()
    }

    fn set_line_text(&mut self, line: usize, text: &str) {
        if let Some(slot) = self.lines.get_mut(line) {
            if slot != text {
                *slot = text.to_string();
                self.modified = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_existing_marker() {
        let derived = derive_block_id("Some paragraph text ^para-1");
        assert_eq!(derived.block_id, "para-1");
        assert!(derived.marker_to_append.is_none());

        let derived = derive_block_id("trailing space ^abc123   ");
        assert_eq!(derived.block_id, "abc123");
    }

    #[test]
    fn synthesizes_marker_when_missing() {
        let derived = derive_block_id("A paragraph without a marker");
        assert_eq!(derived.block_id.len(), BLOCK_ID_LEN);
        assert!(derived.block_id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(
            derived.marker_to_append.as_deref(),
            Some(format!(" ^{}", derived.block_id).as_str())
        );
    }

    #[test]
    fn caret_inside_line_is_not_a_marker() {
        let derived = derive_block_id("x^2 is a square, ok");
        assert!(derived.marker_to_append.is_some());
    }

    #[test]
    fn caret_glued_to_a_word_is_not_a_marker() {
        let derived = derive_block_id("value is x^2");
        assert!(derived.marker_to_append.is_some());
        assert_ne!(derived.block_id, "2");

        assert_eq!(derive_block_id("^solo").block_id, "solo");
        assert_eq!(derive_block_id("tab\t^tabbed").block_id, "tabbed");
    }

    #[test]
    fn marking_keeps_crlf_line_endings() {
        let mut allocator =
            EditorBlockIdAllocator::new(TextBuffer::new("==a== one \t\r\nnext\r\n"));
        let id = allocator.allocate("w.md", 2).unwrap();
        let block = id.strip_prefix("w.md#^").unwrap();

        let text = allocator.into_editor().text();
        assert_eq!(text, format!("==a== one ^{block}\r\nnext\r\n"));
    }

    #[test]
    fn line_start_counts_chars_and_newlines() {
        let buffer = TextBuffer::new("ab\ncdé\n\nlast");
        assert_eq!(buffer.line_start(0), Some(0));
        assert_eq!(buffer.line_start(1), Some(3));
        assert_eq!(buffer.line_start(2), Some(7));
        assert_eq!(buffer.line_start(3), Some(8));
        assert_eq!(buffer.line_start(4), None);
    }

    #[test]
    fn buffer_addresses_lines_by_char_offset() {
        let buffer = TextBuffer::new("ab\ncdé\n\nlast");
        assert_eq!(buffer.line_at_offset(0), Some(0));
        assert_eq!(buffer.line_at_offset(2), Some(0));
        assert_eq!(buffer.line_at_offset(3), Some(1));
        assert_eq!(buffer.line_at_offset(7), Some(2));
        assert_eq!(buffer.line_at_offset(8), Some(3));
        assert_eq!(buffer.line_at_offset(100), None);
    }

    #[test]
    fn allocator_appends_marker_once() {
        let mut allocator = EditorBlockIdAllocator::new(TextBuffer::new("intro\n==hl== body\nend"));
        let first = allocator.allocate("a.md", 8).unwrap();
        assert!(first.starts_with("a.md#^"));
        assert!(allocator.editor().is_modified());

        let line = allocator.editor().line_text(1).unwrap();
        assert!(line.starts_with("==hl== body ^"));

        let second = allocator.allocate("a.md", 10).unwrap();
        assert_eq!(first, second);
        assert_eq!(allocator.into_editor().text().lines().count(), 3);
    }

    #[test]
    fn allocator_reuses_marker_without_editing() {
        let mut allocator = EditorBlockIdAllocator::new(TextBuffer::new("==x== ^keep-me"));
        assert_eq!(allocator.allocate("b.md", 0).as_deref(), Some("b.md#^keep-me"));
        assert!(!allocator.editor().is_modified());
    }

    #[test]
    fn allocator_without_line_returns_none() {
        let mut allocator = EditorBlockIdAllocator::new(TextBuffer::new("short"));
        assert!(allocator.allocate("c.md", 999).is_none());
    }

    #[test]
    fn synthesized_id_is_path_scoped() {
        assert!(synthesized_paragraph_id("d.md").starts_with("d.md#"));
    }
}
