use crate::models::highlight::HighlightOccurrence;
use crate::services::highlight_patterns::{self, RawMatch};

/// Two matches closer than this (in characters) with identical text are treated as
/// the same highlight.
// TODO: tighten to exact position equality.
const DUPLICATE_WINDOW: usize = 10;

/// True as soon as one encoding matches with non-blank text.
pub fn has_highlights(text: &str) -> bool {
    highlight_patterns::matches(text).any(|m| !m.text.trim().is_empty())
}

/// Scans `text` and returns its highlights sorted by position.
pub fn extract_highlights(text: &str) -> Vec<HighlightOccurrence> {
    let mut cursor = CharCursor::new(text);
    let mut accepted: Vec<HighlightOccurrence> = Vec::new();

    for raw in highlight_patterns::matches(text) {
        let trimmed = raw.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (position, last_newline) = cursor.advance_to(raw.span.start);
        if is_duplicate(&accepted, position, trimmed) {
            continue;
        }

        accepted.push(occurrence(text, &raw, trimmed, position, last_newline));
    }

    accepted.sort_by_key(|o| o.position);
    accepted
}

fn is_duplicate(accepted: &[HighlightOccurrence], position: usize, text: &str) -> bool {
    accepted
        .iter()
        .any(|o| o.position.abs_diff(position) < DUPLICATE_WINDOW && o.text == text)
}

fn occurrence(
    haystack: &str,
    raw: &RawMatch<'_>,
    text: &str,
    position: usize,
    last_newline: Option<usize>,
) -> HighlightOccurrence {
    let paragraph_offset = match last_newline {
        Some(newline) => position - newline,
        None => position,
    };

    HighlightOccurrence {
        id: uuid::Uuid::new_v4().to_string(),
        kind: raw.kind,
        text: text.to_string(),
        position,
        paragraph_offset,
        background_color: raw.color.map(str::to_string),
        original_length: raw.full_match(haystack).chars().count(),
    }
}

/// Converts increasing byte offsets into character offsets, remembering the most
/// recent newline seen.
struct CharCursor<'t> {
    text: &'t str,
    byte: usize,
    chars: usize,
    last_newline: Option<usize>,
}

impl<'t> CharCursor<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
            last_newline: None,
        }
    }

    fn advance_to(&mut self, byte: usize) -> (usize, Option<usize>) {
        for ch in self.text[self.byte..byte].chars() {
            if ch == '\n' {
                self.last_newline = Some(self.chars);
            }
            self.chars += 1;
        }
        self.byte = byte;
        (self.chars, self.last_newline)
    }
}
