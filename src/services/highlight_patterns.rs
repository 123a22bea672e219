//! The three textual encodings a highlight can take, compiled into one ordered
//! alternation: `==text==`, `<mark ...>text</mark>` and
//! `<span style="background-color: ...">text</span>`.
//!
//! Alternatives are tried left to right at each scan position, so when two
//! encodings could start at the same offset the delimiter pair wins over mark,
//! and mark wins over span.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::highlight::HighlightKind;

/// `rgba(r, g, b, a)`, `#rgb`/`#rgba`/`#rrggbb`/`#rrggbbaa`, or `var(--name)`.
const COLOR: &str = r"rgba\(\s*\d+\s*,\s*\d+\s*,\s*\d+\s*,\s*(?:\d+(?:\.\d+)?|\.\d+)\s*\)|#(?:[0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{4}|[0-9a-fA-F]{3})|var\(--[A-Za-z0-9_-]+\)";

static HIGHLIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        concat!(
            r#"==(?P<delimiter>.*?)=="#,
            r#"|<mark(?:\s+class="[^"]*")?"#,
            r#"(?:\s+style="\s*background(?:-color)?\s*:\s*(?P<mark_color>{color})\s*;?\s*")?"#,
            r#"(?:\s+class="[^"]*")?\s*>(?P<mark>.*?)</mark>"#,
            r#"|<span\s+style="\s*background(?:-color)?\s*:\s*(?P<span_color>{color})\s*;?\s*"\s*>\s*(?P<span>.*?)\s*</span>"#,
        ),
        color = COLOR
    );
    Regex::new(&pattern).expect("highlight pattern must compile")
});

/// Inner-text groups in the order they are consulted.
const TEXT_GROUPS: [(&str, HighlightKind); 3] = [
    ("delimiter", HighlightKind::Delimiter),
    ("mark", HighlightKind::Mark),
    ("span", HighlightKind::Span),
];

const COLOR_GROUPS: [&str; 2] = ["mark_color", "span_color"];

/// One match of the combined pattern, before trimming or deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch<'t> {
    pub kind: HighlightKind,
    /// Untrimmed inner text.
    pub text: &'t str,
    pub color: Option<&'t str>,
    /// Byte range of the whole match, markup included.
    pub span: Range<usize>,
}

impl<'t> RawMatch<'t> {
    pub fn full_match<'a>(&self, haystack: &'a str) -> &'a str {
        &haystack[self.span.clone()]
    }
}

/// Iterates the highlight matches in `text`, left to right.
///
/// Matches whose inner text is empty in every alternative are skipped here;
/// whitespace-only text is left for the caller to reject after trimming.
pub fn matches(text: &str) -> impl Iterator<Item = RawMatch<'_>> {
    HIGHLIGHT_RE.captures_iter(text).filter_map(resolve)
}

fn resolve<'t>(caps: Captures<'t>) -> Option<RawMatch<'t>> {
    let whole = caps.get(0)?;
    let (kind, text) = TEXT_GROUPS.iter().find_map(|(name, kind)| {
        caps.name(name)
            .filter(|m| !m.as_str().is_empty())
            .map(|m| (*kind, m.as_str()))
    })?;
    let color = COLOR_GROUPS
        .iter()
        .find_map(|name| caps.name(name))
        .map(|m| m.as_str());

    Some(RawMatch {
        kind,
        text,
        color,
        span: whole.range(),
    })
}
