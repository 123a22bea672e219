use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

use crate::scope_path;

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Exclude rules parsed from a multi-line settings blob.
///
/// Each non-blank line (trimmed) is one rule. Lines containing a glob character are
/// matched with gitignore glob semantics; all other lines match the exact path or
/// anything beneath it as a directory prefix. Matching is case-sensitive.
#[derive(Debug)]
pub struct ExclusionFilter {
    prefixes: Vec<String>,
    globs: Option<Gitignore>,
}

impl ExclusionFilter {
    pub fn parse(rule_text: &str) -> Self {
        let mut prefixes = Vec::new();
        let mut builder = GitignoreBuilder::new("/");
        let mut glob_count = 0usize;

        for line in rule_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.contains(GLOB_CHARS) {
                match builder.add_line(None, line) {
                    Ok(_) => glob_count += 1,
                    Err(e) => warn!(rule = line, "ignoring invalid exclude rule: {e}"),
                }
            } else {
                prefixes.push(scope_path::normalize(line));
            }
        }

        let globs = if glob_count == 0 {
            None
        } else {
            match builder.build() {
                Ok(globs) => Some(globs),
                Err(e) => {
                    warn!("failed to compile exclude globs: {e}");
                    None
                }
            }
        };

        Self { prefixes, globs }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.globs.is_none()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        let path = scope_path::normalize(path);

        if self
            .prefixes
            .iter()
            .any(|prefix| scope_path::is_within_scope(&path, prefix))
        {
            return true;
        }

        let Some(globs) = &self.globs else {
            return false;
        };
        globs.matched_path_or_any_parents(&path, false).is_ignore()
    }
}

/// Whether the document at `path` takes part in highlight extraction.
pub fn should_process_document(path: &str, exclude_rules: &str) -> bool {
    !ExclusionFilter::parse(exclude_rules).is_excluded(path)
}
