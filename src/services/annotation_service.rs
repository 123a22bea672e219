//! Persistent store of highlight comments and document-level comments.
//!
//! Every mutation rewrites the whole blob through the [`AnnotationStorage`]
//! before returning. Operations that name a missing document, highlight or
//! comment are silent no-ops. Single caller only: nothing here is locked.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::annotations::StoredAnnotations;
use crate::models::file_comment::FileComment;
use crate::models::highlight::{CommentItem, HighlightComment};
use crate::models::next_timestamp;
use crate::services::block_id_service::{self, BlockIdAllocator};
use crate::services::storage_service::AnnotationStorage;

pub use crate::services::block_id_service::derive_block_id;

pub const DEFAULT_PARAGRAPH_CACHE_CAPACITY: usize = 100;

pub struct AnnotationStore<S: AnnotationStorage> {
    storage: S,
    /// Document path -> records in insertion order. Ids are unique per document.
    highlights: HashMap<String, Vec<HighlightComment>>,
    file_comments: HashMap<String, Vec<FileComment>>,
    /// Paragraph id -> comments, evicting the oldest insertion once full.
    paragraph_cache: LruCache<String, Vec<HighlightComment>>,
    allocator: Option<Box<dyn BlockIdAllocator>>,
}

impl<S: AnnotationStorage> AnnotationStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_cache_capacity(storage, DEFAULT_PARAGRAPH_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(storage: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            storage,
            highlights: HashMap::new(),
            file_comments: HashMap::new(),
            paragraph_cache: LruCache::new(capacity),
            allocator: None,
        }
    }

    /// Installs the host capability used to derive paragraph ids.
    pub fn set_block_id_allocator(&mut self, allocator: Box<dyn BlockIdAllocator>) {
        self.allocator = Some(allocator);
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replaces in-memory state with what the storage holds. A missing or unreadable
    /// blob leaves the store empty.
    pub fn load(&mut self) {
        self.highlights.clear();
        self.file_comments.clear();
        self.paragraph_cache.clear();

        let stored = match self.storage.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!("no stored annotations, starting empty");
                return;
            }
            Err(e) => {
                warn!("failed to load annotations, starting empty: {e}");
                return;
            }
        };

        for (path, records) in stored.comments {
            let mut list: Vec<HighlightComment> = records
                .into_iter()
                .map(|(key, mut record)| {
                    if record.id.is_empty() {
                        record.id = key;
                    }
                    record
                })
                .collect();
            if list.is_empty() {
                continue;
            }
            list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            self.highlights.insert(path, list);
        }

        for (path, comments) in stored.file_comments {
            if !comments.is_empty() {
                self.file_comments.insert(path, comments);
            }
        }

        info!(
            documents = self.highlights.len(),
            file_comment_documents = self.file_comments.len(),
            "annotations loaded"
        );
    }

    /// Writes both mappings as one blob.
    pub fn save(&mut self) -> Result<(), AppError> {
        let stored = self.snapshot();
        self.storage.save(&stored)
    }

    fn snapshot(&self) -> StoredAnnotations {
        let comments = self
            .highlights
            .iter()
            .map(|(path, records)| {
                let by_id: BTreeMap<String, HighlightComment> = records
                    .iter()
                    .map(|record| (record.id.clone(), record.clone()))
                    .collect();
                (path.clone(), by_id)
            })
            .collect();
        let file_comments = self
            .file_comments
            .iter()
            .map(|(path, comments)| (path.clone(), comments.clone()))
            .collect();

        StoredAnnotations {
            comments,
            file_comments,
        }
    }

    /// Virtual highlights first in insertion order, then the rest by position.
    pub fn get_highlights_for_document(&self, path: &str) -> Vec<HighlightComment> {
        let mut list = self.highlights.get(path).cloned().unwrap_or_default();
        list.sort_by(|a, b| match (a.is_virtual, b.is_virtual) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => a.position.cmp(&b.position),
        });
        list
    }

    pub fn get_highlight(&self, path: &str, highlight_id: &str) -> Option<&HighlightComment> {
        self.highlights
            .get(path)?
            .iter()
            .find(|record| record.id == highlight_id)
    }

    pub fn get_file_comments(&self, path: &str) -> &[FileComment] {
        self.file_comments
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every document path with at least one highlight or file comment, sorted.
    pub fn document_paths(&self) -> Vec<String> {
        let paths: BTreeSet<&String> = self
            .highlights
            .keys()
            .chain(self.file_comments.keys())
            .collect();
        paths.into_iter().cloned().collect()
    }

    /// Stores `highlight` under its id, replacing any record with the same id.
    /// Non-virtual highlights without a paragraph id get one from the installed
    /// allocator, or a synthesized one when no editor can resolve it.
    pub fn add_highlight(
        &mut self,
        path: &str,
        highlight: HighlightComment,
    ) -> Result<(), AppError> {
        let allocator = self
            .allocator
            .as_deref_mut()
            .map(|allocator| allocator as &mut dyn BlockIdAllocator);
        let highlight = resolve_paragraph_id(path, highlight, allocator);
        self.insert_highlight(path, highlight)
    }

    /// Like [`Self::add_highlight`], deriving the paragraph id through `allocator`.
    pub fn add_highlight_with(
        &mut self,
        path: &str,
        highlight: HighlightComment,
        allocator: &mut dyn BlockIdAllocator,
    ) -> Result<(), AppError> {
        let highlight = resolve_paragraph_id(path, highlight, Some(allocator));
        self.insert_highlight(path, highlight)
    }

    fn insert_highlight(
        &mut self,
        path: &str,
        highlight: HighlightComment,
    ) -> Result<(), AppError> {
        self.invalidate_paragraph(highlight.paragraph_id.as_deref());

        let records = self.highlights.entry(path.to_string()).or_default();
        let previous = match records.iter_mut().find(|record| record.id == highlight.id) {
            Some(existing) => Some(std::mem::replace(existing, highlight)),
            None => {
                records.push(highlight);
                None
            }
        };
        if let Some(previous) = previous {
            self.invalidate_paragraph(previous.paragraph_id.as_deref());
        }

        self.save()
    }

    pub fn add_file_comment(&mut self, path: &str, content: &str) -> Result<FileComment, AppError> {
        let comment = FileComment::new(path, content);
        self.file_comments
            .entry(path.to_string())
            .or_default()
            .push(comment.clone());
        self.save()?;
        Ok(comment)
    }

    pub fn add_comment_to_highlight(
        &mut self,
        path: &str,
        highlight_id: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let Some(record) = self.highlight_mut(path, highlight_id) else {
            debug!(path, highlight_id, "comment target not found");
            return Ok(());
        };

        record.comments.push(CommentItem::new(content));
        record.touch();
        let paragraph_id = record.paragraph_id.clone();

        self.invalidate_paragraph(paragraph_id.as_deref());
        self.save()
    }

    pub fn update_highlight_comment(
        &mut self,
        path: &str,
        highlight_id: &str,
        comment_id: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let Some(record) = self.highlight_mut(path, highlight_id) else {
            return Ok(());
        };
        let Some(comment) = record.comments.iter_mut().find(|c| c.id == comment_id) else {
            return Ok(());
        };

        comment.content = content.to_string();
        comment.updated_at = next_timestamp(comment.updated_at);
        record.touch();
        let paragraph_id = record.paragraph_id.clone();

        self.invalidate_paragraph(paragraph_id.as_deref());
        self.save()
    }

    pub fn update_file_comment(
        &mut self,
        path: &str,
        comment_id: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let Some(comment) = self
            .file_comments
            .get_mut(path)
            .and_then(|comments| comments.iter_mut().find(|c| c.id == comment_id))
        else {
            return Ok(());
        };

        comment.content = content.to_string();
        comment.updated_at = next_timestamp(comment.updated_at);
        self.save()
    }

    pub fn remove_highlight(&mut self, path: &str, highlight_id: &str) -> Result<(), AppError> {
        let Some(records) = self.highlights.get_mut(path) else {
            return Ok(());
        };
        let Some(index) = records.iter().position(|record| record.id == highlight_id) else {
            return Ok(());
        };

        let removed = records.remove(index);
        if records.is_empty() {
            self.highlights.remove(path);
        }

        self.invalidate_paragraph(removed.paragraph_id.as_deref());
        self.save()
    }

    pub fn delete_file_comment(&mut self, path: &str, comment_id: &str) -> Result<(), AppError> {
        let Some(comments) = self.file_comments.get_mut(path) else {
            return Ok(());
        };
        let before = comments.len();
        comments.retain(|c| c.id != comment_id);
        if comments.len() == before {
            return Ok(());
        }
        if comments.is_empty() {
            self.file_comments.remove(path);
        }

        self.save()
    }

    /// Drops every document not in `live_paths` from both mappings. Saves only when
    /// something was removed; returns the number of document keys dropped.
    pub fn cleanup(&mut self, live_paths: &HashSet<String>) -> Result<usize, AppError> {
        let stale_highlights: Vec<String> = self
            .highlights
            .keys()
            .filter(|path| !live_paths.contains(*path))
            .cloned()
            .collect();
        let stale_file_comments: Vec<String> = self
            .file_comments
            .keys()
            .filter(|path| !live_paths.contains(*path))
            .cloned()
            .collect();

        let removed = stale_highlights.len() + stale_file_comments.len();
        if removed == 0 {
            return Ok(0);
        }

        for path in &stale_highlights {
            if let Some(records) = self.highlights.remove(path) {
                for record in &records {
                    self.invalidate_paragraph(record.paragraph_id.as_deref());
                }
            }
            info!(path = %path, "removed highlights for missing document");
        }
        for path in &stale_file_comments {
            self.file_comments.remove(path);
            info!(path = %path, "removed file comments for missing document");
        }

        self.save()?;
        Ok(removed)
    }

    /// Moves both mappings from `old_path` to `new_path`, rewriting the file path
    /// stored on each file comment.
    pub fn rename_document(&mut self, old_path: &str, new_path: &str) -> Result<(), AppError> {
        if old_path == new_path {
            return Ok(());
        }
        let records = self.highlights.remove(old_path);
        let comments = self.file_comments.remove(old_path);
        if records.is_none() && comments.is_none() {
            return Ok(());
        }

        if let Some(records) = records {
            self.highlights
                .entry(new_path.to_string())
                .or_default()
                .extend(records);
        }
        if let Some(comments) = comments {
            self.file_comments
                .entry(new_path.to_string())
                .or_default()
                .extend(comments.into_iter().map(|mut c| {
                    c.file_path = new_path.to_string();
                    c
                }));
        }

        self.paragraph_cache.clear();
        self.save()
    }

    /// Moves every non-virtual highlight of `path` at or after `from` by `delta`
    /// characters, after text of that length was inserted (or removed) before it.
    /// Returns how many records moved.
    pub fn shift_positions(
        &mut self,
        path: &str,
        from: usize,
        delta: isize,
    ) -> Result<usize, AppError> {
        if delta == 0 {
            return Ok(0);
        }
        let Some(records) = self.highlights.get_mut(path) else {
            return Ok(0);
        };

        let mut touched = Vec::new();
        for record in records
            .iter_mut()
            .filter(|record| !record.is_virtual && record.position >= from)
        {
            record.position = record.position.saturating_add_signed(delta);
            touched.push(record.paragraph_id.clone());
        }
        if touched.is_empty() {
            return Ok(0);
        }

        for paragraph_id in &touched {
            self.invalidate_paragraph(paragraph_id.as_deref());
        }
        debug!(path, from, delta, moved = touched.len(), "shifted highlight positions");
        self.save()?;
        Ok(touched.len())
    }

    pub fn get_comments_by_paragraph(
        &self,
        path: &str,
        paragraph_id: &str,
    ) -> Vec<HighlightComment> {
        let mut list: Vec<HighlightComment> = self
            .highlights
            .get(path)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| record.paragraph_id.as_deref() == Some(paragraph_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        list.sort_by_key(|record| record.position);
        list
    }

    pub fn has_paragraph_comments(&self, path: &str, paragraph_id: &str) -> bool {
        self.highlights.get(path).is_some_and(|records| {
            records
                .iter()
                .any(|record| record.paragraph_id.as_deref() == Some(paragraph_id))
        })
    }

    /// Recomputes the cached comments of each paragraph in `paragraph_ids`.
    pub fn refresh_visible_paragraph_cache<I, P>(&mut self, path: &str, paragraph_ids: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for paragraph_id in paragraph_ids {
            let paragraph_id = paragraph_id.as_ref();
            let comments = self.get_comments_by_paragraph(path, paragraph_id);
            // Re-inserting moves the entry to the newest slot; the cache drops the
            // oldest one when it is full.
            self.paragraph_cache.put(paragraph_id.to_string(), comments);
        }
    }

    pub fn cached_paragraph_comments(&self, paragraph_id: &str) -> Option<&[HighlightComment]> {
        self.paragraph_cache.peek(paragraph_id).map(Vec::as_slice)
    }

    pub fn cache_len(&self) -> usize {
        self.paragraph_cache.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.paragraph_cache.cap().get()
    }

    pub fn clear_all(&mut self) -> Result<(), AppError> {
        self.highlights.clear();
        self.file_comments.clear();
        self.paragraph_cache.clear();
        self.save()
    }

    fn highlight_mut(&mut self, path: &str, highlight_id: &str) -> Option<&mut HighlightComment> {
        self.highlights
            .get_mut(path)?
            .iter_mut()
            .find(|record| record.id == highlight_id)
    }

    fn invalidate_paragraph(&mut self, paragraph_id: Option<&str>) {
        if let Some(paragraph_id) = paragraph_id {
            self.paragraph_cache.pop(paragraph_id);
        }
    }
}

fn resolve_paragraph_id(
    path: &str,
    mut highlight: HighlightComment,
    allocator: Option<&mut dyn BlockIdAllocator>,
) -> HighlightComment {
    if highlight.is_virtual || highlight.paragraph_id.is_some() {
        return highlight;
    }

    let derived = allocator.and_then(|allocator| allocator.allocate(path, highlight.position));
    let paragraph_id = derived.unwrap_or_else(|| {
        debug!(path, position = highlight.position, "no editor block, synthesizing paragraph id");
        block_id_service::synthesized_paragraph_id(path)
    });
    highlight.paragraph_id = Some(paragraph_id);
    highlight
}
