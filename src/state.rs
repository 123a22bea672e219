use std::path::Path;

use crate::config::{self, HighlightSettings};
use crate::error::AppError;
use crate::services::annotation_service::AnnotationStore;
use crate::services::storage_service::SqliteStorage;

/// Store and settings sharing one database.
pub struct AppState {
    pub store: AnnotationStore<SqliteStorage>,
    pub settings: HighlightSettings,
}

impl AppState {
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        Self::from_storage(SqliteStorage::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::from_storage(SqliteStorage::open_in_memory()?)
    }

    fn from_storage(storage: SqliteStorage) -> Result<Self, AppError> {
        let settings = config::load_settings(storage.connection())?;
        let mut store =
            AnnotationStore::with_cache_capacity(storage, settings.paragraph_cache_capacity);
        store.load();
        Ok(Self { store, settings })
    }

    pub fn save_settings(&mut self, settings: HighlightSettings) -> Result<(), AppError> {
        config::save_settings(self.store.storage().connection(), &settings)?;
        self.settings = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopening_restores_store_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("marginalia.db");

        {
            let mut state = AppState::open(&db_path).unwrap();
            state
                .save_settings(HighlightSettings {
                    exclude_rules: "drafts".to_string(),
                    paragraph_cache_capacity: 7,
                    ..HighlightSettings::default()
                })
                .unwrap();
            state.store.add_file_comment("a.md", "remember").unwrap();
        }

        let state = AppState::open(&db_path).unwrap();
        assert_eq!(state.settings.exclude_rules, "drafts");
        assert_eq!(state.store.cache_capacity(), 7);
        assert_eq!(state.store.get_file_comments("a.md")[0].content, "remember");
    }

    #[test]
    fn in_memory_state_starts_empty() {
        let state = AppState::open_in_memory().unwrap();
        assert!(state.store.document_paths().is_empty());
        assert_eq!(state.settings, HighlightSettings::default());
    }
}
