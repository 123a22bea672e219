use std::path::PathBuf;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::repository;
use crate::error::AppError;
use crate::services::annotation_service::DEFAULT_PARAGRAPH_CACHE_CAPACITY;

const EXCLUDE_RULES_KEY: &str = "exclude_rules";
const CACHE_CAPACITY_KEY: &str = "paragraph_cache_capacity";
const EXTENSIONS_KEY: &str = "extensions";

/// Settings handed explicitly to the store, exclusion filter and scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighlightSettings {
    /// One exclude rule per line.
    pub exclude_rules: String,
    pub paragraph_cache_capacity: usize,
    /// Document extensions considered by a directory scan, without the dot.
    pub extensions: Vec<String>,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            exclude_rules: String::new(),
            paragraph_cache_capacity: DEFAULT_PARAGRAPH_CACHE_CAPACITY,
            extensions: vec!["md".to_string()],
        }
    }
}

pub fn load_settings(conn: &Connection) -> Result<HighlightSettings, AppError> {
    let mut settings = HighlightSettings::default();

    if let Some(rules) = repository::get_setting(conn, EXCLUDE_RULES_KEY)? {
        settings.exclude_rules = rules;
    }

    if let Some(raw) = repository::get_setting(conn, CACHE_CAPACITY_KEY)? {
        match raw.trim().parse::<usize>() {
            Ok(capacity) if capacity > 0 => settings.paragraph_cache_capacity = capacity,
            _ => warn!(value = %raw, "invalid paragraph cache capacity, using default"),
        }
    }

    if let Some(raw) = repository::get_setting(conn, EXTENSIONS_KEY)? {
        let extensions: Vec<String> = raw
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        if !extensions.is_empty() {
            settings.extensions = extensions;
        }
    }

    Ok(settings)
}

pub fn save_settings(conn: &Connection, settings: &HighlightSettings) -> Result<(), AppError> {
    repository::set_setting(conn, EXCLUDE_RULES_KEY, &settings.exclude_rules)?;
    repository::set_setting(
        conn,
        CACHE_CAPACITY_KEY,
        &settings.paragraph_cache_capacity.to_string(),
    )?;
    repository::set_setting(conn, EXTENSIONS_KEY, &settings.extensions.join(","))?;
    Ok(())
}

/// `<data dir>/marginalia.db` for the current user.
pub fn default_database_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "marginalia")
        .map(|dirs| dirs.data_dir().join("marginalia.db"))
}
