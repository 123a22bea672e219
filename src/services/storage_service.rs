use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::debug;

use crate::data::{self, migrations, repository};
use crate::error::AppError;
use crate::models::annotations::StoredAnnotations;

const ANNOTATIONS_KEY: &str = "annotations";

/// Durable home of the annotation blob. `save` must replace the whole blob in one
/// write; `load` returns `None` when nothing has been saved yet.
pub trait AnnotationStorage {
    fn load(&self) -> Result<Option<StoredAnnotations>, AppError>;
    fn save(&mut self, data: &StoredAnnotations) -> Result<(), AppError>;
}

/// Stores the blob as one row of the `plugin_data` table.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        Ok(Self {
            conn: data::open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, AppError> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl AnnotationStorage for SqliteStorage {
    fn load(&self) -> Result<Option<StoredAnnotations>, AppError> {
        repository::get_plugin_data(&self.conn, ANNOTATIONS_KEY)?
            .map(|raw| serde_json::from_str(&raw).map_err(AppError::from))
            .transpose()
    }

    fn save(&mut self, data: &StoredAnnotations) -> Result<(), AppError> {
        let raw = serde_json::to_string(data)?;
        repository::set_plugin_data(&self.conn, ANNOTATIONS_KEY, &raw)?;
        debug!(bytes = raw.len(), "annotations saved to sqlite");
        Ok(())
    }
}

/// Stores the blob as a JSON file, replaced by atomic rename on every save.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnnotationStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<StoredAnnotations>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&mut self, data: &StoredAnnotations) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, data)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!(path = %self.path.display(), "annotations saved to file");
        Ok(())
    }
}

/// Keeps the blob in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Option<StoredAnnotations>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoredAnnotations) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Makes every following `save` fail, leaving the last saved blob untouched.
    pub fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn data(&self) -> Option<&StoredAnnotations> {
        self.data.as_ref()
    }
}

impl AnnotationStorage for MemoryStorage {
    fn load(&self) -> Result<Option<StoredAnnotations>, AppError> {
        Ok(self.data.clone())
    }

    fn save(&mut self, data: &StoredAnnotations) -> Result<(), AppError> {
        if self.fail_saves {
            return Err(AppError::Storage("memory storage rejected the write".to_string()));
        }
        self.data = Some(data.clone());
        self.saves += 1;
        Ok(())
    }
}
