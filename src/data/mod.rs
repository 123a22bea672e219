pub mod migrations;
pub mod repository;

use rusqlite::Connection;
use std::path::Path;

use crate::error::AppError;

/// Opens (creating if needed) the database at `path` with the schema applied.
pub fn open_database(path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
