/// Store open and validation utilities.
///
/// The store is an SQLite file pre-initialized by the external data
/// manager; this service only appends. Opening validates that the expected
/// tables exist so a misconfigured deployment fails at startup with a clear
/// message instead of failing on the first write.

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Name of the GPS table. Fixed by the shared store layout; only the
/// measurement table name is configurable.
pub const GPS_TABLE: &str = "gps";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "database file {0} does not exist.\n  \
         Initialize the store with locness-datamanager first."
    )]
    MissingDatabase(String),

    #[error("failed to open database {path}: {source}")]
    OpenFailed {
        path: String,
        source: rusqlite::Error,
    },

    #[error(
        "required table '{0}' is missing or unreadable.\n  \
         Initialize the store with locness-datamanager first."
    )]
    MissingTable(String),

    #[error("table name '{0}' is not a valid identifier")]
    InvalidTableName(String),
}

/// Table names are interpolated into SQL, so restrict them to identifier
/// characters.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

/// Opens the store and verifies the measurement table exists, plus the GPS
/// table when GPS is enabled.
pub fn open_and_verify(
    path: &Path,
    measurement_table: &str,
    gps_enabled: bool,
) -> Result<Connection, StoreError> {
    validate_table_name(measurement_table)?;

    if !path.exists() {
        return Err(StoreError::MissingDatabase(path.display().to_string()));
    }

    let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
        path: path.display().to_string(),
        source: e,
    })?;

    verify_table(&conn, measurement_table)?;
    if gps_enabled {
        verify_table(&conn, GPS_TABLE)?;
    }

    Ok(conn)
}

/// Probes for the table. Preparing the statement succeeds on an empty
/// table but fails when the table is absent.
fn verify_table(conn: &Connection, table: &str) -> Result<(), StoreError> {
    conn.prepare(&format!("SELECT 1 FROM {} LIMIT 1", table))
        .map(|_| ())
        .map_err(|_| StoreError::MissingTable(table.to_string()))
}
