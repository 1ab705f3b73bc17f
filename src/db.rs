//! SQLite workspace: schema creation and small catalog helpers.

use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;
use tracing::debug;

use crate::error::LoadError;

/// Opens (creating if needed) the database file and ensures the base schema.
pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    init_schema(&conn)?;
    debug!(path = %path.display(), "Database ready");
    Ok(conn)
}

/// Creates the four source tables and their indexes.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS airlines(
            airline_id INTEGER PRIMARY KEY,
            name TEXT,
            alias TEXT,
            iata TEXT,
            icao TEXT,
            callsign TEXT,
            country TEXT,
            active CHAR(1)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS airports(
            airport_id INTEGER PRIMARY KEY,
            name TEXT,
            city TEXT,
            country TEXT,
            iata TEXT,
            icao TEXT,
            latitude REAL,
            longitude REAL,
            altitude_ft INTEGER,
            timezone_utc_offset REAL,
            dst TEXT,
            tz_database TEXT,
            type TEXT,
            source TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS airline_routes(
            route_id INTEGER PRIMARY KEY AUTOINCREMENT,
            airline_code TEXT,
            airline_id INTEGER,
            source_airport_code TEXT,
            source_airport_id INTEGER,
            dest_airport_code TEXT,
            dest_airport_id INTEGER,
            codeshare BOOLEAN NOT NULL DEFAULT 0,
            stops INTEGER,
            equipment TEXT
        )",
        [],
    )?;
    // NULLs are distinct in a plain UNIQUE constraint, so the natural key is
    // indexed over null-substituted expressions.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS airline_routes_uk ON airline_routes(
            IFNULL(airline_code, ''),
            IFNULL(airline_id, -1),
            IFNULL(source_airport_code, ''),
            IFNULL(source_airport_id, -1),
            IFNULL(dest_airport_code, ''),
            IFNULL(dest_airport_id, -1),
            codeshare,
            IFNULL(stops, -1),
            IFNULL(equipment, '')
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routes_source ON airline_routes(source_airport_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_routes_dest ON airline_routes(dest_airport_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS aircraft(
            aircraft_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            iata_code TEXT,
            icao_code TEXT,
            seat_capacity INTEGER,
            cargo_amount_cuft REAL,
            source_of_capacity TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_aircraft_icao ON aircraft(icao_code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_aircraft_iata ON aircraft(iata_code)",
        [],
    )?;

    Ok(())
}

/// Accepts only plain SQL identifiers (letters, digits, underscore).
pub fn validate_identifier(name: &str) -> Result<&str, LoadError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(LoadError::InvalidIdentifier(name.to_string()))
    }
}

pub fn table_exists(conn: &Connection, table: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", validate_identifier(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Adds `column` to `table` unless it is already present.
///
/// Returns `true` when the column was created.
pub fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    declaration: &str,
) -> anyhow::Result<bool> {
    if table_has_column(conn, table, column)? {
        return Ok(false);
    }
    conn.execute(
        &format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            validate_identifier(table)?,
            validate_identifier(column)?,
            declaration
        ),
        [],
    )?;
    debug!(table, column, "Column added");
    Ok(true)
}

/// Row count of `table`.
pub fn table_len(conn: &Connection, table: &str) -> anyhow::Result<i64> {
    let table = validate_identifier(table)?;
    let count = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .with_context(|| format!("failed to count rows of `{table}`"))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_init_schema_is_repeatable() {
        let conn = memory_db();
        init_schema(&conn).unwrap();
        assert!(table_exists(&conn, "airline_routes").unwrap());
        assert!(!table_exists(&conn, "asia_report").unwrap());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("operational_airlines").is_ok());
        assert!(validate_identifier("_t1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("airlines; DROP TABLE airports").is_err());
    }

    #[test]
    fn test_ensure_column_only_once() {
        let conn = memory_db();
        assert!(ensure_column(&conn, "airports", "inbound_count", "INTEGER DEFAULT 0").unwrap());
        assert!(!ensure_column(&conn, "airports", "inbound_count", "INTEGER DEFAULT 0").unwrap());
        assert!(table_has_column(&conn, "airports", "inbound_count").unwrap());
    }

    #[test]
    fn test_table_len() {
        let conn = memory_db();
        conn.execute("INSERT INTO airlines(airline_id, name) VALUES (1, 'A'), (2, 'B')", [])
            .unwrap();
        assert_eq!(table_len(&conn, "airlines").unwrap(), 2);
        assert!(table_len(&conn, "missing_table").is_err());
        assert!(table_len(&conn, "airlines--").is_err());
    }

    #[test]
    fn test_open_db_creates_parent_dir() {
        let dir = std::env::temp_dir().join(format!("airdata_test_open_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("airdata.sqlite3");

        let conn = open_db(&path).unwrap();
        assert!(table_exists(&conn, "airlines").unwrap());
        drop(conn);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
