use std::io::Read;

use anyhow::Context;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::LoadError;
use crate::loaders::{LoadSummary, Parsed, dedup_last_wins};
use crate::parser::{Row, read_rows};

/// Airline, Airline ID, Source airport, Source airport ID, Destination
/// airport, Destination airport ID, Codeshare, Stops, Equipment
pub const COLUMNS: usize = 9;

const INSERT_SQL: &str = "
    INSERT INTO airline_routes (
        airline_code,
        airline_id,
        source_airport_code,
        source_airport_id,
        dest_airport_code,
        dest_airport_id,
        codeshare,
        stops,
        equipment
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT DO NOTHING";

/// One route record. All nine fields together form the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    /// IATA or ICAO airline code.
    pub airline_code: Option<String>,
    pub airline_id: Option<i64>,
    pub source_airport_code: Option<String>,
    pub source_airport_id: Option<i64>,
    pub dest_airport_code: Option<String>,
    pub dest_airport_id: Option<i64>,
    pub codeshare: bool,
    pub stops: Option<i64>,
    /// Space separated aircraft type codes.
    pub equipment: Option<String>,
}

impl Route {
    pub fn from_row(row: &Row) -> Result<Self, LoadError> {
        Ok(Route {
            airline_code: row.text(0),
            airline_id: row.int(1)?,
            source_airport_code: row.text(2),
            source_airport_id: row.int(3)?,
            dest_airport_code: row.text(4),
            dest_airport_id: row.int(5)?,
            codeshare: row.flag(6),
            stops: row.int(7)?,
            equipment: row.text(8),
        })
    }
}

pub fn parse_routes<R: Read>(reader: R) -> Result<Parsed<Route>, LoadError> {
    let rows = read_rows(reader, &[COLUMNS])?;
    let rows_read = rows.len();

    let records = rows
        .iter()
        .map(Route::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let (records, duplicates) = dedup_last_wins(records, Route::clone);

    Ok(Parsed {
        records,
        rows_read,
        rows_skipped: duplicates,
    })
}

/// Inserts routes not already present; returns how many were new.
pub fn insert_routes(conn: &Connection, routes: &[Route]) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(INSERT_SQL)?;
        for r in routes {
            written += stmt.execute(params![
                r.airline_code,
                r.airline_id,
                r.source_airport_code,
                r.source_airport_id,
                r.dest_airport_code,
                r.dest_airport_id,
                r.codeshare,
                r.stops,
                r.equipment,
            ])?;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[tracing::instrument(skip_all, fields(dataset = "routes"))]
pub fn load_routes<R: Read>(conn: &Connection, reader: R) -> anyhow::Result<LoadSummary> {
    let parsed = parse_routes(reader).context("failed to parse routes extract")?;

    let mut summary = LoadSummary::new(Dataset::Routes, parsed.rows_read);

    if parsed.records.is_empty() {
        warn!("No route rows found to insert");
        return Ok(summary);
    }

    summary.rows_written = insert_routes(conn, &parsed.records)?;
    summary.rows_skipped = parsed.rows_read - summary.rows_written;
    info!(
        rows_written = summary.rows_written,
        duplicates_ignored = summary.rows_skipped,
        "Inserted airline routes"
    );
    Ok(summary)
}
