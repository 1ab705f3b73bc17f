use std::io::Read;

use anyhow::Context;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::LoadError;
use crate::loaders::{LoadSummary, Parsed, dedup_last_wins};
use crate::parser::{Row, read_rows};

/// `name, iata, icao` (the upstream OpenFlights layout, no capacity data)
pub const CODE_COLUMNS: usize = 3;
/// `name, iata, icao, seat_capacity, cargo_cuft, source`
pub const CAPACITY_COLUMNS: usize = 6;
/// `name, iata, icao, _, _, seat_capacity, source` (no cargo figure)
pub const EXTENDED_COLUMNS: usize = 7;

const UPSERT_SQL: &str = "
    INSERT INTO aircraft (
        name,
        iata_code,
        icao_code,
        seat_capacity,
        cargo_amount_cuft,
        source_of_capacity
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(icao_code) DO UPDATE SET
        name               = excluded.name,
        iata_code          = excluded.iata_code,
        seat_capacity      = excluded.seat_capacity,
        cargo_amount_cuft  = excluded.cargo_amount_cuft,
        source_of_capacity = excluded.source_of_capacity";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aircraft {
    pub name: Option<String>,
    pub iata_code: Option<String>,
    pub icao_code: String,
    pub seat_capacity: Option<i64>,
    pub cargo_amount_cuft: Option<f64>,
    pub source_of_capacity: Option<String>,
}

impl Aircraft {
    /// Rows without an ICAO code yield `None`. Numeric fields that do not
    /// parse are stored as NULL rather than rejected.
    pub fn from_row(row: &Row) -> Option<Self> {
        let icao_code = row.text(2)?;

        let (seat_capacity, cargo_amount_cuft, source_of_capacity) = match row.width() {
            CODE_COLUMNS => (None, None, None),
            CAPACITY_COLUMNS => (row.lenient_int(3), row.lenient_float(4), row.text(5)),
            _ => (row.lenient_int(5), None, row.text(6)),
        };

        Some(Aircraft {
            name: row.text(0),
            iata_code: row.text(1),
            icao_code,
            seat_capacity,
            cargo_amount_cuft,
            source_of_capacity,
        })
    }
}

pub fn parse_aircraft<R: Read>(reader: R) -> Result<Parsed<Aircraft>, LoadError> {
    let rows = read_rows(reader, &[CODE_COLUMNS, CAPACITY_COLUMNS, EXTENDED_COLUMNS])?;
    let rows_read = rows.len();

    let records: Vec<Aircraft> = rows.iter().filter_map(Aircraft::from_row).collect();
    let missing_icao = rows_read - records.len();
    let (records, duplicates) = dedup_last_wins(records, |a| a.icao_code.clone());

    Ok(Parsed {
        records,
        rows_read,
        rows_skipped: missing_icao + duplicates,
    })
}

pub fn upsert_aircraft(conn: &Connection, aircraft: &[Aircraft]) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(UPSERT_SQL)?;
        for a in aircraft {
            written += stmt.execute(params![
                a.name,
                a.iata_code,
                a.icao_code,
                a.seat_capacity,
                a.cargo_amount_cuft,
                a.source_of_capacity,
            ])?;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[tracing::instrument(skip_all, fields(dataset = "aircraft"))]
pub fn load_aircraft<R: Read>(conn: &Connection, reader: R) -> anyhow::Result<LoadSummary> {
    let parsed = parse_aircraft(reader).context("failed to parse aircraft extract")?;

    let mut summary = LoadSummary::new(Dataset::Aircraft, parsed.rows_read);
    summary.rows_skipped = parsed.rows_skipped;

    if parsed.records.is_empty() {
        warn!("No aircraft rows found to insert");
        return Ok(summary);
    }

    summary.rows_written = upsert_aircraft(conn, &parsed.records)?;
    info!(
        rows_written = summary.rows_written,
        rows_skipped = summary.rows_skipped,
        "Inserted/updated unique ICAO aircraft rows"
    );
    Ok(summary)
}
