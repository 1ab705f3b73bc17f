use std::io::Read;

use anyhow::Context;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::LoadError;
use crate::loaders::{LoadSummary, Parsed, dedup_last_wins};
use crate::parser::{Row, read_rows};

/// `airline_id, name, alias, iata, icao, callsign, country, active`
pub const COLUMNS: usize = 8;

const UPSERT_SQL: &str = "
    INSERT INTO airlines
        (airline_id, name, alias, iata, icao, callsign, country, active)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(airline_id) DO UPDATE SET
        name     = excluded.name,
        alias    = excluded.alias,
        iata     = excluded.iata,
        icao     = excluded.icao,
        callsign = excluded.callsign,
        country  = excluded.country,
        active   = excluded.active";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airline {
    pub airline_id: i64,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub callsign: Option<String>,
    pub country: Option<String>,
    pub active: Option<String>,
}

impl Airline {
    /// Rows without an airline id yield `None`.
    pub fn from_row(row: &Row) -> Result<Option<Self>, LoadError> {
        let Some(airline_id) = row.int(0)? else {
            return Ok(None);
        };

        Ok(Some(Airline {
            airline_id,
            name: row.text(1),
            alias: row.text(2),
            iata: row.text(3),
            icao: row.text(4),
            callsign: row.text(5),
            country: row.text(6),
            active: row.text(7),
        }))
    }
}

pub fn parse_airlines<R: Read>(reader: R) -> Result<Parsed<Airline>, LoadError> {
    let rows = read_rows(reader, &[COLUMNS])?;
    let rows_read = rows.len();

    let mut records = Vec::with_capacity(rows_read);
    for row in &rows {
        if let Some(airline) = Airline::from_row(row)? {
            records.push(airline);
        }
    }
    let missing_id = rows_read - records.len();
    let (records, duplicates) = dedup_last_wins(records, |a| a.airline_id);

    Ok(Parsed {
        records,
        rows_read,
        rows_skipped: missing_id + duplicates,
    })
}

/// Inserts or replaces every airline in one transaction.
pub fn upsert_airlines(conn: &Connection, airlines: &[Airline]) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(UPSERT_SQL)?;
        for a in airlines {
            written += stmt.execute(params![
                a.airline_id,
                a.name,
                a.alias,
                a.iata,
                a.icao,
                a.callsign,
                a.country,
                a.active,
            ])?;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[tracing::instrument(skip_all, fields(dataset = "airlines"))]
pub fn load_airlines<R: Read>(conn: &Connection, reader: R) -> anyhow::Result<LoadSummary> {
    let parsed = parse_airlines(reader).context("failed to parse airlines extract")?;

    let mut summary = LoadSummary::new(Dataset::Airlines, parsed.rows_read);
    summary.rows_skipped = parsed.rows_skipped;

    if parsed.records.is_empty() {
        warn!("No airline rows found to insert");
        return Ok(summary);
    }

    summary.rows_written = upsert_airlines(conn, &parsed.records)?;
    info!(
        rows_written = summary.rows_written,
        rows_skipped = summary.rows_skipped,
        "Inserted/updated airlines"
    );
    Ok(summary)
}
