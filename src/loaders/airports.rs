use std::io::Read;

use anyhow::Context;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::error::LoadError;
use crate::loaders::{LoadSummary, Parsed, dedup_last_wins};
use crate::parser::{Row, read_rows};

/// Airport ID, Name, City, Country, IATA, ICAO, Latitude, Longitude,
/// Altitude, Timezone, DST, Tz database timezone, Type, Source
pub const COLUMNS: usize = 14;

const UPSERT_SQL: &str = "
    INSERT INTO airports (
        airport_id, name, city, country, iata, icao,
        latitude, longitude, altitude_ft, timezone_utc_offset,
        dst, tz_database, type, source
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(airport_id) DO UPDATE SET
        name = excluded.name,
        city = excluded.city,
        country = excluded.country,
        iata = excluded.iata,
        icao = excluded.icao,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        altitude_ft = excluded.altitude_ft,
        timezone_utc_offset = excluded.timezone_utc_offset,
        dst = excluded.dst,
        tz_database = excluded.tz_database,
        type = excluded.type,
        source = excluded.source";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub airport_id: i64,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<i64>,
    pub timezone_utc_offset: Option<f64>,
    pub dst: Option<String>,
    pub tz_database: Option<String>,
    pub kind: Option<String>,
    pub source: Option<String>,
}

impl Airport {
    pub fn from_row(row: &Row) -> Result<Option<Self>, LoadError> {
        let Some(airport_id) = row.int(0)? else {
            return Ok(None);
        };

        Ok(Some(Airport {
            airport_id,
            name: row.text(1),
            city: row.text(2),
            country: row.text(3),
            iata: row.text(4),
            icao: row.text(5),
            latitude: row.float(6)?,
            longitude: row.float(7)?,
            altitude_ft: row.int(8)?,
            timezone_utc_offset: row.float(9)?,
            dst: row.text(10),
            tz_database: row.text(11),
            kind: row.text(12),
            source: row.text(13),
        }))
    }
}

pub fn parse_airports<R: Read>(reader: R) -> Result<Parsed<Airport>, LoadError> {
    let rows = read_rows(reader, &[COLUMNS])?;
    let rows_read = rows.len();

    let mut records = Vec::with_capacity(rows_read);
    for row in &rows {
        if let Some(airport) = Airport::from_row(row)? {
            records.push(airport);
        }
    }
    let missing_id = rows_read - records.len();
    let (records, duplicates) = dedup_last_wins(records, |a| a.airport_id);

    Ok(Parsed {
        records,
        rows_read,
        rows_skipped: missing_id + duplicates,
    })
}

/// Inserts or replaces airports; derived traffic columns are left as they are.
pub fn upsert_airports(conn: &Connection, airports: &[Airport]) -> anyhow::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut written = 0;
    {
        let mut stmt = tx.prepare(UPSERT_SQL)?;
        for a in airports {
            written += stmt.execute(params![
                a.airport_id,
                a.name,
                a.city,
                a.country,
                a.iata,
                a.icao,
                a.latitude,
                a.longitude,
                a.altitude_ft,
                a.timezone_utc_offset,
                a.dst,
                a.tz_database,
                a.kind,
                a.source,
            ])?;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[tracing::instrument(skip_all, fields(dataset = "airports"))]
pub fn load_airports<R: Read>(conn: &Connection, reader: R) -> anyhow::Result<LoadSummary> {
    let parsed = parse_airports(reader).context("failed to parse airports extract")?;

    let mut summary = LoadSummary::new(Dataset::Airports, parsed.rows_read);
    summary.rows_skipped = parsed.rows_skipped;

    if parsed.records.is_empty() {
        warn!("No airport rows found");
        return Ok(summary);
    }

    summary.rows_written = upsert_airports(conn, &parsed.records)?;
    info!(
        rows_written = summary.rows_written,
        rows_skipped = summary.rows_skipped,
        "Inserted/updated airports"
    );
    Ok(summary)
}
