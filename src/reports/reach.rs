use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::output::CsvRow;

/// Number of distinct airports an airline departs from or arrives at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineReachRow {
    pub airline_id: i64,
    pub airline_name: Option<String>,
    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub unique_airports_touched: i64,
}

impl CsvRow for AirlineReachRow {
    const HEADERS: &'static [&'static str] = &[
        "airline_id",
        "airline_name",
        "airline_iata",
        "airline_icao",
        "unique_airports_touched",
    ];
}

const SQL: &str = "
    WITH airline_airports AS (
        SELECT airline_id, source_airport_id AS airport_id
        FROM airline_routes
        WHERE airline_id IS NOT NULL

        UNION

        SELECT airline_id, dest_airport_id AS airport_id
        FROM airline_routes
        WHERE airline_id IS NOT NULL
    ),
    airline_unique_counts AS (
        SELECT
            airline_id,
            COUNT(DISTINCT airport_id) AS unique_airports_touched
        FROM airline_airports
        GROUP BY airline_id
    )
    SELECT
        auc.airline_id,
        al.name AS airline_name,
        al.iata AS airline_iata,
        al.icao AS airline_icao,
        auc.unique_airports_touched
    FROM airline_unique_counts auc
    LEFT JOIN airlines al ON al.airline_id = auc.airline_id
    ORDER BY unique_airports_touched DESC, airline_name";

pub fn unique_airports_per_airline(conn: &Connection) -> Result<Vec<AirlineReachRow>> {
    let mut stmt = conn.prepare(SQL)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AirlineReachRow {
                airline_id: row.get(0)?,
                airline_name: row.get(1)?,
                airline_iata: row.get(2)?,
                airline_icao: row.get(3)?,
                unique_airports_touched: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
