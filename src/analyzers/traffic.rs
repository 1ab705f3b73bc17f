use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::db::ensure_column;

/// Totals written back to `airports` by [`compute_airport_traffic`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficSummary {
    pub airports: i64,
    pub airports_with_routes: i64,
    pub outbound_total: i64,
    pub inbound_total: i64,
}

/// Adds `inbound_count`, `outbound_count` and `total_in_out` to `airports`.
pub fn ensure_columns(conn: &Connection) -> Result<()> {
    for column in ["inbound_count", "outbound_count", "total_in_out"] {
        ensure_column(conn, "airports", column, "INTEGER DEFAULT 0")?;
    }
    Ok(())
}

/// Recounts route departures and arrivals for every airport.
///
/// Airports without routes end up with zero counts.
#[tracing::instrument(skip_all)]
pub fn compute_airport_traffic(conn: &Connection) -> Result<TrafficSummary> {
    ensure_columns(conn)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "UPDATE airports
         SET inbound_count = 0,
             outbound_count = 0,
             total_in_out = 0;

         UPDATE airports AS a
         SET outbound_count = sub.out_count
         FROM (
             SELECT source_airport_id AS airport_id, COUNT(*) AS out_count
             FROM airline_routes
             WHERE source_airport_id IS NOT NULL
             GROUP BY source_airport_id
         ) AS sub
         WHERE a.airport_id = sub.airport_id;

         UPDATE airports AS a
         SET inbound_count = sub.in_count
         FROM (
             SELECT dest_airport_id AS airport_id, COUNT(*) AS in_count
             FROM airline_routes
             WHERE dest_airport_id IS NOT NULL
             GROUP BY dest_airport_id
         ) AS sub
         WHERE a.airport_id = sub.airport_id;

         UPDATE airports
         SET total_in_out = COALESCE(inbound_count, 0) + COALESCE(outbound_count, 0);",
    )?;
    tx.commit()?;

    let summary = conn.query_row(
        "SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE total_in_out > 0),
            COALESCE(SUM(outbound_count), 0),
            COALESCE(SUM(inbound_count), 0)
         FROM airports",
        [],
        |row| {
            Ok(TrafficSummary {
                airports: row.get(0)?,
                airports_with_routes: row.get(1)?,
                outbound_total: row.get(2)?,
                inbound_total: row.get(3)?,
            })
        },
    )?;

    info!(
        airports = summary.airports,
        airports_with_routes = summary.airports_with_routes,
        "Airport counts updated"
    );
    Ok(summary)
}
