use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::table_has_column;
use crate::output::CsvRow;

/// How often one airline's route records touch one of the busiest airports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubUsageRow {
    pub airport_id: i64,
    pub airport_iata: Option<String>,
    pub airport_name: Option<String>,
    pub total_in_out: i64,
    pub airline_id: i64,
    pub airline_name: Option<String>,
    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub route_records_touching_airport: i64,
}

impl CsvRow for HubUsageRow {
    const HEADERS: &'static [&'static str] = &[
        "airport_id",
        "airport_iata",
        "airport_name",
        "total_in_out",
        "airline_id",
        "airline_name",
        "airline_iata",
        "airline_icao",
        "route_records_touching_airport",
    ];
}

const SQL: &str = "
    WITH top_airports AS (
        SELECT airport_id, name, iata, total_in_out
        FROM airports
        ORDER BY total_in_out DESC
        LIMIT ?1
    ),
    routes_touching_top AS (
        SELECT r.airline_id, r.source_airport_id AS airport_id
        FROM airline_routes r
        JOIN top_airports ta ON ta.airport_id = r.source_airport_id

        UNION ALL

        SELECT r.airline_id, r.dest_airport_id AS airport_id
        FROM airline_routes r
        JOIN top_airports ta ON ta.airport_id = r.dest_airport_id
    ),
    airline_usage AS (
        SELECT
            airport_id,
            airline_id,
            COUNT(*) AS route_records_touching_airport
        FROM routes_touching_top
        WHERE airline_id IS NOT NULL
        GROUP BY airport_id, airline_id
    )
    SELECT
        ta.airport_id,
        ta.iata AS airport_iata,
        ta.name AS airport_name,
        ta.total_in_out,
        au.airline_id,
        al.name AS airline_name,
        al.iata AS airline_iata,
        al.icao AS airline_icao,
        au.route_records_touching_airport
    FROM airline_usage au
    JOIN top_airports ta ON ta.airport_id = au.airport_id
    LEFT JOIN airlines al ON al.airline_id = au.airline_id
    ORDER BY
        ta.total_in_out DESC,
        ta.airport_id,
        au.route_records_touching_airport DESC,
        airline_name";

/// Airlines serving the `top_n` airports ranked by total route count.
///
/// Needs the traffic columns from
/// [`crate::analyzers::traffic::compute_airport_traffic`].
pub fn airlines_at_top_airports(conn: &Connection, top_n: usize) -> Result<Vec<HubUsageRow>> {
    if !table_has_column(conn, "airports", "total_in_out")? {
        bail!("airports has no traffic counts; run the traffic step first");
    }

    let mut stmt = conn.prepare(SQL)?;
    let rows = stmt
        .query_map([i64::try_from(top_n)?], |row| {
            Ok(HubUsageRow {
                airport_id: row.get(0)?,
                airport_iata: row.get(1)?,
                airport_name: row.get(2)?,
                total_in_out: row.get(3)?,
                airline_id: row.get(4)?,
                airline_name: row.get(5)?,
                airline_iata: row.get(6)?,
                airline_icao: row.get(7)?,
                route_records_touching_airport: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::traffic::compute_airport_traffic;
    use crate::db::init_schema;
    use crate::loaders::{airlines::load_airlines, airports::load_airports, routes::load_routes};

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        load_airports(
            &conn,
            "1,Hub,c,X,HUB,HHHH,0,0,0,0,U,tz,airport,src
2,Mid,c,X,MID,MMMM,0,0,0,0,U,tz,airport,src
3,Small,c,X,SML,SSSS,0,0,0,0,U,tz,airport,src
"
            .as_bytes(),
        )
        .unwrap();
        load_airlines(
            &conn,
            "10,Alpha,\\N,AA,AAA,ALPHA,X,Y\n20,Bravo,\\N,BB,BBB,BRAVO,X,Y\n".as_bytes(),
        )
        .unwrap();
        load_routes(
            &conn,
            "AA,10,HUB,1,MID,2,,0,320
AA,10,MID,2,HUB,1,,0,320
BB,20,HUB,1,SML,3,,0,320
ZZ,\\N,HUB,1,MID,2,,0,320
"
            .as_bytes(),
        )
        .unwrap();
        compute_airport_traffic(&conn).unwrap();
        conn
    }

    #[test]
    fn test_requires_traffic_columns() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert!(airlines_at_top_airports(&conn, 10).is_err());
    }

    #[test]
    fn test_top_airport_usage() {
        let conn = seeded();
        let rows = airlines_at_top_airports(&conn, 1).unwrap();

        // Hub: 4 departures/arrivals; the airline-less route is left out
        let summary: Vec<(i64, i64, i64)> = rows
            .iter()
            .map(|r| (r.airport_id, r.airline_id, r.route_records_touching_airport))
            .collect();
        assert_eq!(summary, vec![(1, 10, 2), (1, 20, 1)]);
        assert_eq!(rows[0].total_in_out, 4);
        assert_eq!(rows[0].airline_name.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_top_two_airports_ordered_by_traffic() {
        let conn = seeded();
        let rows = airlines_at_top_airports(&conn, 2).unwrap();

        let airports: Vec<i64> = rows.iter().map(|r| r.airport_id).collect();
        assert_eq!(airports, vec![1, 1, 2]);
        assert_eq!(rows[2].route_records_touching_airport, 2);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_top_n_is_rejected() {
        let conn = seeded();
        assert!(airlines_at_top_airports(&conn, usize::MAX).is_err());
    }
}
