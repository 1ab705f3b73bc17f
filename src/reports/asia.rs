//! Per-airline Asia flight and passenger capacity rollup (`asia_report`).

use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::table_has_column;
use crate::output::CsvRow;

/// How route rows are matched to aircraft for seat capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftJoin {
    AircraftId,
    IataCode,
    IcaoCode,
    Equipment,
    /// No link column; pax sums are all zero.
    Unlinked,
}

impl AircraftJoin {
    /// Picks the first link column `airline_routes` actually has.
    pub fn detect(conn: &Connection) -> Result<Self> {
        let candidates = [
            ("aircraft_id", AircraftJoin::AircraftId),
            ("iata_code", AircraftJoin::IataCode),
            ("icao_code", AircraftJoin::IcaoCode),
            ("equipment", AircraftJoin::Equipment),
        ];
        for (column, join) in candidates {
            if table_has_column(conn, "airline_routes", column)? {
                return Ok(join);
            }
        }
        Ok(AircraftJoin::Unlinked)
    }

    pub fn on_clause(self) -> &'static str {
        match self {
            AircraftJoin::AircraftId => "ON ac.aircraft_id = r.aircraft_id",
            AircraftJoin::IataCode => "ON ac.iata_code = r.iata_code",
            AircraftJoin::IcaoCode => "ON ac.icao_code = r.icao_code",
            AircraftJoin::Equipment => {
                "ON (ac.iata_code = r.equipment OR ac.icao_code = r.equipment)"
            }
            AircraftJoin::Unlinked => "ON 1 = 0",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsiaReportRow {
    pub airline_id: Option<i64>,
    pub airline_code: Option<String>,
    pub airline_name: String,
    pub flights_out_of_asia: i64,
    pub flights_in_asia: i64,
    pub flights_within_asia: i64,
    pub total_flights_to_asia: i64,
    pub pax_out_of_asia: i64,
    pub pax_in_asia: i64,
    pub pax_within_asia: i64,
    pub pax_total_to_asia: i64,
}

impl CsvRow for AsiaReportRow {
    const HEADERS: &'static [&'static str] = &[
        "airline_id",
        "airline_code",
        "airline_name",
        "flights_out_of_asia",
        "flights_in_asia",
        "flights_within_asia",
        "total_flights_to_asia",
        "pax_out_of_asia",
        "pax_in_asia",
        "pax_within_asia",
        "pax_total_to_asia",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsiaReport {
    pub join: AircraftJoin,
    pub rows: Vec<AsiaReportRow>,
}

fn create_sql(join: AircraftJoin) -> String {
    format!(
        "CREATE TABLE asia_report AS
         SELECT
            r.airline_id,
            r.airline_code,
            COALESCE(al.name, '(unknown)') AS airline_name,

            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = FALSE)
                AS flights_out_of_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = FALSE AND r.dest_in_asia = TRUE)
                AS flights_in_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = TRUE)
                AS flights_within_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE OR r.dest_in_asia = TRUE)
                AS total_flights_to_asia,

            COALESCE(SUM(COALESCE(ac.seat_capacity, 0))
                FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = FALSE), 0)
                AS pax_out_of_asia,
            COALESCE(SUM(COALESCE(ac.seat_capacity, 0))
                FILTER (WHERE r.source_in_asia = FALSE AND r.dest_in_asia = TRUE), 0)
                AS pax_in_asia,
            COALESCE(SUM(COALESCE(ac.seat_capacity, 0))
                FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = TRUE), 0)
                AS pax_within_asia,
            COALESCE(SUM(COALESCE(ac.seat_capacity, 0))
                FILTER (WHERE r.source_in_asia = TRUE OR r.dest_in_asia = TRUE), 0)
                AS pax_total_to_asia

         FROM airline_routes r
         LEFT JOIN airlines al ON al.airline_id = r.airline_id
         LEFT JOIN aircraft ac {on}

         GROUP BY r.airline_id, r.airline_code, al.name
         HAVING COUNT(*) FILTER (WHERE r.source_in_asia = TRUE OR r.dest_in_asia = TRUE) > 0",
        on = join.on_clause()
    )
}

/// Rebuilds `asia_report` and returns its rows.
///
/// Needs the Asia flags from [`crate::analyzers::region::map_flags`].
#[tracing::instrument(skip_all)]
pub fn build_report(conn: &Connection) -> Result<AsiaReport> {
    if !table_has_column(conn, "airline_routes", "source_in_asia")? {
        bail!("airline_routes has no Asia flags; run the flags step first");
    }

    let join = AircraftJoin::detect(conn)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute("DROP TABLE IF EXISTS asia_report", [])?;
    tx.execute(&create_sql(join), [])?;
    tx.commit()?;

    if join == AircraftJoin::Unlinked {
        warn!("No aircraft link column found in airline_routes; pax columns will be 0");
    } else {
        info!(join = join.on_clause(), "Aircraft join used");
    }

    let rows = load_rows(conn)?;
    info!(airlines = rows.len(), "asia_report table created");
    Ok(AsiaReport { join, rows })
}

/// Reads `asia_report`, busiest airline first.
pub fn load_rows(conn: &Connection) -> Result<Vec<AsiaReportRow>> {
    let mut stmt = conn.prepare(
        "SELECT
            airline_id, airline_code, airline_name,
            flights_out_of_asia, flights_in_asia, flights_within_asia, total_flights_to_asia,
            pax_out_of_asia, pax_in_asia, pax_within_asia, pax_total_to_asia
         FROM asia_report
         ORDER BY total_flights_to_asia DESC, airline_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(AsiaReportRow {
                airline_id: row.get(0)?,
                airline_code: row.get(1)?,
                airline_name: row.get(2)?,
                flights_out_of_asia: row.get(3)?,
                flights_in_asia: row.get(4)?,
                flights_within_asia: row.get(5)?,
                total_flights_to_asia: row.get(6)?,
                pax_out_of_asia: row.get(7)?,
                pax_in_asia: row.get(8)?,
                pax_within_asia: row.get(9)?,
                pax_total_to_asia: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::region::{CountryList, map_flags};
    use crate::db::init_schema;
    use crate::loaders::{
        aircraft::load_aircraft, airlines::load_airlines, airports::load_airports,
        routes::load_routes,
    };

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        load_airports(
            &conn,
            "1,PEK,Beijing,China,PEK,ZBAA,0,0,0,8,U,tz,airport,src
2,HND,Tokyo,Japan,HND,RJTT,0,0,0,9,U,tz,airport,src
3,FRA,Frankfurt,Germany,FRA,EDDF,0,0,0,1,E,tz,airport,src
"
            .as_bytes(),
        )
        .unwrap();
        load_airlines(&conn, "10,Air China,\\N,CA,CCA,AIR CHINA,China,Y\n".as_bytes()).unwrap();
        load_aircraft(
            &conn,
            "\"Airbus A320\",\"320\",\"A320\",150,\\N,\"m\"\n\"Boeing 747-400\",\"744\",\"B744\",416,\\N,\"m\"\n"
                .as_bytes(),
        )
        .unwrap();
        load_routes(
            &conn,
            "CA,10,PEK,1,HND,2,,0,320
CA,10,PEK,1,FRA,3,,0,B744
CA,10,FRA,3,PEK,1,,0,744
CA,10,FRA,3,HND,2,,0,999
ZZ,\\N,FRA,3,FRA,3,,0,320
"
            .as_bytes(),
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_join_detection_prefers_equipment_column() {
        let conn = seeded();
        assert_eq!(AircraftJoin::detect(&conn).unwrap(), AircraftJoin::Equipment);

        conn.execute("ALTER TABLE airline_routes ADD COLUMN icao_code TEXT", [])
            .unwrap();
        assert_eq!(AircraftJoin::detect(&conn).unwrap(), AircraftJoin::IcaoCode);
    }

    #[test]
    fn test_aircraft_id_column_wins_over_other_links() {
        let conn = seeded();
        conn.execute("ALTER TABLE airline_routes ADD COLUMN icao_code TEXT", [])
            .unwrap();
        conn.execute("ALTER TABLE airline_routes ADD COLUMN aircraft_id INTEGER", [])
            .unwrap();
        conn.execute(
            "UPDATE airline_routes
             SET aircraft_id = (SELECT aircraft_id FROM aircraft WHERE icao_code = 'B744')",
            [],
        )
        .unwrap();
        assert_eq!(AircraftJoin::detect(&conn).unwrap(), AircraftJoin::AircraftId);

        map_flags(&conn, &CountryList::asia()).unwrap();
        let report = build_report(&conn).unwrap();
        assert_eq!(report.join, AircraftJoin::AircraftId);

        let ca = &report.rows[0];
        assert_eq!(ca.total_flights_to_asia, 4);
        assert_eq!(ca.pax_total_to_asia, 4 * 416);
    }

    #[test]
    fn test_routes_without_link_column_report_zero_pax() {
        let conn = seeded();
        conn.execute("DROP INDEX airline_routes_uk", []).unwrap();
        conn.execute("ALTER TABLE airline_routes DROP COLUMN equipment", [])
            .unwrap();
        assert_eq!(AircraftJoin::detect(&conn).unwrap(), AircraftJoin::Unlinked);

        map_flags(&conn, &CountryList::asia()).unwrap();
        let report = build_report(&conn).unwrap();
        assert_eq!(report.join, AircraftJoin::Unlinked);
        assert_eq!(report.rows.len(), 1);

        let ca = &report.rows[0];
        assert_eq!(ca.total_flights_to_asia, 4);
        assert_eq!(ca.pax_out_of_asia, 0);
        assert_eq!(ca.pax_in_asia, 0);
        assert_eq!(ca.pax_within_asia, 0);
        assert_eq!(ca.pax_total_to_asia, 0);
    }

    #[test]
    fn test_build_report_requires_flags() {
        let conn = seeded();
        assert!(build_report(&conn).is_err());
    }

    #[test]
    fn test_build_report_counts_and_pax() {
        let conn = seeded();
        map_flags(&conn, &CountryList::asia()).unwrap();

        let report = build_report(&conn).unwrap();
        assert_eq!(report.join, AircraftJoin::Equipment);
        // the FRA-FRA route never touches Asia, so its airline is dropped
        assert_eq!(report.rows.len(), 1);

        let ca = &report.rows[0];
        assert_eq!(ca.airline_name, "Air China");
        assert_eq!(ca.flights_within_asia, 1);
        assert_eq!(ca.flights_out_of_asia, 1);
        assert_eq!(ca.flights_in_asia, 2);
        assert_eq!(ca.total_flights_to_asia, 4);
        assert_eq!(ca.pax_within_asia, 150);
        assert_eq!(ca.pax_out_of_asia, 416);
        assert_eq!(ca.pax_in_asia, 416);
        assert_eq!(ca.pax_total_to_asia, 982);
    }

    #[test]
    fn test_rebuild_replaces_previous_report() {
        let conn = seeded();
        map_flags(&conn, &CountryList::asia()).unwrap();
        build_report(&conn).unwrap();

        conn.execute("DELETE FROM airline_routes WHERE equipment = '999'", [])
            .unwrap();
        let report = build_report(&conn).unwrap();
        assert_eq!(report.rows[0].total_flights_to_asia, 3);
        assert_eq!(load_rows(&conn).unwrap(), report.rows);
    }
}
