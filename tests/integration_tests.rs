use std::fs::File;
use std::path::PathBuf;

use airdata::analyzers::region::{CountryList, RouteCounts, airline_frequencies};
use airdata::analyzers::traffic::TrafficSummary;
use airdata::dataset::Dataset;
use airdata::db::{init_schema, table_len};
use airdata::loaders::load;
use airdata::pipeline::{export_all, run_analysis};
use airdata::reports::share::flight_share;
use airdata::reports::{ReportFormat, asia, hubs, reach};
use rusqlite::Connection;

fn fixture(dataset: Dataset) -> File {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(dataset.file_name());
    File::open(path).expect("open fixture")
}

fn loaded_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    for dataset in Dataset::ALL {
        load(&conn, dataset, fixture(dataset)).expect("load fixture");
    }
    conn
}

#[test]
fn test_load_summaries() {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();

    let airlines = load(&conn, Dataset::Airlines, fixture(Dataset::Airlines)).unwrap();
    assert_eq!((airlines.rows_read, airlines.rows_written, airlines.rows_skipped), (5, 4, 1));

    let routes = load(&conn, Dataset::Routes, fixture(Dataset::Routes)).unwrap();
    assert_eq!((routes.rows_read, routes.rows_written, routes.rows_skipped), (11, 9, 2));

    let airports = load(&conn, Dataset::Airports, fixture(Dataset::Airports)).unwrap();
    assert_eq!(airports.rows_written, 6);

    let aircraft = load(&conn, Dataset::Aircraft, fixture(Dataset::Aircraft)).unwrap();
    assert_eq!((aircraft.rows_read, aircraft.rows_written, aircraft.rows_skipped), (6, 4, 2));
}

#[test]
fn test_reloading_everything_is_idempotent() {
    let conn = loaded_db();
    for dataset in Dataset::ALL {
        load(&conn, dataset, fixture(dataset)).unwrap();
    }

    assert_eq!(table_len(&conn, "airlines").unwrap(), 4);
    assert_eq!(table_len(&conn, "airports").unwrap(), 6);
    assert_eq!(table_len(&conn, "airline_routes").unwrap(), 9);
    assert_eq!(table_len(&conn, "aircraft").unwrap(), 4);
}

#[test]
fn test_full_pipeline() {
    let conn = loaded_db();

    let summary = run_analysis(&conn, &CountryList::asia()).unwrap();
    assert_eq!(summary.operational_airlines, 3);
    assert_eq!(
        summary.route_counts,
        RouteCounts {
            source_in_asia: 6,
            dest_in_asia: 5,
            both_in_asia: 3,
            touches_asia: 8,
        }
    );
    assert_eq!(
        summary.traffic,
        TrafficSummary {
            airports: 6,
            airports_with_routes: 5,
            outbound_total: 9,
            inbound_total: 8,
        }
    );

    let frequencies = airline_frequencies(&conn, 50).unwrap();
    let names: Vec<&str> = frequencies.iter().map(|f| f.airline_name.as_str()).collect();
    assert_eq!(names, vec!["Air China", "China Eastern Airlines"]);

    let report = asia::build_report(&conn).unwrap();
    assert_eq!(report.join, asia::AircraftJoin::Equipment);
    assert_eq!(report.rows.len(), 4);

    let air_china = report
        .rows
        .iter()
        .find(|r| r.airline_id == Some(1))
        .unwrap();
    assert_eq!(air_china.flights_within_asia, 2);
    assert_eq!(air_china.flights_out_of_asia, 2);
    assert_eq!(air_china.flights_in_asia, 0);
    assert_eq!(air_china.total_flights_to_asia, 4);
    assert_eq!(air_china.pax_within_asia, 360);
    assert_eq!(air_china.pax_out_of_asia, 596);
    assert_eq!(air_china.pax_total_to_asia, 956);

    let lufthansa = report
        .rows
        .iter()
        .find(|r| r.airline_id == Some(3))
        .unwrap();
    assert_eq!(lufthansa.flights_in_asia, 1);
    assert_eq!(lufthansa.pax_in_asia, 416);

    let unknown = report.rows.iter().find(|r| r.airline_id.is_none()).unwrap();
    assert_eq!(unknown.airline_name, "(unknown)");
    assert_eq!(unknown.airline_code.as_deref(), Some("XX"));
    assert_eq!(unknown.pax_total_to_asia, 0);

    let share = flight_share(&conn, 2).unwrap();
    let slices: Vec<(&str, i64)> = share
        .slices
        .iter()
        .map(|s| (s.label.as_str(), s.flights))
        .collect();
    assert_eq!(
        slices,
        vec![("Air China", 4), ("China Eastern Airlines", 2), ("Other", 2)]
    );
    assert_eq!(share.total_flights, 8);

    let hubs = hubs::airlines_at_top_airports(&conn, 2).unwrap();
    let usage: Vec<(i64, i64, i64)> = hubs
        .iter()
        .map(|h| (h.airport_id, h.airline_id, h.route_records_touching_airport))
        .collect();
    assert_eq!(usage, vec![(1, 1, 4), (1, 3, 1), (2, 1, 2), (2, 2, 2)]);

    let reach = reach::unique_airports_per_airline(&conn).unwrap();
    assert_eq!(reach.len(), 3);
    assert!(reach.iter().all(|r| r.unique_airports_touched == 3));
}

#[test]
fn test_export_all_writes_every_report() {
    let conn = loaded_db();
    run_analysis(&conn, &CountryList::asia()).unwrap();

    let dir = std::env::temp_dir().join(format!("airdata_it_export_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let paths = export_all(&conn, ReportFormat::Csv, 10, &dir).unwrap();
    assert_eq!(paths.len(), 4);
    assert!(paths.iter().all(|p| p.exists()));

    let asia_csv = std::fs::read_to_string(dir.join("asia_report.csv")).unwrap();
    assert!(
        asia_csv
            .lines()
            .next()
            .unwrap()
            .starts_with("airline_id,airline_code,airline_name,flights_out_of_asia")
    );
    assert_eq!(asia_csv.lines().count(), 5);

    let json_paths = export_all(&conn, ReportFormat::Json, 10, &dir).unwrap();
    let share: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_paths[3]).unwrap()).unwrap();
    assert_eq!(
        share["title"],
        "Asia Report: Total Flights by Airline Name (Top 10)"
    );

    std::fs::remove_dir_all(&dir).unwrap();
}
