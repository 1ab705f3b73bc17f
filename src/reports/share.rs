//! Slice data for the "flights touching Asia by airline" pie chart.

use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::table_exists;
use crate::output::CsvRow;

pub const OTHER_LABEL: &str = "Other";
pub const UNKNOWN_LABEL: &str = "(unknown)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub label: String,
    pub flights: i64,
    pub percent: f64,
}

impl CsvRow for ShareSlice {
    const HEADERS: &'static [&'static str] = &["label", "flights", "percent"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightShare {
    pub title: String,
    pub top_n: usize,
    pub total_flights: i64,
    pub slices: Vec<ShareSlice>,
}

pub fn pct(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Builds the top-`top_n` slices plus an `Other` slice from `(name, flights)`
/// pairs sorted busiest first. Non-positive totals are ignored.
pub fn share_from_totals(totals: Vec<(Option<String>, i64)>, top_n: usize) -> Result<FlightShare> {
    let totals: Vec<(String, i64)> = totals
        .into_iter()
        .filter(|(_, flights)| *flights > 0)
        .map(|(name, flights)| {
            let label = name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_LABEL)
                .to_string();
            (label, flights)
        })
        .collect();

    if totals.is_empty() {
        bail!("asia_report returned 0 rows (or total_flights_to_asia is all 0)");
    }

    let total_flights: i64 = totals.iter().map(|(_, f)| f).sum();
    let split = top_n.min(totals.len());
    let (top, rest) = totals.split_at(split);

    let mut slices: Vec<ShareSlice> = top
        .iter()
        .map(|(label, flights)| ShareSlice {
            label: label.clone(),
            flights: *flights,
            percent: pct(*flights, total_flights),
        })
        .collect();

    let other: i64 = rest.iter().map(|(_, f)| f).sum();
    if other > 0 {
        slices.push(ShareSlice {
            label: OTHER_LABEL.to_string(),
            flights: other,
            percent: pct(other, total_flights),
        });
    }

    let title = format!(
        "Asia Report: Total Flights by Airline Name (Top {}{})",
        top_n,
        if other > 0 { " + Other" } else { "" }
    );

    Ok(FlightShare {
        title,
        top_n,
        total_flights,
        slices,
    })
}

/// Reads `asia_report` and builds the flight share slices.
///
/// Needs the table from [`crate::reports::asia::build_report`].
pub fn flight_share(conn: &Connection, top_n: usize) -> Result<FlightShare> {
    if !table_exists(conn, "asia_report")? {
        bail!("asia_report does not exist; build the asia report first");
    }

    let mut stmt = conn.prepare(
        "SELECT
            airline_name,
            COALESCE(total_flights_to_asia, 0) AS total_flights_to_asia
         FROM asia_report
         WHERE COALESCE(total_flights_to_asia, 0) > 0
         ORDER BY total_flights_to_asia DESC",
    )?;
    let totals = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<(Option<String>, i64)>, _>>()?;

    share_from_totals(totals, top_n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(items: &[(&str, i64)]) -> Vec<(Option<String>, i64)> {
        items
            .iter()
            .map(|(name, flights)| (Some(name.to_string()), *flights))
            .collect()
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_top_n_with_other() {
        let share =
            share_from_totals(totals(&[("A", 50), ("B", 30), ("C", 15), ("D", 5)]), 2).unwrap();

        let labels: Vec<&str> = share.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "Other"]);
        assert_eq!(share.slices[2].flights, 20);
        assert_eq!(share.slices[0].percent, 50.0);
        assert_eq!(share.total_flights, 100);
        assert_eq!(
            share.title,
            "Asia Report: Total Flights by Airline Name (Top 2 + Other)"
        );
    }

    #[test]
    fn test_no_other_when_everything_fits() {
        let share = share_from_totals(totals(&[("A", 3), ("B", 1)]), 10).unwrap();

        assert_eq!(share.slices.len(), 2);
        assert_eq!(share.title, "Asia Report: Total Flights by Airline Name (Top 10)");
    }

    #[test]
    fn test_labels_are_trimmed_and_defaulted() {
        let share = share_from_totals(
            vec![(Some("  Air China ".to_string()), 4), (None, 2), (Some(" ".to_string()), 1)],
            5,
        )
        .unwrap();

        let labels: Vec<&str> = share.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Air China", UNKNOWN_LABEL, UNKNOWN_LABEL]);
    }

    #[test]
    fn test_flight_share_needs_asia_report() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();

        let err = flight_share(&conn, 5).unwrap_err();
        assert!(err.to_string().contains("asia_report does not exist"));

        conn.execute(
            "CREATE TABLE asia_report(airline_name TEXT, total_flights_to_asia INTEGER)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO asia_report VALUES ('Air China', 3), ('Lufthansa', 1), (NULL, 0)",
            [],
        )
        .unwrap();

        let share = flight_share(&conn, 5).unwrap();
        assert_eq!(share.total_flights, 4);
        assert_eq!(share.slices.len(), 2);
    }

    #[test]
    fn test_empty_totals_are_an_error() {
        assert!(share_from_totals(vec![], 10).is_err());
        assert!(share_from_totals(totals(&[("A", 0)]), 10).is_err());
    }
}
