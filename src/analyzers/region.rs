//! Asia membership flags on routes and the counts derived from them.
//!
//! A route endpoint is "in Asia" when its airport's country is on the
//! configured country list. The list defaults to [`ASIA_COUNTRIES`] and can be
//! replaced by a JSON array on disk:
//! ```json
//! ["China", "Japan", "Hong Kong"]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::ensure_column;

pub const ASIA_COUNTRIES: &[&str] = &[
    "Afghanistan",
    "Armenia",
    "Azerbaijan",
    "Bahrain",
    "Bangladesh",
    "Bhutan",
    "Brunei",
    "Cambodia",
    "China",
    "Cyprus",
    "Georgia",
    "India",
    "Indonesia",
    "Iran",
    "Iraq",
    "Israel",
    "Japan",
    "Jordan",
    "Kazakhstan",
    "Kuwait",
    "Kyrgyzstan",
    "Laos",
    "Lebanon",
    "Malaysia",
    "Maldives",
    "Mongolia",
    "Myanmar",
    "Nepal",
    "North Korea",
    "Oman",
    "Pakistan",
    "Palestine",
    "Philippines",
    "Qatar",
    "Saudi Arabia",
    "Singapore",
    "South Korea",
    "Sri Lanka",
    "Syria",
    "Taiwan",
    "Tajikistan",
    "Thailand",
    "Timor-Leste",
    "Turkey",
    "Turkmenistan",
    "United Arab Emirates",
    "Uzbekistan",
    "Vietnam",
    "Yemen",
    "Hong Kong",
    "Macau",
];

/// Country names matched exactly against `airports.country`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CountryList {
    countries: Vec<String>,
}

impl CountryList {
    pub fn asia() -> Self {
        Self::from_names(ASIA_COUNTRIES.iter().copied())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            countries: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Loads the list from a JSON array file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read country list {}", path.display()))?;
        let list: CountryList = serde_json::from_str(&content)
            .with_context(|| format!("country list {} is not a JSON array", path.display()))?;
        if list.is_empty() {
            anyhow::bail!("country list {} is empty", path.display());
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// `?1, ?2, …` placeholders, one per country.
    fn placeholders(&self) -> String {
        (1..=self.countries.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for CountryList {
    fn default() -> Self {
        Self::asia()
    }
}

/// Route totals by Asia membership of their endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteCounts {
    pub source_in_asia: i64,
    pub dest_in_asia: i64,
    pub both_in_asia: i64,
    pub touches_asia: i64,
}

/// Per-airline Asia route frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineFrequency {
    pub airline_id: Option<i64>,
    pub airline_code: Option<String>,
    pub airline_name: String,
    pub within_asia: i64,
    pub out_of_asia: i64,
    pub into_asia: i64,
    pub touches_asia_total: i64,
}

pub fn ensure_flag_columns(conn: &Connection) -> Result<()> {
    ensure_column(conn, "airline_routes", "source_in_asia", "BOOLEAN")?;
    ensure_column(conn, "airline_routes", "dest_in_asia", "BOOLEAN")?;
    Ok(())
}

/// Sets `source_in_asia` / `dest_in_asia` on every route.
///
/// Endpoints whose airport id matches no airport, or whose airport has no
/// country, are flagged FALSE.
#[tracing::instrument(skip_all, fields(countries = countries.len()))]
pub fn map_flags(conn: &Connection, countries: &CountryList) -> Result<()> {
    ensure_flag_columns(conn)?;

    let in_list = countries.placeholders();
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "UPDATE airline_routes SET source_in_asia = NULL, dest_in_asia = NULL",
        [],
    )?;
    tx.execute(
        &format!(
            "UPDATE airline_routes AS r
             SET source_in_asia = (a.country IN ({in_list}))
             FROM airports AS a
             WHERE r.source_airport_id = a.airport_id"
        ),
        params_from_iter(countries.countries.iter()),
    )?;
    tx.execute(
        &format!(
            "UPDATE airline_routes AS r
             SET dest_in_asia = (a.country IN ({in_list}))
             FROM airports AS a
             WHERE r.dest_airport_id = a.airport_id"
        ),
        params_from_iter(countries.countries.iter()),
    )?;
    tx.execute(
        "UPDATE airline_routes SET source_in_asia = FALSE WHERE source_in_asia IS NULL",
        [],
    )?;
    tx.execute(
        "UPDATE airline_routes SET dest_in_asia = FALSE WHERE dest_in_asia IS NULL",
        [],
    )?;
    tx.commit()?;

    info!("Asia flags updated on airline_routes");
    Ok(())
}

pub fn count_routes(conn: &Connection) -> Result<RouteCounts> {
    ensure_flag_columns(conn)?;

    let counts = conn.query_row(
        "SELECT
            COUNT(*) FILTER (WHERE source_in_asia = TRUE),
            COUNT(*) FILTER (WHERE dest_in_asia = TRUE),
            COUNT(*) FILTER (WHERE source_in_asia = TRUE AND dest_in_asia = TRUE),
            COUNT(*) FILTER (WHERE source_in_asia = TRUE OR dest_in_asia = TRUE)
         FROM airline_routes",
        [],
        |row| {
            Ok(RouteCounts {
                source_in_asia: row.get(0)?,
                dest_in_asia: row.get(1)?,
                both_in_asia: row.get(2)?,
                touches_asia: row.get(3)?,
            })
        },
    )?;

    info!(
        source_in_asia = counts.source_in_asia,
        dest_in_asia = counts.dest_in_asia,
        both_in_asia = counts.both_in_asia,
        touches_asia = counts.touches_asia,
        "Asia route counts"
    );
    Ok(counts)
}

/// Airlines with at least one route inside Asia, busiest first.
pub fn airline_frequencies(conn: &Connection, limit: usize) -> Result<Vec<AirlineFrequency>> {
    ensure_flag_columns(conn)?;

    let mut stmt = conn.prepare(
        "SELECT
            r.airline_id,
            r.airline_code,
            COALESCE(a.name, '(unknown)') AS airline_name,
            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = TRUE) AS within_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = FALSE) AS out_of_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = FALSE AND r.dest_in_asia = TRUE) AS into_asia,
            COUNT(*) FILTER (WHERE r.source_in_asia = TRUE OR r.dest_in_asia = TRUE) AS touches_asia_total
         FROM airline_routes r
         LEFT JOIN airlines a ON a.airline_id = r.airline_id
         GROUP BY r.airline_id, r.airline_code, a.name
         HAVING COUNT(*) FILTER (WHERE r.source_in_asia = TRUE AND r.dest_in_asia = TRUE) > 0
         ORDER BY touches_asia_total DESC, within_asia DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([i64::try_from(limit)?], |row| {
            Ok(AirlineFrequency {
                airline_id: row.get(0)?,
                airline_code: row.get(1)?,
                airline_name: row.get(2)?,
                within_asia: row.get(3)?,
                out_of_asia: row.get(4)?,
                into_asia: row.get(5)?,
                touches_asia_total: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
