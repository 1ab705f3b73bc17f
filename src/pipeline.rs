//! Step sequencing shared by the CLI subcommands.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::analyzers::region::{self, CountryList, RouteCounts};
use crate::analyzers::traffic::{self, TrafficSummary};
use crate::analyzers::operational;
use crate::output::{CsvRow, write_csv, write_json};
use crate::reports::{ReportFormat, ReportKind, asia, hubs, reach, share};

pub const DEFAULT_TOP_N: usize = 10;

/// Everything the derive step computed, logged at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub operational_airlines: i64,
    pub route_counts: RouteCounts,
    pub traffic: TrafficSummary,
}

/// Rebuilds operational airlines, Asia flags and airport traffic counts.
#[tracing::instrument(skip_all)]
pub fn run_analysis(conn: &Connection, countries: &CountryList) -> Result<AnalysisSummary> {
    let operational_airlines = operational::rebuild(conn)?;
    region::map_flags(conn, countries)?;
    let route_counts = region::count_routes(conn)?;
    let traffic = traffic::compute_airport_traffic(conn)?;

    Ok(AnalysisSummary {
        operational_airlines,
        route_counts,
        traffic,
    })
}

fn write_rows<T: CsvRow>(path: &Path, rows: &[T], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Csv => write_csv(path, rows),
        ReportFormat::Json => write_json(path, &rows),
    }
}

/// Runs one report and writes it under `output_dir`; returns the file path.
///
/// The share report is read from `asia_report`, which is rebuilt first.
#[tracing::instrument(skip(conn, output_dir))]
pub fn export_report(
    conn: &Connection,
    kind: ReportKind,
    format: ReportFormat,
    top_n: usize,
    output_dir: &Path,
) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.{}", kind.file_stem(), format.extension()));

    let rows = match kind {
        ReportKind::Asia => {
            let report = asia::build_report(conn)?;
            write_rows(&path, &report.rows, format)?;
            report.rows.len()
        }
        ReportKind::Hubs => {
            let rows = hubs::airlines_at_top_airports(conn, top_n)?;
            write_rows(&path, &rows, format)?;
            rows.len()
        }
        ReportKind::Reach => {
            let rows = reach::unique_airports_per_airline(conn)?;
            write_rows(&path, &rows, format)?;
            rows.len()
        }
        ReportKind::Share => {
            asia::build_report(conn)?;
            let share = share::flight_share(conn, top_n)?;
            match format {
                ReportFormat::Csv => write_csv(&path, &share.slices)?,
                ReportFormat::Json => write_json(&path, &share)?,
            }
            share.slices.len()
        }
    };

    info!(path = %path.display(), rows, "Report exported");
    Ok(path)
}

/// Exports every report kind; returns the written paths in order.
pub fn export_all(
    conn: &Connection,
    format: ReportFormat,
    top_n: usize,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    ReportKind::ALL
        .iter()
        .map(|&kind| export_report(conn, kind, format, top_n, output_dir))
        .collect()
}
