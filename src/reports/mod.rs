//! Report queries over the loaded and derived tables.
//!
//! Each report is one SQL aggregation returning serializable rows that the
//! output layer writes as CSV or JSON.

pub mod asia;
pub mod hubs;
pub mod reach;
pub mod share;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Per-airline flights and seat capacity touching Asia
    Asia,
    /// Airlines using the busiest airports
    Hubs,
    /// Distinct airports served per airline
    Reach,
    /// Pie-chart slices of flights touching Asia
    Share,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Asia,
        ReportKind::Hubs,
        ReportKind::Reach,
        ReportKind::Share,
    ];

    /// Output file stem.
    pub fn file_stem(self) -> &'static str {
        match self {
            ReportKind::Asia => "asia_report",
            ReportKind::Hubs => "top_airports_report",
            ReportKind::Reach => "airlines_unique_airports_report",
            ReportKind::Share => "asia_report_flights_share",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}
