//! CLI entry point for the airdata tool.
//!
//! Provides subcommands for loading OpenFlights extracts into the SQLite
//! workspace, computing the derived flags and counts, exporting reports and
//! optionally publishing them to S3.

use airdata::analyzers::{operational, region, traffic};
use airdata::analyzers::region::CountryList;
use airdata::config::Settings;
use airdata::dataset::Dataset;
use airdata::db::{open_db, table_len};
use airdata::fetch::read_source;
use airdata::loaders::load;
use airdata::output::{append_record, print_json};
use airdata::pipeline::{DEFAULT_TOP_N, export_all, export_report, run_analysis};
use airdata::publish::upload_reports;
use airdata::reports::{ReportFormat, ReportKind};
use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "airdata")]
#[command(about = "Load OpenFlights datasets into SQLite and report on them", long_about = None)]
struct Cli {
    /// SQLite workspace file (overrides AIRDATA_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Directory for exported reports (overrides AIRDATA_OUTPUT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one extract from a file or URL
    Load {
        #[arg(value_enum)]
        dataset: Dataset,

        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
    /// Rebuild the operational_airlines table (active airlines only)
    Operational,
    /// Flag route endpoints located in Asia
    Flags {
        /// JSON array of country names replacing the built-in Asia list
        #[arg(long, value_name = "FILE")]
        countries: Option<PathBuf>,
    },
    /// Print route totals by Asia membership
    RegionCounts,
    /// Print airlines with routes inside Asia
    Frequencies {
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Recount inbound/outbound routes per airport
    Traffic,
    /// Export one report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,

        /// Airports (hubs) or slices (share) to keep
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
        format: ReportFormat,

        /// Optional: S3 bucket to upload the report to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Print the row count of a table
    Count { table: String },
    /// Load all extracts, derive flags and counts, export every report
    Pipeline {
        /// Directory holding airlines.dat, airports.dat, routes.dat and planes.dat
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Download the extracts from the OpenFlights repository instead
        #[arg(long, default_value_t = false)]
        remote: bool,

        /// JSON array of country names replacing the built-in Asia list
        #[arg(long, value_name = "FILE")]
        countries: Option<PathBuf>,

        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
        format: ReportFormat,

        /// Optional: S3 bucket to upload the reports to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Gzip compress files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let settings = Settings::from_env().with_overrides(cli.db.clone(), cli.output_dir.clone());

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = settings
        .log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = settings
        .log_file_path
        .file_name()
        .unwrap_or(OsStr::new("airdata.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let conn = open_db(&settings.db_path)?;
    info!(db = %settings.db_path.display(), "Workspace opened");

    match cli.command {
        Commands::Load { dataset, source } => {
            load_one(&conn, &settings, dataset, &source).await?;
        }
        Commands::Operational => {
            operational::rebuild(&conn)?;
        }
        Commands::Flags { countries } => {
            let countries = country_list(countries.as_deref())?;
            region::map_flags(&conn, &countries)?;
        }
        Commands::RegionCounts => {
            let counts = region::count_routes(&conn)?;
            print_json(&counts)?;
        }
        Commands::Frequencies { limit } => {
            let rows = region::airline_frequencies(&conn, limit)?;
            for r in &rows {
                info!(
                    airline_id = r.airline_id,
                    code = r.airline_code.as_deref().unwrap_or("-"),
                    name = %r.airline_name,
                    within = r.within_asia,
                    out = r.out_of_asia,
                    into = r.into_asia,
                    touches_total = r.touches_asia_total,
                    "Airline"
                );
            }
        }
        Commands::Traffic => {
            let summary = traffic::compute_airport_traffic(&conn)?;
            print_json(&summary)?;
        }
        Commands::Report {
            kind,
            top_n,
            format,
            s3_bucket,
            gzip,
        } => {
            let path = export_report(&conn, kind, format, top_n, &settings.output_dir)?;
            if let Some(bucket) = s3_bucket {
                publish(&bucket, &settings.s3_prefix, &[path], gzip).await?;
            }
        }
        Commands::Count { table } => {
            let count = table_len(&conn, &table)?;
            info!(table = %table, rows = count, "Table length");
        }
        Commands::Pipeline {
            data_dir,
            remote,
            countries,
            top_n,
            format,
            s3_bucket,
            gzip,
        } => {
            let countries = country_list(countries.as_deref())?;

            for dataset in Dataset::ALL {
                let source = if remote {
                    dataset.remote_url()
                } else {
                    data_dir.join(dataset.file_name()).display().to_string()
                };
                load_one(&conn, &settings, dataset, &source).await?;
            }

            let summary = run_analysis(&conn, &countries)?;
            print_json(&summary)?;

            let paths = export_all(&conn, format, top_n, &settings.output_dir)?;
            if let Some(bucket) = s3_bucket {
                publish(&bucket, &settings.s3_prefix, &paths, gzip).await?;
            }

            info!(reports = paths.len(), output_dir = %settings.output_dir.display(), "Pipeline finished");
        }
    }

    Ok(())
}

/// Reads one extract, loads it and appends the outcome to the load log.
async fn load_one(
    conn: &Connection,
    settings: &Settings,
    dataset: Dataset,
    source: &str,
) -> Result<()> {
    let bytes = read_source(source).await?;
    let summary = load(conn, dataset, &bytes[..])?;

    if summary.rows_written == 0 {
        warn!(dataset = %dataset, source, "Nothing written");
    }
    let rows = table_len(conn, dataset.table())?;
    info!(table = dataset.table(), rows, "Table length after load");
    append_record(&settings.load_log_path(), &summary)?;
    Ok(())
}

fn country_list(path: Option<&Path>) -> Result<CountryList> {
    match path {
        Some(path) => CountryList::load(path),
        None => Ok(CountryList::asia()),
    }
}

async fn publish(bucket: &str, prefix: &str, paths: &[PathBuf], gzip: bool) -> Result<()> {
    info!(bucket = %bucket, gzip, "S3 upload enabled");
    let config = aws_config::load_from_env().await;
    let client = aws_sdk_s3::Client::new(&config);
    upload_reports(&client, bucket, prefix, paths, gzip).await?;
    Ok(())
}
