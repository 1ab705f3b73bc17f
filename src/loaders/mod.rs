//! Per-entity ingest of OpenFlights extracts.
//!
//! Every loader runs the same steps: normalize null markers, coerce types,
//! deduplicate by natural key, then upsert the batch inside one transaction.

pub mod aircraft;
pub mod airlines;
pub mod airports;
pub mod routes;

use std::collections::HashMap;
use std::hash::Hash;
use std::io::Read;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::dataset::Dataset;

/// Outcome of one loader run; also the row format of the load log.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub loaded_at: DateTime<Utc>,
    pub dataset: Dataset,
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

impl LoadSummary {
    pub fn new(dataset: Dataset, rows_read: usize) -> Self {
        LoadSummary {
            loaded_at: Utc::now(),
            dataset,
            rows_read,
            rows_written: 0,
            rows_skipped: 0,
        }
    }
}

/// Parsed records plus the number of source rows that were dropped.
#[derive(Debug)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Loads `reader` as `dataset` into the database.
pub fn load<R: Read>(
    conn: &Connection,
    dataset: Dataset,
    reader: R,
) -> anyhow::Result<LoadSummary> {
    match dataset {
        Dataset::Airlines => airlines::load_airlines(conn, reader),
        Dataset::Airports => airports::load_airports(conn, reader),
        Dataset::Routes => routes::load_routes(conn, reader),
        Dataset::Aircraft => aircraft::load_aircraft(conn, reader),
    }
}

/// Collapses records sharing a key. The last record wins but keeps the
/// position of the first one seen.
pub(crate) fn dedup_last_wins<T, K, F>(records: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let total = records.len();
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(total);
    let mut kept: Vec<T> = Vec::with_capacity(total);

    for record in records {
        let k = key(&record);
        if let Some(&i) = slots.get(&k) {
            kept[i] = record;
        } else {
            slots.insert(k, kept.len());
            kept.push(record);
        }
    }

    let dropped = total - kept.len();
    (kept, dropped)
}
