use rusqlite::Connection;
use tracing::info;

use crate::db::table_len;

/// Rebuilds `operational_airlines` as the active (`'Y'`) subset of `airlines`.
///
/// Returns the number of operational airlines.
#[tracing::instrument(skip_all)]
pub fn rebuild(conn: &Connection) -> anyhow::Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DROP TABLE IF EXISTS operational_airlines;
         CREATE TABLE operational_airlines AS
         SELECT *
         FROM airlines
         WHERE active = 'Y';",
    )?;
    tx.commit()?;

    let count = table_len(conn, "operational_airlines")?;
    info!(operational_airlines = count, "operational_airlines table created");
    Ok(count)
}
