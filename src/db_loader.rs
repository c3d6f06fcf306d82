//! Loads the cleaned CSVs into DuckDB. This is a separate run from
//! cleaning: three dimension tables are generated in SQL, the five fact
//! tables are bulk-ingested straight from the cleaned files.
//!
//! Unlike the cleaners, the loader is lenient about a missing fact
//! file: the dimension tables remain usable, so it warns and moves on.

use crate::zones::ZoneMap;
use anyhow::{Context, Result};
use duckdb::Connection;
use log::warn;
use std::path::Path;

/// Fact table name and the cleaned file that feeds it. Column order and
/// header names of the cleaned files define the destination schemas.
pub const FACT_FILES: [(&str, &str); 5] = [
    ("production_type_actual", "cleaned_generation.csv"),
    ("total_load", "cleaned_consumption.csv"),
    ("congestion_costs", "cleaned_costs.csv"),
    ("day_ahead_price", "cleaned_day_ahead_price.csv"),
    ("price_stats", "cleaned_price_stats.csv"),
];

/// Populates dimension and fact tables in the database at `db_path`.
pub fn load_database(db_path: &Path, cleaned_dir: &Path, zones: &ZoneMap) -> Result<()> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    load_dimensions(&conn, zones)?;
    load_facts(&conn, cleaned_dir)?;
    Ok(())
}

/// Zones from the injected table, months 2015-01..2025-03, days
/// 2015-01-05..2025-03-31, each with the same dense 1-based IDs the
/// cleaners assign.
pub fn load_dimensions(conn: &Connection, zones: &ZoneMap) -> Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE TABLE zone_dim (zone_id INTEGER, zone_name VARCHAR);",
    )?;
    {
        let mut stmt = conn.prepare("INSERT INTO zone_dim VALUES (?, ?)")?;
        for (name, id) in zones.entries() {
            stmt.execute(duckdb::params![id, name])?;
        }
    }

    conn.execute_batch(
        "CREATE OR REPLACE TABLE month_dim AS
         SELECT row_number() OVER (ORDER BY d) AS month_id, d::DATE AS date
         FROM generate_series(DATE '2015-01-01', DATE '2025-03-01', INTERVAL 1 MONTH) AS t(d);

         CREATE OR REPLACE TABLE day_dim AS
         SELECT row_number() OVER (ORDER BY d) AS day_id, d::DATE AS date
         FROM generate_series(DATE '2015-01-05', DATE '2025-03-31', INTERVAL 1 DAY) AS t(d);",
    )?;
    Ok(())
}

pub fn load_facts(conn: &Connection, cleaned_dir: &Path) -> Result<()> {
    for (table, file) in FACT_FILES {
        let path = cleaned_dir.join(file);
        if !path.exists() {
            warn!("skipping {table}: {} not found", path.display());
            continue;
        }
        let path_str = path
            .to_str()
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
        let sql = format!(
            "CREATE OR REPLACE TABLE {table} AS
             SELECT * FROM read_csv('{}', header = true, delim = ',');",
            path_str.replace('\'', "''")
        );
        conn.execute_batch(&sql)
            .with_context(|| format!("loading {table} from {}", path.display()))?;

        let rows: i64 =
            conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?;
        println!("  loaded {table}: {rows} rows");
    }
    Ok(())
}
