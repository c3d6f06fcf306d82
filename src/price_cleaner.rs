//! Cleaner for the Germany day-ahead price export and its monthly
//! volatility aggregations.
//!
//! The raw file carries two price columns because the DE/AT/LU bidding
//! zone was split on 2018-10-01: the legacy column holds values before
//! the split, the Germany/Luxembourg column after it. For any given day
//! exactly one of them is populated.

use crate::config::DateWindow;
use crate::errors::CleanError;
use crate::keys::{DayKey, IdMap, MonthKey};
use crate::stats;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Pre-split DE/AT/LU price column.
pub const LEGACY_PRICE_COLUMN: &str = "DE/AT/LU [\u{20ac}/MWh] Calculated resolutions";
/// Post-split Germany/Luxembourg price column.
pub const REPLACEMENT_PRICE_COLUMN: &str =
    "Germany/Luxembourg [\u{20ac}/MWh] Calculated resolutions";

/// The bidding-zone-split merge rule: the two raw columns form one
/// logical series, preferring the legacy value when present. "-" counts
/// as absent. Days where neither column is populated are dropped.
pub fn merge_bidding_zone_prices(legacy: Option<f64>, replacement: Option<f64>) -> Option<f64> {
    legacy.or(replacement)
}

#[derive(Debug, Serialize)]
struct DailyPriceRow {
    day_id: u32,
    price: f64,
}

#[derive(Debug, Serialize)]
struct VolatilityRow {
    month_id: u32,
    /// Coefficient of variation of daily prices; null when the month
    /// has fewer than two observed days.
    volatility: Option<f64>,
}

/// The alternative monthly aggregation kept distinct from the
/// coefficient-of-variation table: here "volatility" is the raw sample
/// standard deviation, reported alongside max/min/median.
#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyPriceStats {
    pub month_id: u32,
    pub volatility: Option<f64>,
    pub max_price: f64,
    pub min_price: f64,
    pub median_price: f64,
}

/// Paths of the three cleaned price outputs.
#[derive(Debug)]
pub struct PriceCleanOutputs {
    pub daily: PathBuf,
    pub volatility: PathBuf,
    pub descriptive: PathBuf,
}

/// Cleans the day-ahead price export: merges the split price columns,
/// filters to `[start, end)`, assigns dense chronological day IDs, and
/// writes the daily series plus both monthly aggregation variants.
pub fn clean_day_ahead_price(
    input_file: &Path,
    window: DateWindow,
    out_dir: &Path,
) -> Result<PriceCleanOutputs> {
    let series = read_daily_prices(input_file, window)
        .with_context(|| format!("cleaning {}", input_file.display()))?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let days = IdMap::from_keys(series.iter().map(|(date, _)| DayKey::from_date(*date)));
    let daily = out_dir.join("cleaned_day_ahead_price.csv");
    let mut writer = csv::Writer::from_path(&daily)?;
    for (date, price) in &series {
        let day_id = days
            .get(&DayKey::from_date(*date))
            .context("day id missing for a filtered row")?;
        writer.serialize(DailyPriceRow { day_id, price: *price })?;
    }
    writer.flush()?;

    let volatility = out_dir.join("cleaned_price_stats.csv");
    let mut writer = csv::Writer::from_path(&volatility)?;
    for row in monthly_coefficient_of_variation_rows(&series) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let descriptive = out_dir.join("cleaned_monthly_price_stats.csv");
    let mut writer = csv::Writer::from_path(&descriptive)?;
    for row in monthly_descriptive_stats(&series) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(PriceCleanOutputs {
        daily,
        volatility,
        descriptive,
    })
}

fn read_daily_prices(input_file: &Path, window: DateWindow) -> Result<Vec<(NaiveDate, f64)>> {
    let file_name = input_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<price file>")
        .to_string();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(input_file)
        .with_context(|| format!("opening {}", input_file.display()))?;
    let headers = reader.headers()?.clone();

    let mut start_idx = None;
    let mut legacy_idx = None;
    let mut replacement_idx = None;
    for (idx, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        if trimmed.eq_ignore_ascii_case("start date") {
            start_idx = Some(idx);
        } else if trimmed == LEGACY_PRICE_COLUMN {
            legacy_idx = Some(idx);
        } else if trimmed == REPLACEMENT_PRICE_COLUMN {
            replacement_idx = Some(idx);
        }
    }
    let start_idx = start_idx.with_context(|| format!("{file_name}: no 'Start date' column"))?;
    let legacy_idx =
        legacy_idx.with_context(|| format!("{file_name}: no '{LEGACY_PRICE_COLUMN}' column"))?;
    let replacement_idx = replacement_idx
        .with_context(|| format!("{file_name}: no '{REPLACEMENT_PRICE_COLUMN}' column"))?;

    let mut series = Vec::new();
    for record in reader.records() {
        let record = record?;
        let raw_date = record.get(start_idx).unwrap_or("").trim();
        let date = crate::tso_cleaner::parse_portal_date(raw_date)
            .with_context(|| format!("{file_name}: unparseable date '{raw_date}'"))?;
        if !window.contains(date) {
            continue;
        }

        let legacy = parse_optional_price(record.get(legacy_idx).unwrap_or(""))
            .map_err(|value| malformed(value, LEGACY_PRICE_COLUMN, &file_name))?;
        let replacement = parse_optional_price(record.get(replacement_idx).unwrap_or(""))
            .map_err(|value| malformed(value, REPLACEMENT_PRICE_COLUMN, &file_name))?;

        if let Some(price) = merge_bidding_zone_prices(legacy, replacement) {
            series.push((date, price));
        }
    }
    Ok(series)
}

/// Monthly volatility as coefficient of variation (sample std / mean)
/// of the daily prices, grouped by truncating each date to its month
/// and re-ranking the distinct months from 1.
pub fn monthly_coefficient_of_variation(series: &[(NaiveDate, f64)]) -> Vec<(u32, Option<f64>)> {
    grouped_by_month(series)
        .map(|(month_id, prices)| (month_id, stats::coefficient_of_variation(&prices)))
        .collect()
}

fn monthly_coefficient_of_variation_rows(
    series: &[(NaiveDate, f64)],
) -> impl Iterator<Item = VolatilityRow> + '_ {
    monthly_coefficient_of_variation(series)
        .into_iter()
        .map(|(month_id, volatility)| VolatilityRow {
            month_id,
            volatility,
        })
}

/// Monthly descriptive statistics: sample standard deviation reported
/// as volatility plus max/min/median. Deliberately not unified with the
/// coefficient-of-variation table; the two formulas are distinct.
pub fn monthly_descriptive_stats(series: &[(NaiveDate, f64)]) -> Vec<MonthlyPriceStats> {
    grouped_by_month(series)
        .map(|(month_id, prices)| MonthlyPriceStats {
            month_id,
            volatility: stats::sample_std(&prices),
            max_price: prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            min_price: prices.iter().cloned().fold(f64::INFINITY, f64::min),
            // groups are non-empty by construction
            median_price: stats::median(&prices).unwrap(),
        })
        .collect()
}

fn grouped_by_month(series: &[(NaiveDate, f64)]) -> impl Iterator<Item = (u32, Vec<f64>)> {
    let mut groups: BTreeMap<MonthKey, Vec<f64>> = BTreeMap::new();
    for (date, price) in series {
        groups.entry(MonthKey::from_date(*date)).or_default().push(*price);
    }
    // BTreeMap iterates chronologically, so enumeration is the dense rank
    groups
        .into_values()
        .enumerate()
        .map(|(rank, prices)| (rank as u32 + 1, prices))
}

fn parse_optional_price(cell: &str) -> std::result::Result<Option<f64>, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(None);
    }
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| trimmed.to_string())
}

fn malformed(value: String, column: &str, file: &str) -> anyhow::Error {
    CleanError::MalformedValue {
        value,
        column: column.to_string(),
        file: file.to_string(),
    }
    .into()
}
