//! General-purpose cleaner for the per-control-zone SMARD exports
//! (actual generation, actual consumption) and the ENTSO-E congestion
//! cost exports. One job concatenates every raw file matching its
//! prefix, normalizes dates, headers, and units, and emits a single
//! comma-delimited fact file keyed by surrogate zone and month IDs.

use crate::config::DateWindow;
use crate::errors::CleanError;
use crate::keys::{IdMap, MonthKey};
use crate::zones::ZoneMap;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::glob;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The load exports carry a "grid load incl. hydro pumped storage"
/// column that duplicates the sum of its sibling columns. It dates from
/// a portal schema change and is dropped so the fact table stays free
/// of double counting.
pub const REDUNDANT_PUMPED_STORAGE_TOTAL: &str = "grid_load_incl._hydro_pumped_storage";

/// One cleaning job: which raw files to pick up, what to call the
/// cleaned output, and which half-open date window to keep.
#[derive(Debug, Clone)]
pub struct TsoCleanJob {
    pub input_prefix: String,
    pub output_name: String,
    pub window: DateWindow,
    /// Raw-file field delimiter; SMARD exports are semicolon-delimited,
    /// ENTSO-E congestion exports are tab-delimited.
    pub delimiter: u8,
    /// Resolution tag embedded in the filenames, "month" for all
    /// current datasets.
    pub resolution: String,
}

impl TsoCleanJob {
    pub fn new(input_prefix: &str, output_name: &str, window: DateWindow) -> Self {
        TsoCleanJob {
            input_prefix: input_prefix.to_string(),
            output_name: output_name.to_string(),
            window,
            delimiter: b';',
            resolution: "month".to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn file_pattern(&self) -> String {
        format!("{}_*_{}_*.csv", self.input_prefix, self.resolution)
    }
}

struct ParsedRow {
    zone: String,
    date: NaiveDate,
    values: HashMap<String, f64>,
}

/// Runs one cleaning job and returns the path of the cleaned CSV.
///
/// Output columns are `control_zone_id,month_id,<measures...>` with
/// measures in first-seen raw order (union across input files; a column
/// absent from a file is filled with 0.0 for its rows). Month IDs are
/// dense, 1-based, and local to this job's distinct filtered dates.
pub fn clean_energy_dataset(
    job: &TsoCleanJob,
    zones: &ZoneMap,
    raw_dir: &Path,
    out_dir: &Path,
) -> Result<PathBuf> {
    let pattern = raw_dir.join(job.file_pattern());
    let pattern_str = pattern
        .to_str()
        .context("raw data directory is not valid UTF-8")?;

    let mut files: Vec<PathBuf> = glob(pattern_str)?.filter_map(Result::ok).collect();
    files.sort();
    if files.is_empty() {
        // operating on an empty concatenation is never silently tolerated
        return Err(CleanError::MissingInput {
            pattern: job.file_pattern(),
            dir: raw_dir.to_path_buf(),
        }
        .into());
    }

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<ParsedRow> = Vec::new();
    for file in &files {
        read_raw_file(file, job, &mut columns, &mut rows)
            .with_context(|| format!("cleaning {}", file.display()))?;
    }

    columns.retain(|c| c != REDUNDANT_PUMPED_STORAGE_TOTAL);

    let months = IdMap::from_keys(rows.iter().map(|r| MonthKey::from_date(r.date)));

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let out_path = out_dir.join(format!("{}.csv", job.output_name));
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;

    let mut header = vec!["control_zone_id".to_string(), "month_id".to_string()];
    header.extend(columns.iter().cloned());
    writer.write_record(&header)?;

    for row in &rows {
        let zone_id = zones.id_of(&row.zone).ok_or_else(|| CleanError::UnknownZone {
            zone: row.zone.clone(),
            file: job.input_prefix.clone(),
        })?;
        let month_id = months
            .get(&MonthKey::from_date(row.date))
            .context("month id missing for a filtered row")?;

        let mut record = vec![zone_id.to_string(), month_id.to_string()];
        for column in &columns {
            let value = row.values.get(column).copied().unwrap_or(0.0);
            record.push(format_measure(value));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(out_path)
}

fn read_raw_file(
    file: &Path,
    job: &TsoCleanJob,
    columns: &mut Vec<String>,
    rows: &mut Vec<ParsedRow>,
) -> Result<()> {
    let zone = zone_from_filename(file, &job.resolution)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<raw file>")
        .to_string();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(job.delimiter)
        .flexible(true)
        .from_path(file)?;
    let headers = reader.headers()?.clone();

    // start of interval is the row date; the end column is discarded
    let mut start_idx = None;
    let mut measures: Vec<(usize, String)> = Vec::new();
    for (idx, raw_header) in headers.iter().enumerate() {
        let trimmed = raw_header.trim();
        // SMARD calls the start-of-interval column "Start date",
        // ENTSO-E calls it "DateTime"
        if trimmed.eq_ignore_ascii_case("start date") || trimmed.eq_ignore_ascii_case("datetime") {
            start_idx = Some(idx);
        } else if trimmed.eq_ignore_ascii_case("end date") {
            continue;
        } else {
            let name = normalize_header(trimmed);
            if !columns.contains(&name) {
                columns.push(name.clone());
            }
            measures.push((idx, name));
        }
    }
    let start_idx = start_idx
        .with_context(|| format!("{file_name}: no 'Start date' column"))?;

    for record in reader.records() {
        let record = record?;
        let raw_date = record.get(start_idx).unwrap_or("").trim();
        let date = parse_portal_date(raw_date)
            .with_context(|| format!("{file_name}: unparseable date '{raw_date}'"))?;
        if !job.window.contains(date) {
            continue;
        }

        let mut values = HashMap::with_capacity(measures.len());
        for (idx, name) in &measures {
            let cell = record.get(*idx).unwrap_or("");
            let value = parse_measure(cell).ok_or_else(|| CleanError::MalformedValue {
                value: cell.to_string(),
                column: name.clone(),
                file: file_name.clone(),
            })?;
            values.insert(name.clone(), value);
        }
        rows.push(ParsedRow {
            zone: zone.clone(),
            date,
            values,
        });
    }
    Ok(())
}

/// Downloaded files are named `<prefix>_<zone>_<resolution>_<range>.csv`;
/// the zone is the last underscore segment before the resolution tag.
fn zone_from_filename(file: &Path, resolution: &str) -> Result<String> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let marker = format!("_{resolution}_");
    let zone = stem
        .split_once(&marker)
        .map(|(head, _)| head)
        .and_then(|head| head.rsplit('_').next())
        .filter(|z| !z.is_empty());
    match zone {
        Some(z) => Ok(z.to_string()),
        None => Err(CleanError::UnrecognizedFilename {
            file: stem.to_string(),
        }
        .into()),
    }
}

/// Cuts unit suffixes ("Grid load [MWh] ..." -> "grid_load") and
/// underscores the remainder.
fn normalize_header(header: &str) -> String {
    let base = header.split(" [").next().unwrap_or(header);
    base.trim().to_lowercase().replace(' ', "_")
}

/// "-" and empty cells are the portal's missing-value sentinels and
/// become 0.0; locale thousands separators are stripped; anything else
/// non-numeric is malformed and must surface, not be masked as zero.
fn parse_measure(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Some(0.0);
    }
    trimmed.replace(',', "").parse::<f64>().ok()
}

fn format_measure(value: f64) -> String {
    // keep integral values as "0.0" style so re-runs stay byte-identical
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Dates as the portal exports them ("Jan 1, 2015") plus the ISO,
/// European, and timestamped forms seen in ENTSO-E files.
pub fn parse_portal_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%b %d, %Y", "%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateWindow;
    use std::fs;
    use tempfile::TempDir;

    fn window(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    fn write_raw(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn run_job(raw: &Path, out: &Path, job: &TsoCleanJob) -> String {
        let path = clean_energy_dataset(job, &ZoneMap::german_tsos(), raw, out).unwrap();
        fs::read_to_string(path).unwrap()
    }

    const GENERATION_50HERTZ: &str = "\
Start date;End date;Biomass [MWh] Calculated resolutions;Wind onshore [MWh] Calculated resolutions
Jan 1, 2015;Feb 1, 2015;1,016.25;2,500
Feb 1, 2015;Mar 1, 2015;-;3,000
";

    const GENERATION_AMPRION: &str = "\
Start date;End date;Biomass [MWh] Calculated resolutions;Wind onshore [MWh] Calculated resolutions
Jan 1, 2015;Feb 1, 2015;500;700.5
";

    #[test]
    fn test_clean_generation_two_zones() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_raw(&raw, "actual_generation_50hertz_month_20150101_20250401.csv", GENERATION_50HERTZ);
        write_raw(&raw, "actual_generation_amprion_month_20150101_20250401.csv", GENERATION_AMPRION);

        let job = TsoCleanJob::new(
            "actual_generation",
            "cleaned_generation",
            window((2015, 1, 1), (2025, 4, 1)),
        );
        let output = run_job(&raw, &tmp.path().join("cleaned"), &job);

        let mut lines = output.lines();
        assert_eq!(lines.next().unwrap(), "control_zone_id,month_id,biomass,wind_onshore");
        // files are processed in sorted order: 50hertz rows first
        assert_eq!(lines.next().unwrap(), "1,1,1016.25,2500.0");
        assert_eq!(lines.next().unwrap(), "1,2,0.0,3000.0"); // "-" sentinel
        assert_eq!(lines.next().unwrap(), "2,1,500.0,700.5");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_date_window_is_closed_open() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_raw(
            &raw,
            "actual_consumption_tennet_month_x.csv",
            "Start date;End date;Grid load [MWh]\n\
             Jan 1, 2015;Feb 1, 2015;100\n\
             Feb 1, 2015;Mar 1, 2015;200\n\
             Mar 1, 2015;Apr 1, 2015;300\n",
        );

        let job = TsoCleanJob::new(
            "actual_consumption",
            "cleaned_consumption",
            window((2015, 2, 1), (2015, 3, 1)),
        );
        let output = run_job(&raw, &tmp.path().join("cleaned"), &job);

        // start boundary included, end boundary excluded, ids re-ranked from 1
        assert_eq!(output, "control_zone_id,month_id,grid_load\n3,1,200.0\n");
    }

    #[test]
    fn test_redundant_pumped_storage_total_dropped() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_raw(
            &raw,
            "actual_consumption_amprion_month_x.csv",
            "Start date;End date;Grid load incl. hydro pumped storage [MWh];Grid load [MWh];Hydro pumped storage [MWh]\n\
             Jan 1, 2015;Feb 1, 2015;110;100;10\n",
        );

        let job = TsoCleanJob::new(
            "actual_consumption",
            "cleaned_consumption",
            window((2015, 1, 1), (2016, 1, 1)),
        );
        let output = run_job(&raw, &tmp.path().join("cleaned"), &job);

        assert_eq!(
            output,
            "control_zone_id,month_id,grid_load,hydro_pumped_storage\n2,1,100.0,10.0\n"
        );
    }

    #[test]
    fn test_missing_input_fails_loudly() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();

        let job = TsoCleanJob::new(
            "actual_generation",
            "cleaned_generation",
            window((2015, 1, 1), (2016, 1, 1)),
        );
        let err = clean_energy_dataset(&job, &ZoneMap::german_tsos(), &raw, tmp.path())
            .unwrap_err();
        let clean_err = err.downcast_ref::<CleanError>().unwrap();
        assert!(matches!(clean_err, CleanError::MissingInput { .. }));
    }

    #[test]
    fn test_malformed_value_is_surfaced_not_zeroed() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_raw(
            &raw,
            "actual_generation_tennet_month_x.csv",
            "Start date;End date;Biomass [MWh]\nJan 1, 2015;Feb 1, 2015;n/a\n",
        );

        let job = TsoCleanJob::new(
            "actual_generation",
            "cleaned_generation",
            window((2015, 1, 1), (2016, 1, 1)),
        );
        let err = clean_energy_dataset(&job, &ZoneMap::german_tsos(), &raw, tmp.path())
            .unwrap_err();
        assert!(format!("{err:#}").contains("malformed value 'n/a'"));
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_raw(&raw, "actual_generation_50hertz_month_x.csv", GENERATION_50HERTZ);
        write_raw(&raw, "actual_generation_amprion_month_x.csv", GENERATION_AMPRION);

        let job = TsoCleanJob::new(
            "actual_generation",
            "cleaned_generation",
            window((2015, 1, 1), (2025, 4, 1)),
        );
        let first = run_job(&raw, &tmp.path().join("cleaned"), &job);
        let second = run_job(&raw, &tmp.path().join("cleaned"), &job);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zone_parsed_from_filename() {
        let path = Path::new("data/raw/actual_generation_50hertz_month_20150101_20250401.csv");
        assert_eq!(zone_from_filename(path, "month").unwrap(), "50hertz");
        assert!(zone_from_filename(Path::new("noise.csv"), "month").is_err());
    }
}
