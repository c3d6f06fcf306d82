//! Interface to the SMARD download-center collaborator.
//!
//! Each request mirrors the fields of the portal's export form (main
//! category, data category, country/bidding zone, date range,
//! resolution, filetype) and yields exactly one raw file, renamed
//! deterministically so the cleaners can find it by prefix and parse
//! the control zone back out of the name.
//!
//! The portal UI session is stateful, so jobs run strictly one after
//! another with a single in-flight download, and a settling delay after
//! the last job lets in-flight file-system writes land before cleaning
//! starts.

use crate::config::DateWindow;
use crate::zones::ControlZone;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Wait after the browser/download session ends before touching the raw
/// directory.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Month,
    Day,
}

impl Resolution {
    pub fn form_label(&self) -> &'static str {
        match self {
            Resolution::Month => "Resolution: Month",
            Resolution::Day => "Resolution: Day",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Resolution::Month => "month",
            Resolution::Day => "day",
        }
    }
}

/// One export-form submission.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub main_category: String,
    pub data_category: String,
    /// Dropdown label, e.g. "Control Area (DE): 50Hertz".
    pub bidding_zone: String,
    /// Filename prefix the cleaners glob for, e.g. "actual_generation".
    pub file_prefix: String,
    /// Zone slug embedded in the filename, e.g. "50hertz".
    pub zone_slug: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub resolution: Resolution,
    pub filetype: String,
}

impl DownloadRequest {
    /// Deterministic name encoding prefix, zone, resolution, and range:
    /// `actual_generation_50hertz_month_20150101_20250401.csv`.
    pub fn target_filename(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}.csv",
            self.file_prefix,
            self.zone_slug,
            self.resolution.slug(),
            self.start_date.format("%Y%m%d"),
            self.end_date.format("%Y%m%d"),
        )
    }
}

/// A producer of raw market-data files. The production implementation
/// talks to the portal; tests substitute a local double.
pub trait MarketDataSource {
    fn download(&self, request: &DownloadRequest, raw_dir: &Path) -> Result<PathBuf>;
}

/// HTTP source for the SMARD download center. The date range is
/// embedded in the URL query the same way the web form does it.
pub struct SmardDownloadCenter {
    base_url: String,
}

impl SmardDownloadCenter {
    pub fn new() -> Self {
        SmardDownloadCenter {
            base_url: "https://www.smard.de".to_string(),
        }
    }

    fn export_url(&self, request: &DownloadRequest) -> String {
        let from = request
            .start_date
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let to = request
            .end_date
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        format!(
            "{}/en/downloadcenter/download-market-data/?downloadAttributes=%7B%22from%22:{},%22to%22:{}%7D",
            self.base_url, from, to
        )
    }
}

impl Default for SmardDownloadCenter {
    fn default() -> Self {
        SmardDownloadCenter::new()
    }
}

impl MarketDataSource for SmardDownloadCenter {
    fn download(&self, request: &DownloadRequest, raw_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(raw_dir)
            .with_context(|| format!("creating {}", raw_dir.display()))?;

        let url = self.export_url(request);
        log::info!("GET {url}");
        let response = reqwest::blocking::get(&url)?.error_for_status()?;
        let body = response.bytes()?;

        let path = raw_dir.join(request.target_filename());
        fs::write(&path, &body)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// The fixed download plan: generation and consumption per control zone
/// at monthly resolution, plus the Germany/Luxembourg day-ahead price
/// series at daily resolution. Congestion-cost exports come from the
/// ENTSO-E transparency platform and are dropped into the raw directory
/// out of band.
pub fn default_scrape_plan(tso_window: DateWindow, price_window: DateWindow) -> Vec<DownloadRequest> {
    let mut plan = Vec::new();
    for zone in ControlZone::ALL {
        plan.push(DownloadRequest {
            main_category: "Main category: Electricity generation".to_string(),
            data_category: "Data category: Actual generation".to_string(),
            bidding_zone: zone.form_label(),
            file_prefix: "actual_generation".to_string(),
            zone_slug: zone.slug().to_string(),
            start_date: tso_window.start,
            end_date: tso_window.end,
            resolution: Resolution::Month,
            filetype: "CSV".to_string(),
        });
    }
    for zone in ControlZone::ALL {
        plan.push(DownloadRequest {
            main_category: "Main category: Electricity consumption".to_string(),
            data_category: "Data category: Actual consumption".to_string(),
            bidding_zone: zone.form_label(),
            file_prefix: "actual_consumption".to_string(),
            zone_slug: zone.slug().to_string(),
            start_date: tso_window.start,
            end_date: tso_window.end,
            resolution: Resolution::Month,
            filetype: "CSV".to_string(),
        });
    }
    plan.push(DownloadRequest {
        main_category: "Main category: Market".to_string(),
        data_category: "Data category: Day-ahead prices".to_string(),
        bidding_zone: "Country: Germany/Luxembourg".to_string(),
        file_prefix: "day-ahead_prices".to_string(),
        zone_slug: "germany".to_string(),
        start_date: price_window.start,
        end_date: price_window.end,
        resolution: Resolution::Day,
        filetype: "CSV".to_string(),
    });
    plan
}

/// Runs the plan strictly sequentially (one in-flight job; the portal
/// session is stateful) and sleeps `settle` afterwards. Any failed job
/// aborts the run.
pub fn run_scrape_plan(
    source: &dyn MarketDataSource,
    plan: &[DownloadRequest],
    raw_dir: &Path,
    settle: Duration,
) -> Result<Vec<PathBuf>> {
    let pb = ProgressBar::new(plan.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
            .unwrap(),
    );

    let mut downloaded = Vec::with_capacity(plan.len());
    for request in plan {
        pb.set_message(request.target_filename());
        let path = source
            .download(request, raw_dir)
            .with_context(|| format!("downloading {}", request.target_filename()))?;
        downloaded.push(path);
        pb.inc(1);
    }
    pb.finish_with_message("downloads complete");

    if !settle.is_zero() {
        std::thread::sleep(settle);
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct RecordingSource {
        calls: RefCell<Vec<String>>,
    }

    impl MarketDataSource for RecordingSource {
        fn download(&self, request: &DownloadRequest, raw_dir: &Path) -> Result<PathBuf> {
            self.calls.borrow_mut().push(request.target_filename());
            fs::create_dir_all(raw_dir)?;
            let path = raw_dir.join(request.target_filename());
            fs::write(&path, "Start date;End date\n")?;
            Ok(path)
        }
    }

    fn windows() -> (DateWindow, DateWindow) {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        (
            DateWindow::new(d(2015, 1, 1), d(2025, 4, 1)),
            DateWindow::new(d(2015, 1, 5), d(2025, 4, 1)),
        )
    }

    #[test]
    fn test_target_filename_roundtrips_through_cleaner_glob() {
        let (tso, price) = windows();
        let plan = default_scrape_plan(tso, price);
        let generation = &plan[0];
        assert_eq!(
            generation.target_filename(),
            "actual_generation_50hertz_month_20150101_20250401.csv"
        );
        let prices = plan.last().unwrap();
        assert_eq!(
            prices.target_filename(),
            "day-ahead_prices_germany_day_20150105_20250401.csv"
        );
    }

    #[test]
    fn test_plan_covers_every_zone_and_the_price_series() {
        let (tso, price) = windows();
        let plan = default_scrape_plan(tso, price);
        // 4 zones x {generation, consumption} + 1 price job
        assert_eq!(plan.len(), 9);
        assert_eq!(
            plan.iter().filter(|r| r.file_prefix == "actual_generation").count(),
            4
        );
        assert_eq!(
            plan.iter().filter(|r| r.resolution == Resolution::Day).count(),
            1
        );
    }

    #[test]
    fn test_jobs_run_in_plan_order() {
        let tmp = TempDir::new().unwrap();
        let (tso, price) = windows();
        let plan = default_scrape_plan(tso, price);
        let source = RecordingSource {
            calls: RefCell::new(Vec::new()),
        };

        let paths =
            run_scrape_plan(&source, &plan, tmp.path(), Duration::ZERO).unwrap();

        let expected: Vec<String> = plan.iter().map(|r| r.target_filename()).collect();
        assert_eq!(*source.calls.borrow(), expected);
        assert_eq!(paths.len(), plan.len());
        for path in paths {
            assert!(path.exists());
        }
    }
}
