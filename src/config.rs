use crate::zones::ZoneMap;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Half-open date window [start, end). A row dated exactly `end` is
/// excluded; a row dated exactly `start` is included.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Everything a pipeline run needs wired in: directories, the zone
/// table, and the per-cleaner date windows.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub zone_map: ZoneMap,
    /// Monthly TSO datasets, months 2015-01 through 2025-03.
    pub tso_window: DateWindow,
    /// Daily day-ahead prices, days 2015-01-05 through 2025-03-31.
    pub price_window: DateWindow,
}

impl PipelineConfig {
    pub fn default_paths() -> Self {
        PipelineConfig {
            raw_dir: PathBuf::from("data/raw"),
            cleaned_dir: PathBuf::from("data/cleaned"),
            zone_map: ZoneMap::german_tsos(),
            tso_window: DateWindow::new(ymd(2015, 1, 1), ymd(2025, 4, 1)),
            price_window: DateWindow::new(ymd(2015, 1, 5), ymd(2025, 4, 1)),
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_closed_open() {
        let w = DateWindow::new(ymd(2015, 1, 5), ymd(2025, 3, 1));
        assert!(w.contains(ymd(2015, 1, 5)));
        assert!(w.contains(ymd(2025, 2, 28)));
        assert!(!w.contains(ymd(2025, 3, 1)));
        assert!(!w.contains(ymd(2015, 1, 4)));
    }
}
