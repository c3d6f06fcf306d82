use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};

mod config;
mod db_loader;
mod errors;
mod keys;
mod price_cleaner;
mod scrape;
mod stats;
mod tso_cleaner;
mod zones;

use config::PipelineConfig;
use errors::CleanError;
use scrape::{default_scrape_plan, run_scrape_plan, SmardDownloadCenter, SETTLE_DELAY};
use tso_cleaner::{clean_energy_dataset, TsoCleanJob};

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let cfg = PipelineConfig::default_paths();

    if args.len() > 1 && args[1] == "--scrape" {
        run_scrape(&cfg)?;
    } else if args.len() > 1 && args[1] == "--clean" {
        run_clean(&cfg)?;
    } else if args.len() > 1 && args[1] == "--load" {
        let db_path = if args.len() > 2 {
            PathBuf::from(&args[2])
        } else {
            PathBuf::from("de_energy.duckdb")
        };
        run_load(&cfg, &db_path)?;
    } else if args.len() > 1 && args[1] == "--all" {
        run_scrape(&cfg)?;
        run_clean(&cfg)?;
    } else {
        println!("German energy market pipeline (SMARD / ENTSO-E)");
        println!("{}", "=".repeat(60));
        println!("Usage:");
        println!("  --scrape          download raw exports into data/raw");
        println!("  --clean           clean raw exports into data/cleaned");
        println!("  --load [db.duckdb] load cleaned CSVs into DuckDB");
        println!("  --all             scrape, settle, then clean");
    }

    Ok(())
}

fn run_scrape(cfg: &PipelineConfig) -> Result<()> {
    println!("🌐 Downloading raw exports from the SMARD download center");
    println!("{}", "=".repeat(60));

    let source = SmardDownloadCenter::new();
    let plan = default_scrape_plan(cfg.tso_window, cfg.price_window);
    let files = run_scrape_plan(&source, &plan, &cfg.raw_dir, SETTLE_DELAY)?;
    println!("✅ {} raw files in {}", files.len(), cfg.raw_dir.display());
    Ok(())
}

/// Cleaning jobs in fixed order. Any failure halts the run: a partial
/// cleaned set would silently corrupt the load step.
fn run_clean(cfg: &PipelineConfig) -> Result<()> {
    println!("🧹 Cleaning raw exports");
    println!("{}", "=".repeat(60));

    let jobs = [
        TsoCleanJob::new("actual_generation", "cleaned_generation", cfg.tso_window),
        TsoCleanJob::new("actual_consumption", "cleaned_consumption", cfg.tso_window),
        // ENTSO-E congestion exports are tab-delimited
        TsoCleanJob::new("congestion_costs", "cleaned_costs", cfg.tso_window)
            .with_delimiter(b'\t'),
    ];
    for job in &jobs {
        let out = clean_energy_dataset(job, &cfg.zone_map, &cfg.raw_dir, &cfg.cleaned_dir)?;
        println!("  {} -> {}", job.input_prefix, out.display());
    }

    let price_input = find_price_export(&cfg.raw_dir)?;
    let outputs =
        price_cleaner::clean_day_ahead_price(&price_input, cfg.price_window, &cfg.cleaned_dir)?;
    println!("  day-ahead prices -> {}", outputs.daily.display());
    println!("  price volatility -> {}", outputs.volatility.display());
    println!("  monthly price stats -> {}", outputs.descriptive.display());

    println!("✅ Cleaning complete");
    Ok(())
}

fn run_load(cfg: &PipelineConfig, db_path: &Path) -> Result<()> {
    println!("🗄️  Loading {} into {}", cfg.cleaned_dir.display(), db_path.display());
    println!("{}", "=".repeat(60));
    db_loader::load_database(db_path, &cfg.cleaned_dir, &cfg.zone_map)?;
    println!("✅ Load complete");
    Ok(())
}

/// The day-ahead price export, located by prefix. Absence aborts the
/// cleaning run like any other missing input.
fn find_price_export(raw_dir: &Path) -> Result<PathBuf> {
    let pattern = raw_dir.join("day-ahead_prices_*.csv");
    let pattern_str = pattern
        .to_str()
        .context("raw data directory is not valid UTF-8")?;
    let mut matches: Vec<PathBuf> = glob(pattern_str)?.filter_map(Result::ok).collect();
    matches.sort();
    matches.into_iter().next().ok_or_else(|| {
        CleanError::MissingInput {
            pattern: "day-ahead_prices_*.csv".to_string(),
            dir: raw_dir.to_path_buf(),
        }
        .into()
    })
}
