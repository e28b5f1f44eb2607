use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ufc_history::config::Config;
use ufc_history::pipeline::{self, PipelineProgress, ReportRun};
use ufc_history::scrape::ScrapeReport;

#[derive(Parser)]
#[command(name = "ufc_history")]
#[command(about = "Scrape ESPN fighter pages and build the UFC match history report")]
struct Cli {
    /// Which stages to run
    #[arg(long, value_enum, default_value = "full")]
    mode: Mode,

    /// Raw stats store (overrides UFC_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// In report mode, rewrite the outputs from the last saved snapshot
    /// instead of the raw store
    #[arg(long)]
    from_snapshot: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Scrape, then report
    Full,
    /// Only scrape into the raw stats store
    Scrape,
    /// Only rebuild the reports from an existing store
    Report,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ufc_history=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    tracing::info!(db = %config.db_path.display(), workers = config.workers, "starting");

    match cli.mode {
        Mode::Full => {
            let run = pipeline::run_full(&config, log_progress)?;
            print_scrape(&run.scrape);
            print_report(&run.report);
        }
        Mode::Scrape => {
            let scrape = pipeline::run_scrape(&config, log_progress)?;
            print_scrape(&scrape);
        }
        Mode::Report if cli.from_snapshot => {
            let report = pipeline::run_from_snapshot(&config, log_progress)?;
            print_report(&report);
        }
        Mode::Report => {
            let report = pipeline::run_report(&config, log_progress)?;
            print_report(&report);
        }
    }
    Ok(())
}

fn log_progress(progress: PipelineProgress) {
    let stage = progress.stage.label();
    if progress.current == 0 || progress.current == progress.total {
        tracing::info!(
            stage,
            current = progress.current,
            total = progress.total,
            "{}",
            progress.message
        );
    } else if progress.current % 500 == 0 {
        tracing::debug!(stage, current = progress.current, total = progress.total);
    }
}

fn print_scrape(scrape: &ScrapeReport) {
    println!("Scrape complete");
    println!("Letters: {}", scrape.letters);
    println!("Profiles: {}", scrape.profiles);
    println!("Fighters stored: {}", scrape.fighters);
    println!("History rows: {}", scrape.history_rows);
    println!("Stat rows: {}", scrape.stat_rows);
    if !scrape.errors.is_empty() {
        println!("Errors: {}", scrape.errors.len());
        for err in scrape.errors.iter().take(10) {
            println!("  {err}");
        }
    }
}

fn print_report(report: &ReportRun) {
    println!("Report complete");
    println!(
        "Workers: {}/{}",
        report.workers_completed, report.workers_spawned
    );
    println!(
        "History rows: {} ({} discarded)",
        report.seeds, report.discarded
    );
    println!("{} matches registered", report.registered());
    for failure in &report.output_failures {
        println!("Output failed: {failure}");
    }
}
