use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::coordinator::run_partitioned;
use crate::cumulative::accumulate_career_totals;
use crate::dedup::{dedup_records, order_records};
use crate::match_history;
use crate::match_record::MatchRecord;
use crate::report::write_report;
use crate::scrape::{ScrapeReport, scrape_into_store};
use crate::snapshot::{MatchSnapshot, load_snapshot, save_snapshot};
use crate::stats_store::StatsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scrape,
    Reconstruct,
    Dedup,
    Cumulative,
    Output,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Scrape => "scrape",
            Stage::Reconstruct => "reconstruct",
            Stage::Dedup => "dedup",
            Stage::Cumulative => "cumulative",
            Stage::Output => "output",
        }
    }
}

pub struct PipelineProgress {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ReportRun {
    pub seeds: usize,
    pub workers_spawned: usize,
    pub workers_completed: usize,
    pub reconstructed: usize,
    pub discarded: usize,
    pub matches: Vec<MatchRecord>,
    pub totals: Vec<MatchRecord>,
    pub output_failures: Vec<String>,
}

impl ReportRun {
    pub fn registered(&self) -> usize {
        self.matches.len()
    }
}

#[derive(Debug, Default)]
pub struct FullRun {
    pub scrape: ScrapeReport,
    pub report: ReportRun,
}

/// Rebuilds the raw store at `config.db_path` from a fresh scrape. Any
/// previous contents are dropped first.
pub fn run_scrape(
    config: &Config,
    mut on_progress: impl FnMut(PipelineProgress),
) -> Result<ScrapeReport> {
    let store = StatsStore::open(&config.db_path)?;
    store.reset()?;
    scrape_into_store(
        &store,
        &config.search_letters,
        config.fetch_parallelism,
        |p| {
            on_progress(PipelineProgress {
                stage: Stage::Scrape,
                current: p.current,
                total: p.total,
                message: p.message,
            })
        },
    )
}

/// Reads the existing store at `config.db_path`, reconstructs, dedups and
/// orders matches, derives career totals and writes every output. A missing
/// store is an error and leaves previous outputs untouched. Output failures
/// are recorded in the result rather than returned.
pub fn run_report(
    config: &Config,
    on_progress: impl Fn(PipelineProgress) + Sync,
) -> Result<ReportRun> {
    let seeds = StatsStore::open_existing(&config.db_path)?.query_match_seeds()?;
    let total = seeds.len();
    on_progress(PipelineProgress {
        stage: Stage::Reconstruct,
        current: 0,
        total,
        message: format!("{total} history rows"),
    });

    let run = run_partitioned(
        &config.db_path,
        config.scratch_dir.as_deref(),
        &seeds,
        config.workers,
        |done| {
            on_progress(PipelineProgress {
                stage: Stage::Reconstruct,
                current: done,
                total,
                message: String::new(),
            })
        },
    )?;
    let reconstructed = run.records.iter().filter(|r| r.is_some()).count();

    on_progress(PipelineProgress {
        stage: Stage::Dedup,
        current: 0,
        total: run.records.len(),
        message: format!("{reconstructed} reconstructed"),
    });
    let matches = order_records(dedup_records(run.records));

    on_progress(PipelineProgress {
        stage: Stage::Cumulative,
        current: 0,
        total: matches.len(),
        message: format!("{} unique matches", matches.len()),
    });
    let totals = accumulate_career_totals(&matches);

    let mut out = ReportRun {
        seeds: total,
        workers_spawned: run.workers_spawned,
        workers_completed: run.workers_completed,
        reconstructed,
        discarded: total.saturating_sub(reconstructed),
        matches,
        totals,
        output_failures: Vec::new(),
    };
    write_outputs(config, &mut out, true, &on_progress);
    Ok(out)
}

/// Rewrites the workbooks and `MatchHistory` from the snapshot saved by an
/// earlier report run, without touching the raw store.
pub fn run_from_snapshot(
    config: &Config,
    on_progress: impl Fn(PipelineProgress),
) -> Result<ReportRun> {
    let snapshot = load_snapshot(&config.snapshot_path)?;
    tracing::info!(
        path = %config.snapshot_path.display(),
        matches = snapshot.matches.len(),
        "snapshot loaded"
    );
    let mut out = ReportRun {
        matches: snapshot.matches,
        totals: snapshot.totals,
        ..ReportRun::default()
    };
    write_outputs(config, &mut out, false, &on_progress);
    Ok(out)
}

pub fn run_full(
    config: &Config,
    on_progress: impl Fn(PipelineProgress) + Sync,
) -> Result<FullRun> {
    let scrape = run_scrape(config, &on_progress)?;
    let report = run_report(config, &on_progress)?;
    Ok(FullRun { scrape, report })
}

fn write_outputs(
    config: &Config,
    run: &mut ReportRun,
    with_snapshot: bool,
    on_progress: &impl Fn(PipelineProgress),
) {
    let mut steps: Vec<(&str, &Path)> = vec![
        ("match report", config.report_path.as_path()),
        ("career report", config.cumulative_report_path.as_path()),
        ("match history", config.output_db_path.as_path()),
    ];
    if with_snapshot {
        steps.push(("snapshot", config.snapshot_path.as_path()));
    }
    let total = steps.len();
    for (idx, (name, path)) in steps.into_iter().enumerate() {
        let result = match idx {
            0 => write_report(path, &run.matches).map(|_| ()),
            1 => write_report(path, &run.totals).map(|_| ()),
            2 => store_match_history(path, &run.matches),
            _ => save_snapshot(
                path,
                &MatchSnapshot {
                    matches: run.matches.clone(),
                    totals: run.totals.clone(),
                },
            ),
        };
        match result {
            Ok(()) => tracing::info!(output = name, path = %path.display(), "written"),
            Err(err) => {
                tracing::error!(output = name, path = %path.display(), "write failed: {err:#}");
                run.output_failures.push(format!("{name}: {err:#}"));
            }
        }
        on_progress(PipelineProgress {
            stage: Stage::Output,
            current: idx + 1,
            total,
            message: name.to_string(),
        });
    }
}

fn store_match_history(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let mut conn = match_history::open_db(path)?;
    match_history::write_match_history(&mut conn, records)
        .with_context(|| format!("MatchHistory in {}", path.display()))?;
    Ok(())
}
