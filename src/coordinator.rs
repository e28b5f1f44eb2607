use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::{Context, Result};

use crate::match_record::MatchRecord;
use crate::reconstruct::reconstruct_match;
use crate::stats_store::{MatchSeed, StatsStore};

pub const DEFAULT_WORKERS: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct PartitionRun {
    /// Worker results merged in slice order; `None` entries are discarded
    /// matches.
    pub records: Vec<Option<MatchRecord>>,
    pub workers_spawned: usize,
    pub workers_completed: usize,
}

/// Splits `seeds` into at most `workers` contiguous slices of equal size (the
/// last may be shorter). The returned length is the real worker count.
pub fn partition(seeds: &[MatchSeed], workers: usize) -> Vec<&[MatchSeed]> {
    if seeds.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, seeds.len());
    let chunk = seeds.len().div_ceil(workers);
    seeds.chunks(chunk).collect()
}

/// Reconstructs every seed on one OS thread per slice. Each thread reads from
/// its own copy of the store at `db_path`; the copies live in a temp directory
/// under `scratch_dir` that is removed once all threads have joined.
///
/// `on_progress` receives the number of seeds processed so far.
pub fn run_partitioned(
    db_path: &Path,
    scratch_dir: Option<&Path>,
    seeds: &[MatchSeed],
    workers: usize,
    on_progress: impl Fn(usize) + Sync,
) -> Result<PartitionRun> {
    let slices = partition(seeds, workers);
    let workers_spawned = slices.len();
    if workers_spawned == 0 {
        return Ok(PartitionRun::default());
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix("ufc_history_snapshots");
    let snapshot_dir = match scratch_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("create scratch dir {}", dir.display()))?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    }
    .context("create snapshot dir")?;

    tracing::info!(
        seeds = seeds.len(),
        workers = workers_spawned,
        dir = %snapshot_dir.path().display(),
        "dispatching reconstruction workers"
    );

    let processed = AtomicUsize::new(0);
    let results: Vec<Option<Vec<Option<MatchRecord>>>> = thread::scope(|scope| {
        let handles: Vec<_> = slices
            .iter()
            .enumerate()
            .map(|(index, slice)| {
                let snapshot = snapshot_dir.path().join(format!("tmp_{}.db", index + 1));
                let processed = &processed;
                let on_progress = &on_progress;
                scope.spawn(move || {
                    run_worker(index, db_path, &snapshot, slice, |n| {
                        let done = processed.fetch_add(n, Ordering::Relaxed) + n;
                        on_progress(done);
                    })
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| match handle.join() {
                Ok(records) => records,
                Err(_) => {
                    tracing::error!(worker = index, "worker panicked, slice dropped");
                    None
                }
            })
            .collect()
    });

    let snapshot_path = snapshot_dir.path().to_path_buf();
    if let Err(err) = snapshot_dir.close() {
        tracing::warn!(dir = %snapshot_path.display(), "failed to remove snapshots: {err}");
    }

    let workers_completed = results.iter().filter(|r| r.is_some()).count();
    let records: Vec<Option<MatchRecord>> = results.into_iter().flatten().flatten().collect();
    tracing::info!(
        workers_spawned,
        workers_completed,
        records = records.len(),
        "reconstruction finished"
    );

    Ok(PartitionRun {
        records,
        workers_spawned,
        workers_completed,
    })
}

/// `None` when the worker could not prepare its snapshot; its slice is then
/// absent from the merged result.
fn run_worker(
    index: usize,
    db_path: &Path,
    snapshot: &Path,
    slice: &[MatchSeed],
    mut on_processed: impl FnMut(usize),
) -> Option<Vec<Option<MatchRecord>>> {
    if let Err(err) = fs::copy(db_path, snapshot) {
        tracing::error!(worker = index, "cannot copy store snapshot: {err}");
        return None;
    }
    let store = match StatsStore::open_snapshot(snapshot) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(worker = index, "cannot open store snapshot: {err:#}");
            return None;
        }
    };

    let mut out = Vec::with_capacity(slice.len());
    for seed in slice {
        out.push(reconstruct_match(&store, seed));
        on_processed(1);
    }
    tracing::debug!(
        worker = index,
        seeds = slice.len(),
        kept = out.iter().filter(|r| r.is_some()).count(),
        "worker done"
    );
    Some(out)
}
