use std::env;
use std::path::PathBuf;

use crate::coordinator::DEFAULT_WORKERS;
use crate::http_cache::app_cache_dir;

const DEFAULT_FETCH_PARALLELISM: usize = 6;

/// Runtime settings. Every field can be set through the environment (or a
/// `.env` file); CLI flags override the store path.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub output_db_path: PathBuf,
    pub report_path: PathBuf,
    pub cumulative_report_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub workers: usize,
    pub fetch_parallelism: usize,
    pub search_letters: Vec<char>,
}

impl Default for Config {
    fn default() -> Self {
        let base = app_cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            db_path: base.join("ufc_history.db"),
            output_db_path: base.join("ufc_match_history.db"),
            report_path: PathBuf::from("ufc_history.xlsx"),
            cumulative_report_path: PathBuf::from("ufc_history_cumulative.xlsx"),
            snapshot_path: base.join("ufc_matches.bin"),
            scratch_dir: None,
            workers: DEFAULT_WORKERS,
            fetch_parallelism: DEFAULT_FETCH_PARALLELISM,
            search_letters: ('a'..='z').collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset, blank or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str| {
            let raw = lookup(key)?;
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        };
        let number = |key: &str| lookup(key)?.trim().parse::<usize>().ok();
        Self {
            db_path: path("UFC_DB_PATH").unwrap_or(defaults.db_path),
            output_db_path: path("UFC_OUTPUT_DB").unwrap_or(defaults.output_db_path),
            report_path: path("UFC_REPORT_PATH").unwrap_or(defaults.report_path),
            cumulative_report_path: path("UFC_CUMULATIVE_REPORT_PATH")
                .unwrap_or(defaults.cumulative_report_path),
            snapshot_path: path("UFC_SNAPSHOT_PATH").unwrap_or(defaults.snapshot_path),
            scratch_dir: path("UFC_TMP_DIR"),
            workers: number("UFC_WORKER_THREADS")
                .unwrap_or(defaults.workers)
                .clamp(1, 64),
            fetch_parallelism: number("FETCH_PARALLELISM")
                .unwrap_or(defaults.fetch_parallelism)
                .clamp(2, 32),
            search_letters: lookup("UFC_SEARCH_LETTERS")
                .map(|raw| parse_letters(&raw))
                .filter(|letters| !letters.is_empty())
                .unwrap_or(defaults.search_letters),
        }
    }
}

/// `"a,b c"` or `"abc"` → `['a', 'b', 'c']`, lowercase, deduplicated.
pub fn parse_letters(raw: &str) -> Vec<char> {
    let mut out = Vec::new();
    for ch in raw.chars().filter(|c| c.is_ascii_alphabetic()) {
        let ch = ch.to_ascii_lowercase();
        if !out.contains(&ch) {
            out.push(ch);
        }
    }
    out
}
