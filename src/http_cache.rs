use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "ufc_history";
const PAGES_DIR: &str = "pages";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    url: String,
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Conditional GET backed by one JSON file per URL. Pages are only re-downloaded
/// when the server reports a change.
pub fn fetch_html_cached(client: &Client, url: &str) -> Result<String> {
    let entry_path = pages_dir().map(|dir| dir.join(cache_file_name(url)));
    let cached_entry = entry_path.as_deref().and_then(load_entry);

    let mut req = client.get(url);
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached_entry {
            return Ok(entry.body);
        }
        return Err(anyhow!("received 304 without cache body for {url}"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} for {url}"));
    }

    let entry = CacheEntry {
        version: CACHE_VERSION,
        url: url.to_string(),
        body: body.clone(),
        etag: headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        last_modified: headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
    };
    if let Some(path) = entry_path.as_deref()
        && let Err(err) = save_entry(path, &entry)
    {
        tracing::debug!(%url, "page cache write skipped: {err:#}");
    }
    Ok(body)
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn pages_dir() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(PAGES_DIR))
}

fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{hex}.json")
}

fn load_entry(path: &Path) -> Option<CacheEntry> {
    let raw = fs::read_to_string(path).ok()?;
    let entry = serde_json::from_str::<CacheEntry>(&raw).ok()?;
    if entry.version != CACHE_VERSION {
        return None;
    }
    Some(entry)
}

fn save_entry(path: &Path, entry: &CacheEntry) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create page cache dir")?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(entry).context("serialize page cache entry")?;
    fs::write(&tmp, json).context("write page cache entry")?;
    fs::rename(&tmp, path).context("swap page cache entry")?;
    Ok(())
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
