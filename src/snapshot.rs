use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::match_record::MatchRecord;

const SNAPSHOT_VERSION: u32 = 2;

/// Deduplicated, ordered bouts and their career-total counterparts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub matches: Vec<MatchRecord>,
    pub totals: Vec<MatchRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    snapshot: MatchSnapshot,
}

pub fn encode_snapshot(snapshot: &MatchSnapshot) -> Result<Vec<u8>> {
    let file = SnapshotFile {
        version: SNAPSHOT_VERSION,
        snapshot: snapshot.clone(),
    };
    bincode::serialize(&file).context("serialize match snapshot")
}

pub fn decode_snapshot(bytes: &[u8]) -> Result<MatchSnapshot> {
    let file: SnapshotFile = bincode::deserialize(bytes).context("deserialize match snapshot")?;
    if file.version != SNAPSHOT_VERSION {
        return Err(anyhow!(
            "snapshot version {} not supported (expected {SNAPSHOT_VERSION})",
            file.version
        ));
    }
    Ok(file.snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &MatchSnapshot) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create snapshot dir {}", dir.display()))?;
    }
    let bytes = encode_snapshot(snapshot)?;
    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write snapshot {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap snapshot {}", path.display()))?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<MatchSnapshot> {
    let bytes = fs::read(path).with_context(|| format!("read snapshot {}", path.display()))?;
    decode_snapshot(&bytes)
}
