//! Saving and loading world state

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::game::WorldSnapshot;

/// Read a snapshot; a missing file is not an error
pub fn load_state(path: &Path) -> anyhow::Result<Option<WorldSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    let snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parsing state file {}", path.display()))?;
    Ok(Some(snapshot))
}

/// Write a snapshot through a temporary file so a crash never leaves half a file behind
pub fn save_state(path: &Path, snapshot: &WorldSnapshot) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    let raw = serde_json::to_string(snapshot).context("serializing world state")?;
    fs::write(&tmp, raw).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} to {}", tmp.display(), path.display()))?;
    info!(
        path = %path.display(),
        sessions = snapshot.sessions.len(),
        players = snapshot.players.len(),
        "World state saved"
    );
    Ok(())
}
