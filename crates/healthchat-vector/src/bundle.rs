//! On-disk index bundle.
//!
//! A bundle is a directory holding `manifest.json` and `entries.jsonl` (one
//! `IndexEntry` per line, in insertion order). The manifest records the
//! embedder identity, the vector width and a blake3 checksum of the entries
//! file, so a reader can refuse an index that was cut short or built with a
//! different model. Saves are staged in a sibling directory and renamed into
//! place; readers never observe a half-written bundle.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use healthchat_core::types::IndexEntry;
use healthchat_core::{Error, Result};

pub const FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub model_id: String,
    pub dim: usize,
    pub count: usize,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct LoadedBundle {
    pub manifest: Manifest,
    pub model_id: String,
    pub entries: Vec<IndexEntry>,
}

pub fn save(path: &Path, model_id: &str, dim: usize, entries: &[IndexEntry]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;

    let mut body = String::new();
    for entry in entries {
        body.push_str(&serde_json::to_string(entry)?);
        body.push('\n');
    }
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        model_id: model_id.to_string(),
        dim,
        count: entries.len(),
        checksum: blake3::hash(body.as_bytes()).to_hex().to_string(),
        created_at: Utc::now(),
    };

    let staging = tempfile::Builder::new()
        .prefix(".healthchat-index-")
        .tempdir_in(&parent)
        .map_err(|e| Error::io(&parent, e))?;
    let entries_path = staging.path().join(ENTRIES_FILE);
    fs::write(&entries_path, body.as_bytes()).map_err(|e| Error::io(&entries_path, e))?;
    let manifest_path = staging.path().join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).map_err(|e| Error::io(&manifest_path, e))?;

    swap_into_place(staging.path(), path)?;
    info!(path = %path.display(), entries = manifest.count, model_id, "saved vector index");
    Ok(())
}

/// Replace `target` with `staged`. A previous bundle is moved aside first and
/// restored if the final rename fails.
fn swap_into_place(staged: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        return fs::rename(staged, target).map_err(|e| Error::io(target, e));
    }
    let mut backup = target.as_os_str().to_owned();
    backup.push(format!(".bak-{}", std::process::id()));
    let backup = PathBuf::from(backup);
    if backup.exists() {
        fs::remove_dir_all(&backup).map_err(|e| Error::io(&backup, e))?;
    }
    fs::rename(target, &backup).map_err(|e| Error::io(target, e))?;
    if let Err(e) = fs::rename(staged, target) {
        if let Err(restore) = fs::rename(&backup, target) {
            warn!("Failed to restore previous index from {}: {}", backup.display(), restore);
        }
        return Err(Error::io(target, e));
    }
    if let Err(e) = fs::remove_dir_all(&backup) {
        warn!("Failed to remove old index {}: {}", backup.display(), e);
    }
    Ok(())
}

pub fn load(path: &Path) -> Result<LoadedBundle> {
    let manifest_path = path.join(MANIFEST_FILE);
    if !path.is_dir() || !manifest_path.is_file() {
        return Err(Error::IndexNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
    let manifest: Manifest =
        serde_json::from_str(&raw).map_err(|e| Error::corrupt(path, format!("unreadable manifest: {}", e)))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::corrupt(path, format!("unsupported format version {}", manifest.format_version)));
    }
    if manifest.dim == 0 {
        return Err(Error::corrupt(path, "manifest declares zero dimensions"));
    }

    let entries_path = path.join(ENTRIES_FILE);
    let body = fs::read(&entries_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::corrupt(path, "missing entries file"),
        _ => Error::io(&entries_path, e),
    })?;
    let checksum = blake3::hash(&body).to_hex().to_string();
    if checksum != manifest.checksum {
        return Err(Error::corrupt(path, "entries checksum does not match manifest"));
    }
    let body = String::from_utf8(body).map_err(|_| Error::corrupt(path, "entries file is not UTF-8"))?;

    let mut entries = Vec::with_capacity(manifest.count.min(body.lines().count()));
    for (line_no, line) in body.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        let entry: IndexEntry = serde_json::from_str(line)
            .map_err(|e| Error::corrupt(path, format!("entry on line {}: {}", line_no + 1, e)))?;
        if entry.vector.len() != manifest.dim {
            return Err(Error::corrupt(
                path,
                format!("entry {} has {} dimensions, manifest says {}", entry.chunk.id, entry.vector.len(), manifest.dim),
            ));
        }
        entries.push(entry);
    }
    if entries.len() != manifest.count {
        return Err(Error::corrupt(path, format!("expected {} entries, found {}", manifest.count, entries.len())));
    }
    if entries.is_empty() {
        return Err(Error::corrupt(path, "index has no entries"));
    }
    debug!(path = %path.display(), entries = entries.len(), "loaded vector index bundle");
    Ok(LoadedBundle { model_id: manifest.model_id.clone(), manifest, entries })
}
