//! On-disk snapshot of a vector index: a bincode vector artifact and a
//! newline-delimited identifier artifact next to it.
//!
//! The vector artifact is the commit record. It embeds the full identifier list,
//! a SHA-256 digest of the identifier artifact and a digest over its own payload.
//! Writes stage both files as temp files in the target directory, fsync them,
//! rename the identifier artifact into place and rename the vector artifact last.
//! A crash between the two renames leaves an identifier artifact whose digest does
//! not match, which `load` reports and `repair` can undo.

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::{Number, Settings};
use crate::error::{MatchError, Result};

const MAGIC: [u8; 8] = *b"HMVECIDX";
const FORMAT_VERSION: u32 = 1;

/// What startup found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// Neither artifact exists.
    Empty,
    /// Both artifacts exist and agree.
    Loaded { entries: usize },
}

/// Entries restored from disk, in insertion order. `vectors` is flat,
/// `ids.len() * dimensions` long.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotData {
    pub ids: Vec<String>,
    pub vectors: Vec<Number>,
}

#[derive(Serialize)]
struct VectorBlobRef<'a> {
    magic: [u8; 8],
    version: u32,
    dimensions: u64,
    ids: &'a [String],
    vectors: &'a [Number],
    ids_digest: [u8; 32],
    payload_digest: [u8; 32],
}

#[derive(Deserialize)]
struct VectorBlob {
    magic: [u8; 8],
    version: u32,
    dimensions: u64,
    ids: Vec<String>,
    vectors: Vec<Number>,
    ids_digest: [u8; 32],
    payload_digest: [u8; 32],
}

/// Loads the snapshot for `settings`. `Ok(None)` only when neither artifact exists;
/// anything missing, truncated or inconsistent is a `SnapshotLoad` error.
pub fn load(settings: &Settings) -> Result<Option<SnapshotData>> {
    let index_path = &settings.index_path;
    let ids_path = settings.ids_path();

    match (index_path.exists(), ids_path.exists()) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(MatchError::snapshot_load(
                &ids_path,
                "identifier artifact is missing",
            ))
        }
        (false, true) => {
            return Err(MatchError::snapshot_load(
                index_path,
                "vector artifact is missing",
            ))
        }
        (true, true) => {}
    }

    let blob = read_blob(settings)?;

    let ids_bytes = fs::read(&ids_path)
        .map_err(|e| MatchError::snapshot_load(&ids_path, format!("unreadable: {}", e)))?;
    if digest(&ids_bytes) != blob.ids_digest {
        return Err(MatchError::snapshot_load(
            &ids_path,
            "identifier artifact does not match the vector artifact; \
             a write was interrupted, run repair to restore the last committed snapshot",
        ));
    }
    let ids = parse_ids(&ids_bytes)
        .ok_or_else(|| MatchError::snapshot_load(&ids_path, "identifier artifact is not UTF-8"))?;
    if ids != blob.ids {
        return Err(MatchError::snapshot_load(
            &ids_path,
            format!(
                "identifier artifact lists {} ids, vector artifact {}",
                ids.len(),
                blob.ids.len()
            ),
        ));
    }

    log::info!(
        "loaded snapshot {} with {} entries",
        index_path.display(),
        ids.len()
    );
    Ok(Some(SnapshotData {
        ids,
        vectors: blob.vectors,
    }))
}

/// Durably replaces both artifacts with `ids` and their flat `vectors`.
pub fn write(settings: &Settings, ids: &[String], vectors: &[Number]) -> Result<()> {
    let index_path = &settings.index_path;
    let dir = parent_dir(index_path);
    fs::create_dir_all(&dir)?;

    let ids_bytes = ids_artifact(ids);
    let ids_digest = digest(&ids_bytes);
    let blob = VectorBlobRef {
        magic: MAGIC,
        version: FORMAT_VERSION,
        dimensions: settings.dimensions as u64,
        ids,
        vectors,
        ids_digest,
        payload_digest: payload_digest(settings.dimensions as u64, vectors, &ids_digest),
    };
    let blob_bytes = bincode::serialize(&blob)?;

    let ids_path = settings.ids_path();
    let ids_tmp = stage(&dir, &ids_bytes)?;
    let blob_tmp = stage(&dir, &blob_bytes)?;
    let previous_ids = read_if_exists(&ids_path)?;

    ids_tmp
        .persist(&ids_path)
        .map_err(|e| MatchError::Io(e.error))?;
    if let Err(e) = blob_tmp.persist(index_path) {
        restore_ids(&dir, &ids_path, previous_ids.as_deref());
        return Err(MatchError::Io(e.error));
    }
    sync_dir(&dir)?;

    log::debug!(
        "persisted snapshot {} ({} entries, {} bytes)",
        index_path.display(),
        ids.len(),
        blob_bytes.len()
    );
    Ok(())
}

/// Rewrites the identifier artifact from the list committed in an intact vector
/// artifact. Returns the number of entries the snapshot now holds.
pub fn repair(settings: &Settings) -> Result<usize> {
    let blob = read_blob(settings)?;
    let dir = parent_dir(&settings.index_path);
    let ids_bytes = ids_artifact(&blob.ids);

    stage(&dir, &ids_bytes)?
        .persist(settings.ids_path())
        .map_err(|e| MatchError::Io(e.error))?;
    sync_dir(&dir)?;

    log::info!(
        "rewrote {} from the committed vector artifact ({} entries)",
        settings.ids_path().display(),
        blob.ids.len()
    );
    Ok(blob.ids.len())
}

fn read_blob(settings: &Settings) -> Result<VectorBlob> {
    let path = &settings.index_path;
    let corrupt = |reason: String| MatchError::snapshot_load(path, reason);

    let file = File::open(path).map_err(|e| corrupt(format!("unreadable: {}", e)))?;
    let len = file.metadata().map_err(|e| corrupt(e.to_string()))?.len();
    if len == 0 {
        return Err(corrupt("vector artifact is empty".to_string()));
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| corrupt(format!("mmap failed: {}", e)))?;

    let blob: VectorBlob =
        bincode::deserialize(&mmap[..]).map_err(|e| corrupt(format!("undecodable: {}", e)))?;

    if blob.magic != MAGIC {
        return Err(corrupt("not a vector artifact (bad magic)".to_string()));
    }
    if blob.version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {}", blob.version)));
    }
    if blob.dimensions != settings.dimensions as u64 {
        return Err(corrupt(format!(
            "snapshot has dimension {}, configured {}",
            blob.dimensions, settings.dimensions
        )));
    }
    if blob.vectors.len() as u64 != blob.ids.len() as u64 * blob.dimensions {
        return Err(corrupt(format!(
            "{} components for {} ids of dimension {}",
            blob.vectors.len(),
            blob.ids.len(),
            blob.dimensions
        )));
    }
    if payload_digest(blob.dimensions, &blob.vectors, &blob.ids_digest) != blob.payload_digest {
        return Err(corrupt("payload checksum mismatch".to_string()));
    }
    if digest(&ids_artifact(&blob.ids)) != blob.ids_digest {
        return Err(corrupt("embedded identifier list checksum mismatch".to_string()));
    }

    Ok(blob)
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Puts the identifier artifact back to what it was before a write whose commit
/// rename failed. `None` means there was no artifact before.
fn restore_ids(dir: &Path, ids_path: &Path, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(bytes) => stage(dir, bytes).and_then(|tmp| {
            tmp.persist(ids_path)
                .map(|_| ())
                .map_err(|e| MatchError::Io(e.error))
        }),
        None => fs::remove_file(ids_path).map_err(MatchError::from),
    };
    match restored.and_then(|_| sync_dir(dir)) {
        Ok(()) => log::debug!("restored {} after failed commit", ids_path.display()),
        Err(e) => log::warn!(
            "could not restore {} after failed commit, run repair: {}",
            ids_path.display(),
            e
        ),
    }
}

fn ids_artifact(ids: &[String]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.iter().map(|id| id.len() + 1).sum());
    for id in ids {
        bytes.extend_from_slice(id.as_bytes());
        bytes.push(b'\n');
    }
    bytes
}

fn parse_ids(bytes: &[u8]) -> Option<Vec<String>> {
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.lines().map(str::to_string).collect())
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

fn payload_digest(dimensions: u64, vectors: &[Number], ids_digest: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(dimensions.to_le_bytes());
    for x in vectors {
        hasher.update(x.to_le_bytes());
    }
    hasher.update(ids_digest);
    hasher.finalize().into()
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
