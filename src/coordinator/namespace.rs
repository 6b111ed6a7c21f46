//! File namespace: file name → ordered chunk-id list
//!
//! Entries live in a concurrent map so lookups never wait on a commit.
//! Every commit rewrites the whole snapshot file before returning.
//!
//! Snapshot format:
//! [MAGIC:8][PAYLOAD_LEN:8][PAYLOAD:n][CRC32:4]
//! where PAYLOAD is bincode of `BTreeMap<String, FileEntry>`.

use crate::common::{crc32, ChunkId, Error, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const SNAPSHOT_MAGIC: &[u8; 8] = b"MDFSNS01";

/// A committed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub chunks: Vec<ChunkId>,
    pub size: u64,
    /// Commit time, milliseconds since Unix epoch
    pub committed_at: i64,
}

pub struct Namespace {
    entries: DashMap<String, FileEntry>,
    snapshot_path: Option<PathBuf>,
    /// Serializes commits so each snapshot is written from a settled map
    writer: Mutex<()>,
}

impl Namespace {
    /// Namespace without durable storage (tests, embedded use)
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            snapshot_path: None,
            writer: Mutex::new(()),
        }
    }

    /// Open a namespace backed by `path`, loading the snapshot if present
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = DashMap::new();
        if path.exists() {
            let loaded = load_snapshot(&path)?;
            tracing::info!("Namespace loaded from {:?}: {} file(s)", path, loaded.len());
            for (name, entry) in loaded {
                entries.insert(name, entry);
            }
        } else {
            tracing::info!("No namespace snapshot at {:?}, starting fresh", path);
        }

        Ok(Self {
            entries,
            snapshot_path: Some(path),
            writer: Mutex::new(()),
        })
    }

    /// Replace the entry for `name` and persist the full namespace.
    ///
    /// If the snapshot cannot be written the previous entry is put back and
    /// `PersistenceFailure` is returned.
    pub fn commit(&self, name: &str, chunks: Vec<ChunkId>, size: u64) -> Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = FileEntry {
            chunks,
            size,
            committed_at: chrono::Utc::now().timestamp_millis(),
        };
        let previous = self.entries.insert(name.to_string(), entry);

        if let Err(e) = self.persist() {
            match previous {
                Some(prev) => {
                    self.entries.insert(name.to_string(), prev);
                }
                None => {
                    self.entries.remove(name);
                }
            }
            tracing::error!("Commit of {} rolled back: {}", name, e);
            return Err(Error::PersistenceFailure(e.to_string()));
        }

        Ok(())
    }

    /// Copy of a file's entry
    pub fn get(&self, name: &str) -> Option<FileEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All file names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot: BTreeMap<String, FileEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        save_snapshot(path, &snapshot)
    }
}

/// Write the snapshot to a temp file, then rename it over the old one
fn save_snapshot(path: &Path, snapshot: &BTreeMap<String, FileEntry>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let payload = bincode::serialize(snapshot)
        .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))?;

    let tmp_path = path.with_extension("snap.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&crc32(&payload).to_le_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!("Namespace snapshot saved: {} file(s)", snapshot.len());
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<BTreeMap<String, FileEntry>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(Error::Corrupted("Invalid namespace snapshot magic".into()));
    }

    let mut len_bytes = [0u8; 8];
    reader.read_exact(&mut len_bytes)?;
    let len = u64::from_le_bytes(len_bytes) as usize;

    let mut payload = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Err(Error::Corrupted(format!(
            "Namespace snapshot truncated: expected {} bytes, found {}",
            len,
            payload.len()
        )));
    }

    let mut checksum_bytes = [0u8; 4];
    reader.read_exact(&mut checksum_bytes)?;
    let stored = u32::from_le_bytes(checksum_bytes);
    let computed = crc32(&payload);
    if stored != computed {
        return Err(Error::ChecksumMismatch {
            expected: format!("{:08x}", stored),
            actual: format!("{:08x}", computed),
        });
    }

    bincode::deserialize(&payload).map_err(|e| Error::Corrupted(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(file: &str, n: u64) -> Vec<ChunkId> {
        (0..n).map(|i| ChunkId::new(file, i)).collect()
    }

    #[test]
    fn test_commit_and_get() {
        let ns = Namespace::in_memory();
        ns.commit("a.txt", ids("a.txt", 3), 2500).unwrap();

        let entry = ns.get("a.txt").unwrap();
        assert_eq!(entry.chunks, ids("a.txt", 3));
        assert_eq!(entry.size, 2500);
        assert!(ns.get("b.txt").is_none());
        assert_eq!(ns.list(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_recommit_replaces_wholesale() {
        let ns = Namespace::in_memory();
        ns.commit("a.txt", ids("a.txt", 5), 5000).unwrap();
        ns.commit("a.txt", ids("a.txt", 2), 1500).unwrap();

        let entry = ns.get("a.txt").unwrap();
        assert_eq!(entry.chunks.len(), 2);
        assert_eq!(entry.size, 1500);
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta").join("namespace.snap");

        {
            let ns = Namespace::open(&path).unwrap();
            ns.commit("one.bin", ids("one.bin", 12), 12_000).unwrap();
            ns.commit("empty.bin", vec![], 0).unwrap();
        }

        let ns = Namespace::open(&path).unwrap();
        assert_eq!(ns.list(), vec!["empty.bin".to_string(), "one.bin".to_string()]);
        assert_eq!(ns.get("one.bin").unwrap().chunks, ids("one.bin", 12));
        assert!(ns.get("empty.bin").unwrap().chunks.is_empty());
    }

    #[test]
    fn test_corrupted_snapshot_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("namespace.snap");
        {
            let ns = Namespace::open(&path).unwrap();
            ns.commit("a", ids("a", 2), 10).unwrap();
        }

        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        assert!(Namespace::open(&path).is_err());
    }

    #[test]
    fn test_persist_failure_rolls_back() {
        let dir = tempdir().unwrap();
        // A directory where the snapshot file should be makes the rename fail
        let path = dir.path().join("namespace.snap");
        let ns = Namespace::open(&path).unwrap();
        ns.commit("keep.txt", ids("keep.txt", 1), 1).unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir_all(path.join("blocker")).unwrap();

        let err = ns.commit("new.txt", ids("new.txt", 1), 1).unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure(_)));
        assert!(!ns.contains("new.txt"));

        let err = ns.commit("keep.txt", ids("keep.txt", 4), 4).unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure(_)));
        assert_eq!(ns.get("keep.txt").unwrap().chunks.len(), 1);
    }
}
