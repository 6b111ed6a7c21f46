//! Local chunk store
//!
//! Architecture:
//! - One file per chunk: data/aa/bb/<BLAKE3(chunk id)>.chunk
//! - aa/bb = first two bytes of that hash, to keep directories small
//! - Every file carries its chunk id and a CRC32, so a torn write is caught
//!   on read instead of being served as data
//!
//! Writes land in a temp file that is renamed into place.

use crate::common::{blake3_hex, chunk_file_stem, ChunkId, Error, NodeApi, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const CHUNK_MAGIC: [u8; 4] = [0x43, 0x48, 0x4E, 0x4B]; // "CHNK"
const CHUNK_EXT: &str = "chunk";
const HEADER_LEN: usize = 4 + 4 + 8;

/// Chunk record format:
/// [MAGIC:4][ID_LEN:4][DATA_LEN:8][ID:n][DATA:m][CRC32:4]
/// CRC32 covers ID_LEN through DATA.
#[derive(Debug)]
struct ChunkRecord {
    chunk_id: String,
    data: Vec<u8>,
}

/// Chunk store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub chunks: usize,
    pub total_bytes: u64,
    pub corrupted: usize,
}

pub struct ChunkStore {
    data_path: PathBuf,
}

impl ChunkStore {
    /// Open or create a chunk store rooted at `data_path`
    pub fn open(data_path: impl AsRef<Path>) -> Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        fs::create_dir_all(&data_path)?;
        tracing::info!("Chunk store opened at {:?}", data_path);
        Ok(Self { data_path })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Store or overwrite a chunk
    pub fn put(&self, chunk_id: &ChunkId, data: &[u8]) -> Result<()> {
        let path = self.chunk_path(chunk_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        let written = write_record(&tmp_path, &chunk_id.to_string(), data)
            .and_then(|_| fs::rename(&tmp_path, &path).map_err(Error::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        tracing::debug!("Stored chunk {} ({} bytes)", chunk_id, data.len());
        Ok(())
    }

    /// Read a chunk, verifying its checksum
    pub fn get(&self, chunk_id: &ChunkId) -> Result<Vec<u8>> {
        let path = self.chunk_path(chunk_id);
        let record = match read_record(&path) {
            Ok(record) => record,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ChunkNotFound(chunk_id.to_string()));
            }
            Err(e) => {
                tracing::warn!("Chunk {} unreadable: {}", chunk_id, e);
                return Err(e);
            }
        };

        if record.chunk_id != chunk_id.to_string() {
            return Err(Error::Corrupted(format!(
                "{:?} holds chunk {} instead of {}",
                path, record.chunk_id, chunk_id
            )));
        }

        Ok(record.data)
    }

    /// Ids of all intact chunks on disk. Corrupted files are skipped.
    pub fn list(&self) -> Result<Vec<ChunkId>> {
        let mut chunks = Vec::new();
        self.scan(|path, record| match record {
            Ok(record) => match record.chunk_id.parse::<ChunkId>() {
                Ok(id) => chunks.push(id),
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            },
            Err(e) => tracing::warn!("Skipping corrupted chunk file {:?}: {}", path, e),
        })?;
        chunks.sort();
        Ok(chunks)
    }

    /// Get statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        self.scan(|_, record| match record {
            Ok(record) => {
                stats.chunks += 1;
                stats.total_bytes += record.data.len() as u64;
            }
            Err(_) => stats.corrupted += 1,
        })?;
        Ok(stats)
    }

    /// Path of a chunk file
    pub fn chunk_path(&self, chunk_id: &ChunkId) -> PathBuf {
        self.data_path
            .join(chunk_file_stem(chunk_id))
            .with_extension(CHUNK_EXT)
    }

    /// Walk data/aa/bb/*.chunk and hand each parsed record to `visit`
    fn scan(&self, mut visit: impl FnMut(&Path, Result<ChunkRecord>)) -> Result<()> {
        for entry in fs::read_dir(&self.data_path)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }

            for subentry in fs::read_dir(entry.path())? {
                let subentry = subentry?;
                if !subentry.path().is_dir() {
                    continue;
                }

                for file_entry in fs::read_dir(subentry.path())? {
                    let file_entry = file_entry?;
                    let path = file_entry.path();

                    if path.extension().and_then(|s| s.to_str()) == Some(CHUNK_EXT) {
                        visit(&path, read_record(&path));
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_record(path: &Path, chunk_id: &str, data: &[u8]) -> Result<()> {
    let id_bytes = chunk_id.as_bytes();
    let id_len_bytes = (id_bytes.len() as u32).to_le_bytes();
    let data_len_bytes = (data.len() as u64).to_le_bytes();

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&id_len_bytes);
    hasher.update(&data_len_bytes);
    hasher.update(id_bytes);
    hasher.update(data);
    let checksum = hasher.finalize();

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&CHUNK_MAGIC)?;
    writer.write_all(&id_len_bytes)?;
    writer.write_all(&data_len_bytes)?;
    writer.write_all(id_bytes)?;
    writer.write_all(data)?;
    writer.write_all(&checksum.to_le_bytes())?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn read_record(path: &Path) -> Result<ChunkRecord> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|e| truncated(path, e))?;

    if header[0..4] != CHUNK_MAGIC {
        return Err(Error::Corrupted(format!("{:?}: bad magic", path)));
    }

    let id_len_bytes: [u8; 4] = header[4..8].try_into().unwrap_or_default();
    let data_len_bytes: [u8; 8] = header[8..16].try_into().unwrap_or_default();
    let id_len = u32::from_le_bytes(id_len_bytes) as u64;
    let data_len = u64::from_le_bytes(data_len_bytes);

    // Reject lengths that cannot fit before allocating for them
    let expected_len = (HEADER_LEN as u64 + 4 + id_len).saturating_add(data_len);
    if expected_len != file_len {
        return Err(Error::Corrupted(format!(
            "{:?}: expected {} bytes on disk, found {}",
            path, expected_len, file_len
        )));
    }

    let mut id_bytes = vec![0u8; id_len as usize];
    reader
        .read_exact(&mut id_bytes)
        .map_err(|e| truncated(path, e))?;

    let mut data = vec![0u8; data_len as usize];
    reader.read_exact(&mut data).map_err(|e| truncated(path, e))?;

    let mut checksum_bytes = [0u8; 4];
    reader
        .read_exact(&mut checksum_bytes)
        .map_err(|e| truncated(path, e))?;
    let stored_checksum = u32::from_le_bytes(checksum_bytes);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&id_len_bytes);
    hasher.update(&data_len_bytes);
    hasher.update(&id_bytes);
    hasher.update(&data);
    let computed_checksum = hasher.finalize();

    if computed_checksum != stored_checksum {
        return Err(Error::ChecksumMismatch {
            expected: format!("{:08x}", stored_checksum),
            actual: format!("{:08x}", computed_checksum),
        });
    }

    let chunk_id = String::from_utf8(id_bytes)
        .map_err(|_| Error::Corrupted(format!("{:?}: chunk id is not UTF-8", path)))?;

    Ok(ChunkRecord { chunk_id, data })
}

fn truncated(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::Corrupted(format!("{:?}: truncated chunk file", path))
    } else {
        Error::Io(e)
    }
}

/// Content digest of a chunk as stored, for diagnostics
pub fn chunk_digest(data: &[u8]) -> String {
    blake3_hex(data)
}

#[async_trait]
impl NodeApi for ChunkStore {
    async fn put_chunk(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        self.put(chunk_id, &data)
    }

    async fn get_chunk(&self, chunk_id: &ChunkId) -> Result<Bytes> {
        self.get(chunk_id).map(Bytes::from)
    }
}

// CRC helper kept next to the record format for tests that forge files
#[cfg(test)]
fn record_crc(id: &str, data: &[u8]) -> u32 {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(id.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
    buf.extend_from_slice(id.as_bytes());
    buf.extend_from_slice(data);
    crate::common::crc32(&buf)
}
