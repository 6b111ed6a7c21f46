//! Chunk identifiers and chunking helpers
//!
//! A chunk id is written on the wire as `<file>_chunk_<ordinal>`, ordinal in
//! decimal without padding. Ordering is always by `(file, ordinal)` with the
//! ordinal compared as an integer, so `x_chunk_10` sorts after `x_chunk_9`.

use crate::common::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CHUNK_MARKER: &str = "_chunk_";

/// Default maximum chunk payload (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    file: String,
    ordinal: u64,
}

impl ChunkId {
    pub fn new(file: impl Into<String>, ordinal: u64) -> Self {
        Self {
            file: file.into(),
            ordinal,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.file, CHUNK_MARKER, self.ordinal)
    }
}

impl FromStr for ChunkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // File names may themselves contain the marker; the ordinal is after the last one.
        let (file, ordinal) = s
            .rsplit_once(CHUNK_MARKER)
            .ok_or_else(|| Error::InvalidChunkId(s.to_string()))?;

        if file.is_empty() || ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidChunkId(s.to_string()));
        }
        // Padded ordinals would give two spellings of the same chunk
        if ordinal.len() > 1 && ordinal.starts_with('0') {
            return Err(Error::InvalidChunkId(s.to_string()));
        }

        let ordinal = ordinal
            .parse::<u64>()
            .map_err(|_| Error::InvalidChunkId(s.to_string()))?;

        Ok(Self::new(file, ordinal))
    }
}

impl Serialize for ChunkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChunkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sort chunk ids by numeric ordinal, in place
pub fn sort_by_ordinal(chunks: &mut [ChunkId]) {
    chunks.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.file.cmp(&b.file)));
}

/// Number of chunks a payload of `len` bytes splits into
pub fn chunk_count(len: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        assert_eq!(ChunkId::new("report.pdf", 0).to_string(), "report.pdf_chunk_0");
        assert_eq!(ChunkId::new("report.pdf", 12).to_string(), "report.pdf_chunk_12");
    }

    #[test]
    fn test_parse_uses_last_marker() {
        let id: ChunkId = "a_chunk_b.bin_chunk_7".parse().unwrap();
        assert_eq!(id.file(), "a_chunk_b.bin");
        assert_eq!(id.ordinal(), 7);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "nochunk",
            "file_chunk_",
            "_chunk_3",
            "file_chunk_-1",
            "file_chunk_1a",
            "file_chunk_007",
        ] {
            assert!(bad.parse::<ChunkId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let mut ids: Vec<ChunkId> = ["f_chunk_10", "f_chunk_2", "f_chunk_1", "f_chunk_0", "f_chunk_11"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        sort_by_ordinal(&mut ids);
        let ordinals: Vec<u64> = ids.iter().map(|c| c.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 10, 11]);

        let mut lexical: Vec<String> = ids.iter().map(|c| c.to_string()).collect();
        lexical.sort();
        assert_ne!(lexical[2], "f_chunk_2");
    }

    #[test]
    fn test_serde_as_string() {
        let id = ChunkId::new("data.csv", 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"data.csv_chunk_3\"");
        let back: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0, 4), 0);
        assert_eq!(chunk_count(1, 4), 1);
        assert_eq!(chunk_count(4, 4), 1);
        assert_eq!(chunk_count(5, 4), 2);
        assert_eq!(chunk_count(12, 4), 3);
    }
}
