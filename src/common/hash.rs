//! Hashing utilities for minidfs
//!
//! BLAKE3 is used for content digests reported by the node and for the
//! two-level directory fan-out of chunk files.

use crate::common::ChunkId;
use std::path::PathBuf;

/// Hex BLAKE3 digest of `data`
pub fn blake3_hex(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Relative path of a chunk file without extension: `aa/bb/<hex>`, where
/// `<hex>` is BLAKE3 over the chunk id and `aa/bb` are its first two bytes.
///
/// The length is fixed whatever the file name, so long names cannot hit
/// the filesystem's component limit. The id itself lives in the record.
pub fn chunk_file_stem(chunk_id: &ChunkId) -> PathBuf {
    let hex = blake3_hex(chunk_id.to_string().as_bytes());
    [&hex[0..2], &hex[2..4], hex.as_str()].iter().collect()
}
