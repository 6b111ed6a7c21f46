//! Common utilities and types shared across minidfs

pub mod api;
pub mod chunk;
pub mod config;
pub mod error;
pub mod hash;
pub mod tracing_middleware;
pub mod types;
pub mod utils;

pub use api::{CoordinatorApi, NodeApi, NodeConnector};
pub use chunk::{chunk_count, sort_by_ordinal, ChunkId, DEFAULT_CHUNK_SIZE};
pub use self::config::{ClientConfig, Config, CoordinatorConfig, NodeConfig};
pub use error::{Error, ErrorBody, ErrorKind, Result};
pub use hash::{blake3_hex, chunk_file_stem};
pub use types::{
    ChunkLocationRequest, ChunkPlacement, CommitFileRequest, CoordinatorStatus, NodeInfo,
    RegisterNodeRequest, Resolution,
};
pub use utils::{crc32, encode_name, format_bytes, percent};
