//! Storage node implementation
//!
//! A node keeps chunks as individual checksummed files, serves them over
//! HTTP, and re-announces everything it holds to the coordinator when it
//! starts.

pub mod http;
pub mod local;
pub mod recovery;
pub mod server;
pub mod store;

pub use local::LocalNodes;
pub use recovery::{announce_local_chunks, RecoveryReport};
pub use server::NodeServer;
pub use store::ChunkStore;
