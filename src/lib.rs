//! # minidfs
//!
//! A small chunked distributed file store:
//! - A coordinator owning the file namespace, chunk locations and node registry
//! - Storage nodes keeping checksummed chunk files and re-announcing them on start
//! - A client that splits files into fixed-size chunks and reassembles them
//!
//! ## Architecture

#![allow(clippy::result_large_err)]
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │         Coordinator          │
//!            │  namespace (snapshot file)   │
//!            │  chunk → nodes (in memory)   │
//!            │  node registry + round robin │
//!            └──────┬───────────────▲───────┘
//!      place/record │               │ register + announce
//!      commit/resolve               │ on startup
//!   ┌───────────────┴──┐     ┌──────┴──────┐   ┌─────────────┐
//!   │      Client      │────▶│   Node 1    │   │   Node 2    │
//!   │ split/reassemble │────────────────────▶ │             │
//!   └──────────────────┘     └─────────────┘   └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a coordinator
//! ```bash
//! minidfs-coord serve --bind 0.0.0.0:5000 --snapshot ./coord-data/namespace.snap
//! ```
//!
//! ### Start storage nodes
//! ```bash
//! minidfs-node serve --id node-1 --bind 0.0.0.0:6001 --data ./node1 \
//!   --coordinator http://localhost:5000
//! ```
//!
//! ### Use the CLI
//! ```bash
//! minidfs put ./report.pdf
//! minidfs get report.pdf --out ./downloads
//! minidfs ls
//! minidfs nodes
//! ```

pub mod client;
pub mod common;
pub mod coordinator;
pub mod node;

// Re-export commonly used types
pub use client::Client;
pub use common::{ChunkId, Config, Error, Result};
pub use coordinator::{Coordinator, CoordinatorService};
pub use node::NodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
