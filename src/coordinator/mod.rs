//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - The file namespace (file → ordered chunk ids), persisted as one snapshot
//! - The chunk-location directory (chunk → node ids), rebuilt from node announcements
//! - The live node registry
//! - Round-robin placement of new chunks

pub mod directory;
pub mod http;
pub mod namespace;
pub mod placement;
pub mod registry;
pub mod server;
pub mod service;

pub use server::Coordinator;
pub use service::CoordinatorService;
