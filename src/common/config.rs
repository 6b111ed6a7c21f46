//! Configuration for minidfs components
//!
//! Values come from (lowest to highest priority): built-in defaults, an
//! optional TOML file, `MINIDFS__*` environment variables, then CLI flags
//! applied by the binaries.

use crate::common::chunk::DEFAULT_CHUNK_SIZE;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "minidfs.toml";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            coordinator: CoordinatorConfig::default(),
            node: NodeConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus the environment.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file_source)
            .add_source(
                ::config::Environment::with_prefix("MINIDFS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.node.validate()
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_coord_bind")]
    pub bind_addr: SocketAddr,

    /// Namespace snapshot file
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

fn default_coord_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./coord-data/namespace.snap")
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coord_bind(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Storage node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node ID (unique identifier)
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Bind address for the HTTP API
    #[serde(default = "default_node_bind")]
    pub bind_addr: SocketAddr,

    /// Address announced to the coordinator; defaults to `http://<bind_addr>`
    #[serde(default)]
    pub advertise_addr: Option<String>,

    /// Directory holding chunk files
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Coordinator base URL
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    /// Largest chunk body accepted by `PUT /chunks`
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_node_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6000))
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./node-data")
}

fn default_coordinator_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_max_chunk_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bind_addr: default_node_bind(),
            advertise_addr: None,
            data_path: default_data_path(),
            coordinator_url: default_coordinator_url(),
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }
}

impl NodeConfig {
    /// Address other processes should use to reach this node
    pub fn advertised(&self) -> String {
        match &self.advertise_addr {
            Some(addr) => addr.clone(),
            None => format!("http://{}", self.bind_addr),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(Error::InvalidConfig("node_id cannot be empty".into()));
        }
        if self.max_chunk_bytes == 0 {
            return Err(Error::InvalidConfig("max_chunk_bytes must be > 0".into()));
        }
        Ok(())
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Coordinator base URL
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    /// Maximum chunk payload in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-request timeout for remote calls, 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_url: default_coordinator_url(),
            chunk_size: default_chunk_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        Ok(())
    }
}
