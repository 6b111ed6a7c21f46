//! Chunking client
//!
//! Splits local files into fixed-size chunks, spreads them over the
//! storage nodes picked by the coordinator, and reassembles them on the
//! way back. Transfers run in the background; see [`transfer`].

pub mod download;
pub mod remote;
pub mod transfer;
pub mod upload;

pub use download::DownloadReport;
pub use remote::{HttpCoordinatorClient, HttpNodeClient, HttpNodeConnector};
pub use transfer::{Progress, Transfer, TransferState};
pub use upload::UploadReport;

use crate::common::{
    ChunkId, ClientConfig, CoordinatorApi, CoordinatorStatus, Error, NodeConnector, NodeInfo,
    Result,
};
use bytes::Bytes;
use download::Downloader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use upload::Uploader;

#[derive(Clone)]
pub struct Client {
    coordinator: Arc<dyn CoordinatorApi>,
    nodes: Arc<dyn NodeConnector>,
    chunk_size: usize,
}

impl Client {
    pub fn new(
        coordinator: Arc<dyn CoordinatorApi>,
        nodes: Arc<dyn NodeConnector>,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        Ok(Self {
            coordinator,
            nodes,
            chunk_size,
        })
    }

    /// Client talking HTTP to the coordinator and nodes
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let timeout = config.request_timeout();
        let coordinator = HttpCoordinatorClient::new(&config.coordinator_url, timeout)?;
        let nodes = HttpNodeConnector::new(timeout)?;
        Self::new(Arc::new(coordinator), Arc::new(nodes), config.chunk_size)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn coordinator(&self) -> &Arc<dyn CoordinatorApi> {
        &self.coordinator
    }

    fn uploader(&self) -> Uploader {
        Uploader {
            coordinator: self.coordinator.clone(),
            nodes: self.nodes.clone(),
            chunk_size: self.chunk_size,
        }
    }

    fn downloader(&self) -> Downloader {
        Downloader {
            coordinator: self.coordinator.clone(),
            nodes: self.nodes.clone(),
        }
    }

    /// Upload a local file under its file name.
    ///
    /// Progress is reported as bytes processed over the file size.
    pub fn upload(&self, path: impl AsRef<Path>) -> Transfer<UploadReport> {
        let path = path.as_ref().to_path_buf();
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => {
                let name = name.to_string();
                self.upload_as(path, name)
            }
            None => {
                let msg = format!("{:?} has no usable file name", path);
                Transfer::spawn(|_| async move { Err(Error::InvalidConfig(msg)) })
            }
        }
    }

    /// Upload a local file under an explicit name
    pub fn upload_as(
        &self,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Transfer<UploadReport> {
        let path = path.into();
        let name = name.into();
        let uploader = self.uploader();
        Transfer::spawn(|progress| async move {
            let file = tokio::fs::File::open(&path).await?;
            let total = file.metadata().await?.len();
            uploader.run(name, file, total, progress).await
        })
    }

    /// Upload an in-memory payload
    pub fn upload_bytes(&self, name: impl Into<String>, data: Bytes) -> Transfer<UploadReport> {
        let name = name.into();
        let uploader = self.uploader();
        Transfer::spawn(|progress| async move {
            let total = data.len() as u64;
            uploader
                .run(name, std::io::Cursor::new(data), total, progress)
                .await
        })
    }

    /// Download a file into `out_dir`.
    ///
    /// Progress is reported as chunks fetched over the chunk count.
    pub fn download(
        &self,
        name: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Transfer<DownloadReport> {
        let name = name.into();
        let out_dir = out_dir.into();
        let downloader = self.downloader();
        Transfer::spawn(|progress| downloader.to_dir(name, out_dir, progress))
    }

    /// Download a file into memory
    pub fn download_bytes(&self, name: impl Into<String>) -> Transfer<Bytes> {
        let name = name.into();
        let downloader = self.downloader();
        Transfer::spawn(|progress| downloader.to_bytes(name, progress))
    }

    pub async fn list_files(&self) -> Result<Vec<String>> {
        self.coordinator.list_files().await
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.coordinator.list_nodes().await
    }

    /// Node a chunk would be read from
    pub async fn locate_chunk(&self, chunk_id: &ChunkId) -> Result<NodeInfo> {
        self.coordinator.locate_chunk(chunk_id).await
    }

    pub async fn status(&self) -> Result<CoordinatorStatus> {
        self.coordinator.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorService;
    use crate::node::{ChunkStore, LocalNodes};
    use tempfile::{tempdir, TempDir};
    use tokio_stream::StreamExt;

    struct Cluster {
        coord: Arc<CoordinatorService>,
        nodes: Arc<LocalNodes>,
        _dirs: Vec<TempDir>,
    }

    fn cluster(n: usize) -> Cluster {
        let coord = Arc::new(CoordinatorService::in_memory());
        let nodes = Arc::new(LocalNodes::new());
        let mut dirs = Vec::new();
        for i in 0..n {
            let dir = tempdir().unwrap();
            let id = format!("node-{}", i + 1);
            nodes.add(id.clone(), Arc::new(ChunkStore::open(dir.path()).unwrap()));
            coord.register_node(&id, &format!("local://{}", id)).unwrap();
            dirs.push(dir);
        }
        Cluster {
            coord,
            nodes,
            _dirs: dirs,
        }
    }

    fn client(cluster: &Cluster, chunk_size: usize) -> Client {
        Client::new(cluster.coord.clone(), cluster.nodes.clone(), chunk_size).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_download_bytes() {
        let cluster = cluster(2);
        let client = client(&cluster, 4);
        let data = Bytes::from_static(b"hello chunked world");

        let report = client
            .upload_bytes("greeting.txt", data.clone())
            .wait()
            .await
            .unwrap();
        assert_eq!(report.size, data.len() as u64);
        assert_eq!(report.chunks.len(), 5);
        assert_eq!(report.chunks[4], ChunkId::new("greeting.txt", 4));

        let back = client.download_bytes("greeting.txt").wait().await.unwrap();
        assert_eq!(back, data);
    }

    #[tokio::test]
    async fn test_upload_progress_is_byte_based() {
        let cluster = cluster(1);
        let client = client(&cluster, 10);

        let mut transfer = client.upload_bytes("p.bin", Bytes::from(vec![7u8; 25]));
        let events: Vec<u8> = transfer
            .progress()
            .unwrap()
            .map(|p| p.percent)
            .collect()
            .await;
        assert_eq!(events, vec![40, 80, 100]);
        assert_eq!(transfer.state(), TransferState::Completed);
    }

    #[tokio::test]
    async fn test_download_progress_counts_chunks() {
        let cluster = cluster(2);
        let client = client(&cluster, 64);

        // Written straight to the stores so the sizes can differ freely
        let sizes = [1usize, 40, 3, 12];
        let mut chunks = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            let node_id = format!("node-{}", i % 2 + 1);
            let id = ChunkId::new("uneven.bin", i as u64);
            let store = cluster.nodes.get(&node_id).unwrap();
            store.put(&id, &vec![i as u8; *size]).unwrap();
            cluster.coord.record_chunk_location(id.clone(), &node_id);
            chunks.push(id);
        }
        let total: usize = sizes.iter().sum();
        cluster
            .coord
            .commit_file("uneven.bin", chunks, total as u64)
            .unwrap();

        let mut transfer = client.download_bytes("uneven.bin");
        let events: Vec<(u8, u64, u64)> = transfer
            .progress()
            .unwrap()
            .map(|p| (p.percent, p.done, p.total))
            .collect()
            .await;
        assert_eq!(
            events,
            vec![(25, 1, 4), (50, 2, 4), (75, 3, 4), (100, 4, 4)]
        );
        assert_eq!(transfer.wait().await.unwrap().len(), total);
    }

    #[tokio::test]
    async fn test_upload_without_nodes_commits_nothing() {
        let cluster = cluster(0);
        let client = client(&cluster, 4);

        let transfer = client.upload_bytes("x.bin", Bytes::from_static(b"abcdef"));
        let err = transfer.wait().await.unwrap_err();
        assert!(matches!(err, Error::NoNodesAvailable));
        assert!(cluster.coord.list_files().is_empty());
    }

    #[tokio::test]
    async fn test_empty_upload_commits_empty_list() {
        let cluster = cluster(1);
        let client = client(&cluster, 4);

        let report = client
            .upload_bytes("empty", Bytes::new())
            .wait()
            .await
            .unwrap();
        assert!(report.chunks.is_empty());
        assert_eq!(cluster.coord.list_files(), vec!["empty"]);
        let back = client.download_bytes("empty").wait().await.unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let cluster = cluster(0);
        assert!(Client::new(cluster.coord.clone(), cluster.nodes.clone(), 0).is_err());
    }
}
