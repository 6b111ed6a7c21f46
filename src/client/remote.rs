//! HTTP implementations of the coordinator and node APIs
//!
//! Error responses carry an `ErrorBody` and are rebuilt into the same
//! [`Error`] kind here, so callers see identical errors whether they talk
//! to a service in-process or over the network.

use crate::common::{
    encode_name, ChunkId, ChunkLocationRequest, CommitFileRequest, CoordinatorApi,
    CoordinatorStatus, Error, ErrorBody, NodeApi, NodeConnector, NodeInfo, RegisterNodeRequest,
    Resolution, Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send a request, mapping transport failures and error bodies to [`Error`].
///
/// `peer` names the remote side in `NodeUnreachable` errors; `None` means
/// the coordinator, whose transport failures surface as `Http`.
async fn send(request: RequestBuilder, peer: Option<&str>) -> Result<Response> {
    let response = request.send().await.map_err(|e| transport_error(e, peer))?;
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(e, peer))?;
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(Error::from_body(body)),
        Err(_) => Err(Error::Http(format!("{}: {}", status, text))),
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder, peer: Option<&str>) -> Result<T> {
    let response = send(request, peer).await?;
    response
        .json()
        .await
        .map_err(|e| Error::Http(format!("Invalid response body: {}", e)))
}

fn transport_error(e: reqwest::Error, peer: Option<&str>) -> Error {
    if e.is_timeout() {
        return Error::Timeout(e.to_string());
    }
    match peer {
        Some(node) if e.is_connect() || e.is_request() => Error::NodeUnreachable {
            node: node.to_string(),
            reason: e.to_string(),
        },
        _ => Error::Http(e.to_string()),
    }
}

/// Coordinator reached over HTTP
#[derive(Clone)]
pub struct HttpCoordinatorClient {
    client: Client,
    base_url: String,
}

impl HttpCoordinatorClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CoordinatorApi for HttpCoordinatorClient {
    async fn register_node(&self, node_id: &str, address: &str) -> Result<()> {
        let body = RegisterNodeRequest {
            id: node_id.to_string(),
            address: address.to_string(),
        };
        send(self.client.post(self.url("/nodes")).json(&body), None).await?;
        Ok(())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        send_json(self.client.get(self.url("/nodes")), None).await
    }

    async fn lookup_node(&self, node_id: &str) -> Result<NodeInfo> {
        let path = format!("/nodes/{}", encode_name(node_id));
        send_json(self.client.get(self.url(&path)), None).await
    }

    async fn next_node(&self) -> Result<NodeInfo> {
        send_json(self.client.post(self.url("/placement/next")), None).await
    }

    async fn record_chunk_location(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()> {
        let body = ChunkLocationRequest {
            chunk_id: chunk_id.clone(),
            node_id: node_id.to_string(),
        };
        send(self.client.post(self.url("/chunks/record")).json(&body), None).await?;
        Ok(())
    }

    async fn register_chunk(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()> {
        let body = ChunkLocationRequest {
            chunk_id: chunk_id.clone(),
            node_id: node_id.to_string(),
        };
        send(self.client.post(self.url("/chunks/announce")).json(&body), None).await?;
        Ok(())
    }

    async fn commit_file(&self, name: &str, chunks: &[ChunkId], size: u64) -> Result<()> {
        let body = CommitFileRequest {
            name: name.to_string(),
            chunks: chunks.to_vec(),
            size,
        };
        send(self.client.post(self.url("/files/commit")).json(&body), None).await?;
        Ok(())
    }

    async fn locate_chunk(&self, chunk_id: &ChunkId) -> Result<NodeInfo> {
        let request = self
            .client
            .get(self.url("/chunks/locate"))
            .query(&[("id", chunk_id.to_string())]);
        send_json(request, None).await
    }

    async fn resolve_file(&self, name: &str) -> Result<Resolution> {
        let request = self
            .client
            .get(self.url("/files/resolve"))
            .query(&[("name", name)]);
        send_json(request, None).await
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        send_json(self.client.get(self.url("/files")), None).await
    }

    async fn status(&self) -> Result<CoordinatorStatus> {
        send_json(self.client.get(self.url("/admin/status")), None).await
    }
}

/// One storage node reached over HTTP
#[derive(Clone)]
pub struct HttpNodeClient {
    client: Client,
    node_id: String,
    base_url: String,
}

impl HttpNodeClient {
    pub fn new(client: Client, node: &NodeInfo) -> Self {
        Self {
            client,
            node_id: node.id.clone(),
            base_url: trim_base(&node.address),
        }
    }

    fn chunk_request(&self, request: RequestBuilder, chunk_id: &ChunkId) -> RequestBuilder {
        request.query(&[("id", chunk_id.to_string())])
    }
}

#[async_trait]
impl NodeApi for HttpNodeClient {
    async fn put_chunk(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        let url = format!("{}/chunks", self.base_url);
        let request = self.chunk_request(self.client.put(url), chunk_id).body(data);
        send(request, Some(&self.node_id)).await?;
        Ok(())
    }

    async fn get_chunk(&self, chunk_id: &ChunkId) -> Result<Bytes> {
        let url = format!("{}/chunks", self.base_url);
        let request = self.chunk_request(self.client.get(url), chunk_id);
        let response = send(request, Some(&self.node_id)).await?;
        response
            .bytes()
            .await
            .map_err(|e| transport_error(e, Some(&self.node_id)))
    }
}

/// Connects to nodes by their advertised HTTP address.
///
/// All handles share one connection pool.
#[derive(Clone)]
pub struct HttpNodeConnector {
    client: Client,
}

impl HttpNodeConnector {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl NodeConnector for HttpNodeConnector {
    fn connect(&self, node: &NodeInfo) -> Result<Arc<dyn NodeApi>> {
        Ok(Arc::new(HttpNodeClient::new(self.client.clone(), node)))
    }
}
