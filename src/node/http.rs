//! HTTP API for a storage node
//!
//! - `PUT /chunks?id=<chunk id>` with the raw chunk bytes as body
//! - `GET /chunks?id=<chunk id>` returns the raw bytes
//! - `GET /chunks/list` returns the ids of intact local chunks

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{ChunkId, Result};
use crate::node::store::{chunk_digest, ChunkStore};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Shared node state for HTTP handlers.
#[derive(Clone)]
pub struct NodeState {
    pub store: Arc<ChunkStore>,
    pub node_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChunkQuery {
    pub id: String,
}

/// Acknowledgement for a stored chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutChunkResponse {
    pub chunk_id: ChunkId,
    pub node_id: String,
    pub size: usize,
    pub blake3: String,
}

/// Creates the HTTP router; bodies above `max_chunk_bytes` are rejected.
pub fn create_router(state: NodeState, max_chunk_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chunks", get(get_chunk).put(put_chunk))
        .route("/chunks/list", get(list_chunks))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_chunk_bytes))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn health(State(state): State<NodeState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "node_id": state.node_id,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn put_chunk(
    State(state): State<NodeState>,
    Query(query): Query<ChunkQuery>,
    body: Bytes,
) -> Result<Json<PutChunkResponse>> {
    let chunk_id: ChunkId = query.id.parse()?;
    state.store.put(&chunk_id, &body)?;
    Ok(Json(PutChunkResponse {
        chunk_id,
        node_id: state.node_id.clone(),
        size: body.len(),
        blake3: chunk_digest(&body),
    }))
}

async fn get_chunk(
    State(state): State<NodeState>,
    Query(query): Query<ChunkQuery>,
) -> Result<Vec<u8>> {
    let chunk_id: ChunkId = query.id.parse()?;
    state.store.get(&chunk_id)
}

async fn list_chunks(State(state): State<NodeState>) -> Result<Json<Vec<ChunkId>>> {
    Ok(Json(state.store.list()?))
}
