//! HTTP API for the coordinator
//!
//! JSON in, JSON out. Failures are returned as `ErrorBody` with a status
//! code derived from the error kind.

use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{
    ChunkId, ChunkLocationRequest, CommitFileRequest, CoordinatorStatus, NodeInfo, RegisterNodeRequest,
    Resolution, Result,
};
use crate::coordinator::service::CoordinatorService;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared coordinator state for HTTP handlers.
#[derive(Clone)]
pub struct CoordState {
    pub service: Arc<CoordinatorService>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LocateQuery {
    pub id: String,
}

/// Creates the HTTP router with all coordinator endpoints.
pub fn create_router(state: CoordState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/status", get(admin_status))
        .route("/nodes", post(register_node).get(list_nodes))
        .route("/nodes/:node_id", get(lookup_node))
        .route("/placement/next", post(next_node))
        .route("/chunks/record", post(record_chunk_location))
        .route("/chunks/announce", post(register_chunk))
        .route("/chunks/locate", get(locate_chunk))
        .route("/files", get(list_files))
        .route("/files/commit", post(commit_file))
        .route("/files/resolve", get(resolve_file))
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn health(State(state): State<CoordState>) -> impl IntoResponse {
    let status = state.service.status();
    Json(json!({
        "status": "healthy",
        "nodes": status.nodes,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn admin_status(State(state): State<CoordState>) -> Json<CoordinatorStatus> {
    Json(state.service.status())
}

async fn register_node(
    State(state): State<CoordState>,
    Json(req): Json<RegisterNodeRequest>,
) -> Result<StatusCode> {
    state.service.register_node(&req.id, &req.address)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_nodes(State(state): State<CoordState>) -> Json<Vec<NodeInfo>> {
    Json(state.service.list_nodes())
}

async fn lookup_node(
    State(state): State<CoordState>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeInfo>> {
    Ok(Json(state.service.lookup_node(&node_id)?))
}

async fn next_node(State(state): State<CoordState>) -> Result<Json<NodeInfo>> {
    Ok(Json(state.service.next_node()?))
}

async fn record_chunk_location(
    State(state): State<CoordState>,
    Json(req): Json<ChunkLocationRequest>,
) -> StatusCode {
    state
        .service
        .record_chunk_location(req.chunk_id, &req.node_id);
    StatusCode::NO_CONTENT
}

async fn register_chunk(
    State(state): State<CoordState>,
    Json(req): Json<ChunkLocationRequest>,
) -> StatusCode {
    state.service.register_chunk(req.chunk_id, &req.node_id);
    StatusCode::NO_CONTENT
}

async fn locate_chunk(
    State(state): State<CoordState>,
    Query(query): Query<LocateQuery>,
) -> Result<Json<NodeInfo>> {
    let chunk_id: ChunkId = query.id.parse()?;
    Ok(Json(state.service.locate_chunk(&chunk_id)?))
}

async fn list_files(State(state): State<CoordState>) -> Json<Vec<String>> {
    Json(state.service.list_files())
}

async fn commit_file(
    State(state): State<CoordState>,
    Json(req): Json<CommitFileRequest>,
) -> Result<StatusCode> {
    state.service.commit_file(&req.name, req.chunks, req.size)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_file(
    State(state): State<CoordState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Resolution>> {
    Ok(Json(state.service.resolve_file(&query.name)?))
}
