//! Upload: split, place, store, record, then commit once

use crate::client::transfer::ProgressReporter;
use crate::common::utils::validate_file_name;
use crate::common::{chunk_count, ChunkId, CoordinatorApi, NodeConnector, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Summary of a committed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub name: String,
    pub size: u64,
    pub chunks: Vec<ChunkId>,
}

pub(crate) struct Uploader {
    pub coordinator: Arc<dyn CoordinatorApi>,
    pub nodes: Arc<dyn NodeConnector>,
    pub chunk_size: usize,
}

impl Uploader {
    /// Upload `total` bytes read from `reader` under `name`.
    ///
    /// Each chunk goes to the next round-robin node and its location is
    /// recorded before the next chunk is read. The namespace is only
    /// touched by the final commit, so any failure leaves nothing visible
    /// (chunks already stored stay on their nodes as orphans).
    pub async fn run<R>(
        self,
        name: String,
        mut reader: R,
        total: u64,
        progress: ProgressReporter,
    ) -> Result<UploadReport>
    where
        R: AsyncRead + Unpin + Send,
    {
        validate_file_name(&name)?;
        let start = Instant::now();
        tracing::info!(
            "Uploading {} ({} bytes, {} chunk(s))",
            name,
            total,
            chunk_count(total, self.chunk_size)
        );

        let mut buf = vec![0u8; self.chunk_size];
        let mut chunks = Vec::new();
        let mut processed: u64 = 0;

        loop {
            let n = fill_buf(&mut reader, &mut buf).await?;
            if n == 0 {
                break;
            }

            let chunk_id = ChunkId::new(name.clone(), chunks.len() as u64);
            let target = self.coordinator.next_node().await?;
            let node = self.nodes.connect(&target)?;
            node.put_chunk(&chunk_id, Bytes::copy_from_slice(&buf[..n]))
                .await?;
            self.coordinator
                .record_chunk_location(&chunk_id, &target.id)
                .await?;
            tracing::debug!("Stored {} ({} bytes) on {}", chunk_id, n, target.id);

            chunks.push(chunk_id);
            processed += n as u64;
            progress.report(processed, total);

            if n < buf.len() {
                break;
            }
        }

        self.coordinator
            .commit_file(&name, &chunks, processed)
            .await?;
        if chunks.is_empty() {
            progress.report(0, 0);
        }

        tracing::info!(
            "Uploaded {}: {} chunk(s), {} bytes in {:?}",
            name,
            chunks.len(),
            processed,
            start.elapsed()
        );
        Ok(UploadReport {
            name,
            size: processed,
            chunks,
        })
    }
}

/// Read until `buf` is full or the reader is exhausted
async fn fill_buf<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
