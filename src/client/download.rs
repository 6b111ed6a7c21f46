//! Download: resolve, fetch chunks in ordinal order, reassemble

use crate::client::transfer::ProgressReporter;
use crate::common::{encode_name, ChunkPlacement, CoordinatorApi, Error, NodeConnector, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Summary of a finished download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub name: String,
    pub size: u64,
    pub chunks: usize,
    pub path: PathBuf,
}

pub(crate) struct Downloader {
    pub coordinator: Arc<dyn CoordinatorApi>,
    pub nodes: Arc<dyn NodeConnector>,
}

impl Downloader {
    /// Download `name` into `out_dir`.
    ///
    /// Data is written to `<name>.<uuid>.part` and renamed over the final
    /// path only once every chunk has arrived. On failure the part file is
    /// removed and an existing output file is left as it was. Concurrent
    /// downloads of one name each write their own part file; the last
    /// rename wins.
    pub async fn to_dir(
        self,
        name: String,
        out_dir: PathBuf,
        progress: ProgressReporter,
    ) -> Result<DownloadReport> {
        let start = Instant::now();
        let final_path = out_dir.join(local_file_name(&name));
        let part_path = part_path(&final_path);

        tokio::fs::create_dir_all(&out_dir).await?;
        let mut file = tokio::fs::File::create(&part_path).await?;

        let result = self.fetch_into(&name, &mut file, &progress).await;
        let result = match result {
            Ok(fetched) => match file.sync_all().await {
                Ok(()) => Ok(fetched),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        drop(file);

        let (size, chunks) = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part_path).await {
                    tracing::warn!("Failed to remove {:?}: {}", part_path, rm);
                }
                tracing::warn!("Download of {} failed: {}", name, e);
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, &final_path).await?;
        tracing::info!(
            "Downloaded {} to {:?}: {} chunk(s), {} bytes in {:?}",
            name,
            final_path,
            chunks,
            size,
            start.elapsed()
        );

        Ok(DownloadReport {
            name,
            size,
            chunks,
            path: final_path,
        })
    }

    /// Download `name` into memory
    pub async fn to_bytes(self, name: String, progress: ProgressReporter) -> Result<Bytes> {
        let mut buf = Vec::new();
        self.fetch_into(&name, &mut buf, &progress).await?;
        Ok(Bytes::from(buf))
    }

    /// Fetch every chunk of `name` into `writer`; returns (bytes, chunks)
    async fn fetch_into<W>(
        &self,
        name: &str,
        writer: &mut W,
        progress: &ProgressReporter,
    ) -> Result<(u64, usize)>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let resolution = self.coordinator.resolve_file(name).await?;
        let expected_size = resolution.size;
        let mut placements = resolution.into_complete()?;
        placements.sort_by(|a, b| a.chunk_id.ordinal().cmp(&b.chunk_id.ordinal()));

        let total = placements.len() as u64;
        let mut written: u64 = 0;

        for (fetched, placement) in placements.iter().enumerate() {
            let data = self.fetch_chunk(placement).await?;
            writer.write_all(&data).await?;
            written += data.len() as u64;
            progress.report(fetched as u64 + 1, total);
        }
        writer.flush().await?;

        if total == 0 {
            progress.report(0, 0);
        }
        if written != expected_size {
            return Err(Error::Corrupted(format!(
                "{}: reassembled {} bytes, namespace records {}",
                name, written, expected_size
            )));
        }
        Ok((written, placements.len()))
    }

    /// Fetch one chunk from the node that stored it last
    async fn fetch_chunk(&self, placement: &ChunkPlacement) -> Result<Bytes> {
        let node_id = placement
            .newest()
            .ok_or_else(|| Error::Internal(format!("{} has no location", placement.chunk_id)))?;
        let node = self.coordinator.lookup_node(node_id).await?;
        let handle = self.nodes.connect(&node)?;
        let data = handle.get_chunk(&placement.chunk_id).await?;
        tracing::debug!(
            "Fetched {} ({} bytes) from {}",
            placement.chunk_id,
            data.len(),
            node_id
        );
        Ok(data)
    }
}

/// Name used on the local disk; names that are not a single plain path
/// component are percent-encoded.
fn local_file_name(name: &str) -> String {
    if name == "." || name == ".." {
        return name.replace('.', "%2E");
    }
    if name.contains(['/', '\\']) {
        encode_name(name)
    } else {
        name.to_string()
    }
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut part = final_path.as_os_str().to_owned();
    part.push(format!(".{}.part", Uuid::new_v4().simple()));
    PathBuf::from(part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name("notes.txt"), "notes.txt");
        assert_eq!(local_file_name("a b.txt"), "a b.txt");
        assert_eq!(local_file_name("dir/notes.txt"), "dir%2Fnotes.txt");
        assert_eq!(local_file_name(".."), "%2E%2E");
    }

    #[test]
    fn test_part_path_is_unique_per_download() {
        let first = part_path(Path::new("/tmp/out/a.bin"));
        let second = part_path(Path::new("/tmp/out/a.bin"));
        assert_ne!(first, second);

        assert_eq!(first.parent(), Some(Path::new("/tmp/out")));
        let file = first.file_name().unwrap().to_str().unwrap();
        assert!(file.starts_with("a.bin."));
        assert!(file.ends_with(".part"));
    }
}
