/*!
 * Download paths: bulk prefix download, single-shot, and ranged multipart
 */

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{info, warn};

use super::{relative_key, BulkSummary, Direction, TransferJob, TransferOrchestrator};
use crate::config::TransferOptions;
use crate::connection::{Method, Request};
use crate::error::{Result, SkiffError};
use crate::part::{plan_parts, Part};
use crate::path::join_local_path;
use crate::uri::RemoteAddress;

impl TransferOrchestrator {
    /// Download every key under a prefix into a local directory.
    ///
    /// The listing is paginated to the end before any transfer starts; keys
    /// are filtered by their path relative to the prefix, and intermediate
    /// local directories are created as needed. Per-key failures are counted,
    /// never aborting the rest of the run.
    pub async fn download_files(
        &self,
        source: &RemoteAddress,
        dest: &Path,
        opts: &TransferOptions,
    ) -> Result<()> {
        let keys = self.list_all_keys(&source.bucket, &source.key).await?;

        let mut summary = BulkSummary::default();
        for record in &keys {
            let rel = relative_key(&record.key, &source.key);
            // Zero-length keys ending in '/' are directory placeholders.
            if rel.is_empty() || record.key.ends_with('/') {
                continue;
            }
            if !opts.qualifies(rel) {
                continue;
            }
            let local = join_local_path(dest, rel);
            let outcome = self
                .download_entry(&source.bucket, &record.key, record.size, &local, opts)
                .await;
            if let Err(err) = &outcome {
                warn!(key = %record.key, error = %err, "download failed");
            }
            summary.record(&outcome);
        }
        summary.into_result()
    }

    /// Download exactly one key.
    ///
    /// When `dest` is an existing directory the key's file name is appended.
    /// The object's size comes from a `HEAD` probe so the single-shot versus
    /// ranged-multipart decision mirrors upload.
    pub async fn download_file(
        &self,
        source: &RemoteAddress,
        dest: &Path,
        opts: &TransferOptions,
    ) -> Result<()> {
        if source.key.is_empty() {
            return Err(SkiffError::Config(
                "download source must name a key".to_string(),
            ));
        }
        let local = resolve_local_dest(dest, &source.key);

        let head = self
            .connection()
            .make_request(Request::new(Method::Head, &source.bucket).key(&source.key))
            .await?;
        if head.is_not_found() {
            return Err(SkiffError::NotFound {
                bucket: source.bucket.clone(),
                key: source.key.clone(),
            });
        }
        if !head.is_success() {
            return Err(SkiffError::status("size probe", head.status));
        }
        let size = head
            .header("content-length")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        self.download_entry(&source.bucket, &source.key, size, &local, opts)
            .await
    }

    /// Shared single-key path: skip-if-exists, then single-shot or ranged
    /// multipart by size.
    async fn download_entry(
        &self,
        bucket: &str,
        key: &str,
        size: u64,
        local: &Path,
        opts: &TransferOptions,
    ) -> Result<()> {
        if !opts.force && local.exists() {
            info!(path = %local.display(), "destination exists, skipped (use --force to overwrite)");
            return Ok(());
        }
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut job = TransferJob::plan(
            Direction::Download,
            local.to_path_buf(),
            bucket.to_string(),
            key.to_string(),
            size,
        );
        job.start();

        let outcome = if size < self.engine().threshold() {
            self.download_single(bucket, key, local).await
        } else {
            self.download_multipart(bucket, key, size, local).await
        };

        match outcome {
            Ok(()) => {
                job.complete();
                info!(key = %key, size, "downloaded");
                Ok(())
            }
            Err(err) => {
                job.abort();
                Err(err)
            }
        }
    }

    async fn download_single(&self, bucket: &str, key: &str, local: &Path) -> Result<()> {
        let response = self
            .connection()
            .make_request(Request::new(Method::Get, bucket).key(key))
            .await?;
        if response.is_not_found() {
            return Err(SkiffError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if !response.is_success() {
            return Err(SkiffError::status(&format!("download of {}", key), response.status));
        }
        tokio::fs::write(local, &response.body).await?;
        Ok(())
    }

    /// Ranged download: pre-size the destination, fetch parts concurrently,
    /// and write each at its own offset through a task-private handle. All
    /// part tasks settle before the job concludes; on failure the partial
    /// file is removed best-effort.
    async fn download_multipart(
        &self,
        bucket: &str,
        key: &str,
        size: u64,
        local: &Path,
    ) -> Result<()> {
        {
            let file = tokio::fs::File::create(local).await?;
            file.set_len(size).await?;
        }

        let parts = plan_parts(size, self.engine().part_size);
        let results: Vec<Result<()>> = stream::iter(parts)
            .map(|part| self.download_part(bucket, key, local, part))
            .buffer_unordered(self.engine().workers)
            .collect()
            .await;

        if let Some(err) = results.into_iter().find_map(|r| r.err()) {
            if let Err(cleanup_err) = tokio::fs::remove_file(local).await {
                warn!(path = %local.display(), error = %cleanup_err, "failed to remove partial file");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Fetch one byte range and write it at the matching offset.
    async fn download_part(&self, bucket: &str, key: &str, local: &Path, part: Part) -> Result<()> {
        if part.length == 0 {
            return Ok(());
        }
        let range = format!("bytes={}-{}", part.offset, part.offset + part.length - 1);
        let response = self
            .connection()
            .make_request(
                Request::new(Method::Get, bucket)
                    .key(key)
                    .header("Range", range),
            )
            .await?;
        if !response.is_success() {
            return Err(SkiffError::status(
                &format!("range {} of {}", part.index, key),
                response.status,
            ));
        }
        if response.body.len() as u64 != part.length {
            return Err(SkiffError::Transfer(format!(
                "range {} of {} returned {} bytes, expected {}",
                part.index,
                key,
                response.body.len(),
                part.length
            )));
        }

        let mut file = tokio::fs::OpenOptions::new().write(true).open(local).await?;
        file.seek(SeekFrom::Start(part.offset)).await?;
        file.write_all(&response.body).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Append the key's file name when the destination is a directory.
fn resolve_local_dest(dest: &Path, key: &str) -> PathBuf {
    if dest.is_dir() {
        let name = key.rsplit('/').next().unwrap_or(key);
        join_local_path(dest, name)
    } else {
        dest.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_local_dest_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_local_dest(dir.path(), "prefix/file.bin");
        assert_eq!(resolved, dir.path().join("file.bin"));
    }

    #[test]
    fn test_resolve_local_dest_explicit_file() {
        let dest = Path::new("/tmp/does-not-exist/target.bin");
        assert_eq!(resolve_local_dest(dest, "a/b"), dest);
    }
}
