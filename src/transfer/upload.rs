/*!
 * Upload paths: bulk directory upload, single-shot, and multipart
 */

use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::{join_key, BulkSummary, Direction, LocalEntry, TransferJob, TransferOrchestrator};
use crate::chunk::ChunkReader;
use crate::config::TransferOptions;
use crate::connection::{CompleteBody, Connection, InitiateResult, Method, ObjectPart, Request};
use crate::error::{Result, SkiffError};
use crate::part::{plan_parts, Part};
use crate::path::to_unix_path;
use crate::uri::RemoteAddress;

/// A live multipart upload on the remote store.
///
/// Sessions are never dropped silently: ownership moves into either
/// [`complete`](Self::complete) or [`abort`](Self::abort), so every session
/// ends with an explicit remote call.
pub struct MultipartSession {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

impl MultipartSession {
    /// Initiate a session for `bucket/key`.
    pub async fn initiate(conn: &dyn Connection, bucket: &str, key: &str) -> Result<Self> {
        let response = conn
            .make_request(
                Request::new(Method::Post, bucket)
                    .key(key)
                    .param("uploads", ""),
            )
            .await?;
        if !response.is_success() {
            return Err(SkiffError::Multipart(format!(
                "initiate for {} failed with status {}",
                key, response.status
            )));
        }
        let init: InitiateResult = response.json()?;
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: init.upload_id,
        })
    }

    /// Complete the session. Parts are sorted by index here so the wire call
    /// lists them in ascending order regardless of completion order.
    pub async fn complete(self, conn: &dyn Connection, mut parts: Vec<ObjectPart>) -> Result<()> {
        parts.sort_by_key(|p| p.part_number);
        let body = CompleteBody { object_parts: parts };
        let response = conn
            .make_request(
                Request::new(Method::Post, &self.bucket)
                    .key(&self.key)
                    .param("upload_id", &self.upload_id)
                    .body(Bytes::from(serde_json::to_vec(&body)?)),
            )
            .await?;
        if !response.is_success() {
            return Err(SkiffError::Multipart(format!(
                "complete for {} failed with status {}",
                self.key, response.status
            )));
        }
        Ok(())
    }

    /// Abort the session, releasing uploaded-but-uncommitted parts so they do
    /// not remain billable.
    pub async fn abort(self, conn: &dyn Connection) -> Result<()> {
        let response = conn
            .make_request(
                Request::new(Method::Delete, &self.bucket)
                    .key(&self.key)
                    .param("upload_id", &self.upload_id),
            )
            .await?;
        if !response.is_success() && !response.is_not_found() {
            return Err(SkiffError::Multipart(format!(
                "abort for {} failed with status {}",
                self.key, response.status
            )));
        }
        Ok(())
    }
}

impl TransferOrchestrator {
    /// Recursively upload a directory tree.
    ///
    /// The walk snapshot is taken up front; entries are filtered by the
    /// include/exclude pair against their unix-form relative path, and each
    /// qualifying file becomes one destination key under the prefix. Per-file
    /// failures are logged and counted, never aborting the rest of the run.
    pub async fn upload_files(
        &self,
        source: &Path,
        dest: &RemoteAddress,
        opts: &TransferOptions,
    ) -> Result<()> {
        if !source.is_dir() {
            return Err(SkiffError::LocalNotFound(source.to_path_buf()));
        }

        let entries = walk_local_tree(source)?;
        let mut summary = BulkSummary::default();
        for entry in entries.iter().filter(|e| !e.is_dir) {
            if !opts.qualifies(&entry.rel) {
                continue;
            }
            let key = join_key(&dest.key, &entry.rel);
            let outcome = self
                .upload_entry(&entry.path, entry.size, &dest.bucket, &key, opts)
                .await;
            if let Err(err) = &outcome {
                warn!(key = %key, error = %err, "upload failed");
            }
            summary.record(&outcome);
        }
        summary.into_result()
    }

    /// Upload exactly one local file.
    ///
    /// When the destination is a bare bucket or ends in `/`, the file name is
    /// appended to form the key.
    pub async fn upload_file(
        &self,
        source: &Path,
        dest: &RemoteAddress,
        opts: &TransferOptions,
    ) -> Result<()> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|_| SkiffError::LocalNotFound(source.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(SkiffError::Config(format!(
                "{} is a directory; bulk upload handles directories",
                source.display()
            )));
        }

        let key = if dest.is_prefix() {
            let name = source
                .file_name()
                .map(|n| to_unix_path(&n.to_string_lossy()))
                .ok_or_else(|| SkiffError::LocalNotFound(source.to_path_buf()))?;
            join_key(&dest.key, &name)
        } else {
            dest.key.clone()
        };

        self.upload_entry(source, metadata.len(), &dest.bucket, &key, opts)
            .await
    }

    /// Shared single-file path: skip-if-exists, then single-shot or multipart
    /// by size.
    async fn upload_entry(
        &self,
        source: &Path,
        size: u64,
        bucket: &str,
        key: &str,
        opts: &TransferOptions,
    ) -> Result<()> {
        if !opts.force && self.remote_exists(bucket, key).await? {
            info!(key = %key, "destination exists, skipped (use --force to overwrite)");
            return Ok(());
        }

        let mut job = TransferJob::plan(
            Direction::Upload,
            source.to_path_buf(),
            bucket.to_string(),
            key.to_string(),
            size,
        );
        job.start();

        let outcome = if size < self.engine().threshold() {
            self.upload_single(source, bucket, key).await
        } else {
            self.upload_multipart(source, size, bucket, key).await
        };

        match outcome {
            Ok(()) => {
                job.complete();
                info!(key = %key, size, "uploaded");
                Ok(())
            }
            Err(err) => {
                job.abort();
                Err(err)
            }
        }
    }

    async fn upload_single(&self, source: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = tokio::fs::read(source).await?;
        let response = self
            .connection()
            .make_request(
                Request::new(Method::Put, bucket)
                    .key(key)
                    .body(Bytes::from(body)),
            )
            .await?;
        if !response.is_success() {
            return Err(SkiffError::status(&format!("upload of {}", key), response.status));
        }
        Ok(())
    }

    /// Multipart path: open a session, fan parts out over the worker pool,
    /// wait for every part to settle, then complete. Any part failure aborts
    /// the session instead, so no partially uploaded object remains visible.
    async fn upload_multipart(
        &self,
        source: &Path,
        size: u64,
        bucket: &str,
        key: &str,
    ) -> Result<()> {
        let session = MultipartSession::initiate(self.connection(), bucket, key).await?;
        let parts = plan_parts(size, self.engine().part_size);

        let results: Vec<Result<ObjectPart>> = stream::iter(parts)
            .map(|part| self.upload_part(source, &session, part))
            .buffer_unordered(self.engine().workers)
            .collect()
            .await;

        let mut completed = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(part) => completed.push(part),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => session.complete(self.connection(), completed).await,
            Some(err) => {
                if let Err(abort_err) = session.abort(self.connection()).await {
                    warn!(key = %key, error = %abort_err, "failed to abort multipart session");
                }
                Err(err)
            }
        }
    }

    /// Transfer one part. The reader is owned by this task and closed on
    /// every exit path.
    async fn upload_part(
        &self,
        source: &Path,
        session: &MultipartSession,
        part: Part,
    ) -> Result<ObjectPart> {
        let mut reader = ChunkReader::open(source, &part).await?;
        let data = reader.read_to_end().await;
        reader.close();
        let data = data?;

        let response = self
            .connection()
            .make_request(
                Request::new(Method::Put, &session.bucket)
                    .key(&session.key)
                    .param("upload_id", &session.upload_id)
                    .param("part_number", part.index.to_string())
                    .body(data),
            )
            .await?;
        if !response.is_success() {
            return Err(SkiffError::status(
                &format!("part {} of {}", part.index, session.key),
                response.status,
            ));
        }
        let etag = response.etag().ok_or_else(|| {
            SkiffError::Multipart(format!("no etag returned for part {}", part.index))
        })?;
        Ok(ObjectPart {
            part_number: part.index,
            etag,
        })
    }
}

/// Snapshot the local tree once; no re-stat happens during transfer.
fn walk_local_tree(source: &Path) -> Result<Vec<LocalEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| SkiffError::Io(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| SkiffError::Io(e.into()))?;
        entries.push(LocalEntry {
            path: entry.path().to_path_buf(),
            rel: to_unix_path(&rel.to_string_lossy()),
            size: metadata.len(),
            is_dir: metadata.is_dir(),
        });
    }
    Ok(entries)
}
