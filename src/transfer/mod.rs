/*!
 * Transfer orchestration
 *
 * The orchestrator walks a local tree or a remote key listing, applies the
 * include/exclude filter, and drives each selected entry through a single-shot
 * or multipart transfer over the [`Connection`] seam. Failures are isolated
 * per entry: a bulk operation runs every entry to completion and reports a
 * partial-failure summary at the end, while a part failure inside one
 * multipart job aborts that job (and its remote session) without touching
 * sibling jobs.
 */

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::{EngineConfig, TransferOptions};
use crate::connection::{Connection, KeyRecord, ListPage, Method, Request};
use crate::error::{Result, SkiffError};
use crate::uri::RemoteAddress;

mod download;
mod remove;
mod upload;

pub use upload::MultipartSession;

/// Listing page size requested from the store
const LIST_LIMIT: usize = 200;

/// Direction of a transfer job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

/// Lifecycle of one transfer job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Planned,
    InProgress,
    Completed,
    Aborted,
}

/// One local/remote pair selected for transfer.
///
/// A job reaches `Completed` only once every part of it has; any terminal
/// part failure moves it to `Aborted` after cleanup.
#[derive(Debug)]
pub struct TransferJob {
    pub direction: Direction,
    pub local: PathBuf,
    pub bucket: String,
    pub key: String,
    pub size: u64,
    state: JobState,
}

impl TransferJob {
    pub fn plan(
        direction: Direction,
        local: PathBuf,
        bucket: String,
        key: String,
        size: u64,
    ) -> Self {
        Self {
            direction,
            local,
            bucket,
            key,
            size,
            state: JobState::Planned,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn start(&mut self) {
        debug!(direction = ?self.direction, key = %self.key, size = self.size, "job started");
        self.state = JobState::InProgress;
    }

    pub fn complete(&mut self) {
        debug!(direction = ?self.direction, key = %self.key, "job completed");
        self.state = JobState::Completed;
    }

    pub fn abort(&mut self) {
        debug!(direction = ?self.direction, key = %self.key, "job aborted");
        self.state = JobState::Aborted;
    }
}

/// Immutable snapshot of one local filesystem entry, taken at walk time
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub path: PathBuf,
    /// Path relative to the walk root, normalized to `/` separators
    pub rel: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Per-entry outcome counts for a bulk operation
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkSummary {
    pub total: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn record(&mut self, outcome: &Result<()>) {
        self.total += 1;
        if outcome.is_err() {
            self.failed += 1;
        }
    }

    /// Collapse the summary into the operation result: an aggregate failure
    /// only if at least one entry failed.
    pub fn into_result(self) -> Result<()> {
        if self.failed > 0 {
            Err(SkiffError::PartialFailure {
                failed: self.failed,
                total: self.total,
            })
        } else {
            Ok(())
        }
    }
}

/// Top-level transfer engine bound to one connection and one tuning profile
pub struct TransferOrchestrator {
    conn: Arc<dyn Connection>,
    engine: EngineConfig,
}

impl TransferOrchestrator {
    pub fn new(conn: Arc<dyn Connection>, engine: EngineConfig) -> Result<Self> {
        engine.validate()?;
        Ok(Self { conn, engine })
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub(crate) fn connection(&self) -> &dyn Connection {
        &*self.conn
    }

    /// Fetch one listing page under `prefix`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
    ) -> Result<ListPage> {
        let mut request = Request::new(Method::Get, bucket)
            .param("prefix", prefix)
            .param("limit", LIST_LIMIT.to_string());
        if let Some(marker) = marker {
            request = request.param("marker", marker);
        }
        let response = self.conn.make_request(request).await?;
        if response.is_not_found() {
            return Err(SkiffError::NotFound {
                bucket: bucket.to_string(),
                key: prefix.to_string(),
            });
        }
        if !response.is_success() {
            return Err(SkiffError::status("listing", response.status));
        }
        response.json()
    }

    /// Walk the paginated listing to the end and collect every key under
    /// `prefix`.
    pub(crate) async fn list_all_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<KeyRecord>> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self.list_page(bucket, prefix, marker.as_deref()).await?;
            keys.extend(page.keys);
            match (page.has_more, page.next_marker) {
                (true, Some(next)) => marker = Some(next),
                _ => break,
            }
        }
        Ok(keys)
    }

    /// Filtered listing for the `ls` surface.
    pub async fn list_keys(
        &self,
        source: &RemoteAddress,
        opts: &TransferOptions,
    ) -> Result<Vec<KeyRecord>> {
        let keys = self.list_all_keys(&source.bucket, &source.key).await?;
        Ok(keys
            .into_iter()
            .filter(|record| opts.qualifies(relative_key(&record.key, &source.key)))
            .collect())
    }

    /// Cheap existence probe for the `force=false` skip decision.
    pub(crate) async fn remote_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let response = self
            .conn
            .make_request(Request::new(Method::Head, bucket).key(key))
            .await?;
        Ok(response.is_success())
    }

    /// Create a bucket. The name was validated when the address was parsed;
    /// the guard here covers callers constructing addresses directly.
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        if !crate::bucket::validate_bucket_name(bucket) {
            return Err(SkiffError::InvalidBucketName(bucket.to_string()));
        }
        let response = self
            .conn
            .make_request(Request::new(Method::Put, bucket))
            .await?;
        if !response.is_success() {
            return Err(SkiffError::status("bucket creation", response.status));
        }
        Ok(())
    }

    /// Delete a bucket; with `force`, clear its keys first.
    pub async fn delete_bucket(&self, bucket: &str, force: bool) -> Result<()> {
        if force {
            let all = RemoteAddress {
                bucket: bucket.to_string(),
                key: String::new(),
            };
            self.remove_multiple_keys(&all, &TransferOptions::default())
                .await?;
        }
        let response = self
            .conn
            .make_request(Request::new(Method::Delete, bucket))
            .await?;
        match response.status {
            s if (200..300).contains(&s) => Ok(()),
            404 => Err(SkiffError::NotFound {
                bucket: bucket.to_string(),
                key: String::new(),
            }),
            409 => Err(SkiffError::Transfer(format!(
                "bucket {} is not empty (use --force)",
                bucket
            ))),
            s => Err(SkiffError::status("bucket deletion", s)),
        }
    }
}

/// The portion of `key` below the listing prefix; this is what the filter
/// pair is matched against, mirroring the relative path used on upload.
pub(crate) fn relative_key<'a>(key: &'a str, prefix: &str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Append a relative name to a destination key prefix.
pub(crate) fn join_key(prefix: &str, rel: &str) -> String {
    if prefix.is_empty() {
        rel.to_string()
    } else if prefix.ends_with('/') {
        format!("{}{}", prefix, rel)
    } else {
        format!("{}/{}", prefix, rel)
    }
}
