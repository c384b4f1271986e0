/*!
 * Bulk key removal
 */

use tracing::{info, warn};

use super::{relative_key, BulkSummary, TransferOrchestrator};
use crate::config::TransferOptions;
use crate::connection::{Method, Request};
use crate::error::{Result, SkiffError};
use crate::uri::RemoteAddress;

impl TransferOrchestrator {
    /// Delete every key under the target prefix that passes the filter pair.
    ///
    /// Deletion is idempotent: a key that vanished between listing and delete
    /// counts as success, so re-running a removal never reports failures for
    /// work already done. Other errors are counted per key without stopping
    /// the remaining deletions.
    pub async fn remove_multiple_keys(
        &self,
        target: &RemoteAddress,
        opts: &TransferOptions,
    ) -> Result<()> {
        let keys = self.list_all_keys(&target.bucket, &target.key).await?;

        let mut summary = BulkSummary::default();
        for record in &keys {
            if !opts.qualifies(relative_key(&record.key, &target.key)) {
                continue;
            }
            let outcome = self.remove_key(&target.bucket, &record.key).await;
            if let Err(err) = &outcome {
                warn!(key = %record.key, error = %err, "delete failed");
            }
            summary.record(&outcome);
        }
        info!(
            bucket = %target.bucket,
            removed = summary.total - summary.failed,
            failed = summary.failed,
            "bulk delete finished"
        );
        summary.into_result()
    }

    /// Delete one key; "not found" is success.
    pub async fn remove_key(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self
            .connection()
            .make_request(Request::new(Method::Delete, bucket).key(key))
            .await?;
        if response.is_success() || response.is_not_found() {
            Ok(())
        } else {
            Err(SkiffError::status(&format!("delete of {}", key), response.status))
        }
    }
}
