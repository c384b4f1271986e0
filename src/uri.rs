/*!
 * Remote address parsing
 *
 * Remote locations are written `os://bucket/prefix`; the key space is flat,
 * so everything after the bucket is an opaque key or key prefix.
 */

use crate::bucket::validate_bucket_name;
use crate::error::{Result, SkiffError};

/// The URI scheme marking a remote location
pub const REMOTE_SCHEME: &str = "os://";

/// A parsed `os://bucket/key` address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddress {
    pub bucket: String,
    /// Key or key prefix; empty for a bare bucket address
    pub key: String,
}

impl RemoteAddress {
    /// True when the address names a prefix rather than a single key.
    pub fn is_prefix(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }
}

/// Check whether a CLI path argument names a remote location.
pub fn is_remote_uri(s: &str) -> bool {
    s.starts_with(REMOTE_SCHEME)
}

/// Parse and validate an `os://bucket/key` address.
///
/// The bucket name is checked against the naming rules here so every caller
/// gets the guard before issuing a request.
pub fn parse_remote_uri(uri: &str) -> Result<RemoteAddress> {
    let rest = uri
        .strip_prefix(REMOTE_SCHEME)
        .ok_or_else(|| SkiffError::Config(format!("Not a remote address: {}", uri)))?;

    let parts: Vec<&str> = rest.splitn(2, '/').collect();
    let bucket = parts[0];
    if bucket.is_empty() {
        return Err(SkiffError::Config(format!(
            "Remote address must include a bucket name: {}",
            uri
        )));
    }
    if !validate_bucket_name(bucket) {
        return Err(SkiffError::InvalidBucketName(bucket.to_string()));
    }

    Ok(RemoteAddress {
        bucket: bucket.to_string(),
        key: parts.get(1).unwrap_or(&"").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_key() {
        let addr = parse_remote_uri("os://my-bucket/path/to/file.txt").unwrap();
        assert_eq!(addr.bucket, "my-bucket");
        assert_eq!(addr.key, "path/to/file.txt");
        assert!(!addr.is_prefix());
    }

    #[test]
    fn test_parse_bare_bucket() {
        let addr = parse_remote_uri("os://my-bucket").unwrap();
        assert_eq!(addr.key, "");
        assert!(addr.is_prefix());
    }

    #[test]
    fn test_trailing_slash_is_prefix() {
        let addr = parse_remote_uri("os://my-bucket/logs/").unwrap();
        assert!(addr.is_prefix());
    }

    #[test]
    fn test_rejects_invalid_bucket() {
        assert!(matches!(
            parse_remote_uri("os://Bad.Bucket/key"),
            Err(SkiffError::InvalidBucketName(_))
        ));
        assert!(matches!(
            parse_remote_uri("os:///key"),
            Err(SkiffError::Config(_))
        ));
    }

    #[test]
    fn test_is_remote_uri() {
        assert!(is_remote_uri("os://bucket/key"));
        assert!(!is_remote_uri("/local/path"));
        assert!(!is_remote_uri("c:\\local\\path"));
    }
}
