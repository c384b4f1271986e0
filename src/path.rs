/*!
 * Local path normalization helpers
 *
 * Remote keys always use `/` as the delimiter; local paths use whatever the
 * platform uses. These two functions are the only place the difference is
 * bridged, so key derivation behaves identically on every platform.
 */

use std::path::{Path, PathBuf};

/// Replace platform path separators with `/`.
///
/// Pure and total: never touches the filesystem. On unix this is a no-op for
/// native paths but still normalizes backslash-separated input copied from
/// elsewhere.
pub fn to_unix_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join a directory and a relative path using the platform's native separator.
///
/// Both inputs may arrive in either separator style; the result is usable
/// directly with the local filesystem API. Joining an already-joined result
/// with an empty relative component leaves it unchanged.
pub fn join_local_path(dir: &Path, rel: &str) -> PathBuf {
    let mut out = dir.to_path_buf();
    for seg in to_unix_path(rel).split('/').filter(|s| !s.is_empty()) {
        out.push(seg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_unix_path() {
        assert_eq!(to_unix_path("foo\\bar"), "foo/bar");
        assert_eq!(to_unix_path("foo/bar"), "foo/bar");
        assert_eq!(to_unix_path(""), "");
    }

    #[test]
    fn test_join_local_path() {
        let joined = join_local_path(Path::new("foo"), "bar/test.txt");
        let expected: PathBuf = ["foo", "bar", "test.txt"].iter().collect();
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_join_local_path_mixed_separators() {
        let joined = join_local_path(Path::new("foo"), "bar\\test.txt");
        let expected: PathBuf = ["foo", "bar", "test.txt"].iter().collect();
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_join_local_path_idempotent_on_empty_rel() {
        let base = join_local_path(Path::new("foo"), "bar");
        assert_eq!(join_local_path(&base, ""), base);
    }
}
