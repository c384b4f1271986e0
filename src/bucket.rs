/*!
 * Bucket naming rules
 */

/// Validate a bucket name against the store's naming rules.
///
/// Valid names are 4 to 63 characters of lowercase letters, digits, and
/// hyphens, and neither start nor end with a hyphen. Pure predicate; callers
/// that create or address a bucket check this before any network call.
pub fn validate_bucket_name(name: &str) -> bool {
    if name.len() < 4 || name.len() > 63 {
        return false;
    }
    if name.starts_with('-') || name.ends_with('-') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_hyphen_at_edges() {
        assert!(!validate_bucket_name("-abcd"));
        assert!(!validate_bucket_name("abcd-"));
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(!validate_bucket_name("ab.cd"));
        assert!(!validate_bucket_name("Abcd"));
        assert!(!validate_bucket_name("ab!cd"));
        assert!(!validate_bucket_name("ab%cd"));
        assert!(!validate_bucket_name("ab$cd"));
        assert!(!validate_bucket_name("ab cd"));
    }

    #[test]
    fn test_length_bounds() {
        assert!(!validate_bucket_name("abc"));
        assert!(!validate_bucket_name(&"a".repeat(64)));
        assert!(validate_bucket_name(&"a".repeat(63)));
        assert!(validate_bucket_name("abcd"));
    }

    #[test]
    fn test_accepts_valid_names() {
        assert!(validate_bucket_name("0ab-cd"));
        assert!(validate_bucket_name("0ab-cd1"));
    }
}
