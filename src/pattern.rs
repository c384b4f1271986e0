/*!
 * Glob-style pattern matching for transfer filters
 *
 * Deliberately not backed by a glob or regex crate: the filter must behave
 * identically for local paths and remote keys, so the matcher is spelled out
 * here. Only `*` (zero or more of any character, including `/`) and `?`
 * (exactly one character) are recognized; matches are anchored to the whole
 * string.
 */

/// Anchored whole-string match of `name` against `pattern`.
///
/// `*` matches any run of characters, `?` matches exactly one. A pattern with
/// literal characters left over after `name` is exhausted never matches.
pub fn pattern_match(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_at(&name, &pattern)
}

fn match_at(name: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some(('*', rest)) => {
            // Greedy with backtracking: try every possible span for the star.
            (0..=name.len()).any(|skip| match_at(&name[skip..], rest))
        }
        Some(('?', rest)) => !name.is_empty() && match_at(&name[1..], rest),
        Some((literal, rest)) => name.first() == Some(literal) && match_at(&name[1..], rest),
    }
}

/// Apply an `(exclude, include)` filter pair to an entry name.
///
/// Exclusion is evaluated first; an entry caught by `exclude` is re-admitted
/// only if `include` also matches it. With no `exclude` set, every entry
/// qualifies regardless of `include`.
pub fn is_pattern_match(name: &str, exclude: Option<&str>, include: Option<&str>) -> bool {
    match exclude {
        Some(ex) if pattern_match(name, ex) => {
            include.is_some_and(|inc| pattern_match(name, inc))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_everything() {
        for s in ["", "x", "xyz", "a/b/c", "日本語"] {
            assert!(pattern_match(s, "*"), "'*' must match {:?}", s);
        }
    }

    #[test]
    fn test_literal_self_match() {
        assert!(pattern_match("xyz", "xyz"));
        assert!(pattern_match("", ""));
    }

    #[test]
    fn test_question_mark() {
        assert!(pattern_match("xyz", "x?z"));
        assert!(!pattern_match("", "?"));
        assert!(!pattern_match("xz", "x?z"));
    }

    #[test]
    fn test_anchoring() {
        // Pattern shorter than the name: no implicit suffix wildcard.
        assert!(!pattern_match("xyz", "xy"));
        // Pattern longer than the name: trailing literals never match.
        assert!(!pattern_match("xy", "xyz"));
        assert!(!pattern_match("xyz", "*?x"));
    }

    #[test]
    fn test_star_spans_separators() {
        assert!(pattern_match("dir/sub/file.log", "*.log"));
        assert!(pattern_match("dir/sub/file.log", "dir/*"));
    }

    #[test]
    fn test_backtracking() {
        assert!(pattern_match("aXbXc", "a*X*c"));
        assert!(pattern_match("abc", "a*b*c"));
        assert!(!pattern_match("abc", "a*d*c"));
    }

    #[test]
    fn test_is_pattern_match() {
        assert!(is_pattern_match("xyz", None, None));
        assert!(!is_pattern_match("xyz", Some("*"), None));
        assert!(is_pattern_match("xyz", Some("*"), Some("x?z")));
        assert!(is_pattern_match("xyz", Some("*"), Some("*z")));
        // Exclude that does not match leaves the entry in.
        assert!(is_pattern_match("xyz", Some("*.log"), None));
        // Include alone has no filtering effect.
        assert!(is_pattern_match("xyz", None, Some("*.log")));
    }
}
