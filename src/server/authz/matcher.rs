/// Matches a request path against a rule pattern.
///
/// A pattern without `*` matches only the identical path. A pattern with a
/// `*` matches any path sharing the prefix before the star, whatever comes
/// after it (empty and multi-segment remainders included). Comparison is
/// byte-based: the prefix boundary may fall inside a multi-byte character
/// in the path, which must compare unequal rather than panic.
pub fn matches(pattern: &str, path: &str) -> bool {
    match pattern.find('*') {
        None => pattern == path,
        Some(i) => {
            if path.len() > i {
                path.as_bytes()[..i] == pattern.as_bytes()[..i]
            } else {
                path.as_bytes() == &pattern.as_bytes()[..i]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        assert!(matches("/api/v1/articles", "/api/v1/articles"));
        assert!(!matches("/api/v1/articles", "/api/v1/articles/"));
        assert!(!matches("/api/v1/articles", "/api/v1/articles/1"));
        assert!(!matches("/api/v1/articles", "/api/v1/roles"));
        assert!(matches("", ""));
        assert!(!matches("", "/"));
    }

    #[test]
    fn test_wildcard() {
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/123"));
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/abc"));
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/9/comments"));
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/"));
        assert!(!matches("/api/v1/articles/*", "/api/v1/articles"));
        assert!(!matches("/api/v1/articles/*", "/api/v1/other/1"));
        assert!(!matches("/api/v1/articles/*", "/api/v2/articles/1"));

        assert!(matches("/*", "/anything/at/all"));
        assert!(matches("*", "/anything/at/all"));
        assert!(matches("*", ""));
    }

    #[test]
    fn test_multibyte_paths() {
        // The prefix boundary may split a multi-byte character; this must
        // simply not match.
        assert!(!matches("/aa*", "/aé"));
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/café"));
        assert!(matches("/api/v1/articles/*", "/api/v1/articles/🦀"));
        assert!(!matches("/café", "/cafe"));
        assert!(matches("/café", "/café"));
    }
}
