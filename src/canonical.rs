//! URL canonicalization.
//!
//! The canonical form is the basis of the cache key and the `url` field of
//! every report, so it must be deterministic and total: the same raw input
//! always yields the same canonical string, and malformed input passes
//! through best-effort instead of failing.

use url::Url;

/// Canonicalizes a raw URL string.
///
/// - Adds an `http://` scheme when none is present
/// - Strips any fragment
/// - Strips trailing slashes from non-root paths (the root path stays `/`)
/// - Preserves the query string
///
/// Never fails; input that does not parse as a URL is returned trimmed but
/// otherwise untouched.
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let Ok(mut parsed) = Url::parse(&with_scheme) else {
        return trimmed.to_string();
    };

    parsed.set_fragment(None);

    // Normalize the path component so the result is idempotent; a path of
    // nothing but slashes collapses to the root path.
    let path = parsed.path();
    if path != "/" && path.ends_with('/') {
        let stripped = path.trim_end_matches('/').to_string();
        if stripped.is_empty() {
            parsed.set_path("/");
        } else {
            parsed.set_path(&stripped);
        }
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::canonicalize_url;

    #[test]
    fn test_adds_http_scheme() {
        assert_eq!(canonicalize_url("example.com"), "http://example.com/");
    }

    #[test]
    fn test_preserves_https_scheme() {
        assert_eq!(
            canonicalize_url("https://example.com"),
            "https://example.com/"
        );
    }

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            canonicalize_url("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_strips_trailing_slash_from_path() {
        assert_eq!(
            canonicalize_url("https://example.com/a/b/"),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn test_root_path_keeps_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/"),
            "https://example.com/"
        );
    }

    #[test]
    fn test_preserves_query() {
        assert_eq!(
            canonicalize_url("example.com/path?a=1&b=2"),
            "http://example.com/path?a=1&b=2"
        );
    }

    #[test]
    fn test_malformed_input_passes_through() {
        assert_eq!(canonicalize_url("not a url at all"), "not a url at all");
    }

    #[test]
    fn test_deterministic() {
        let a = canonicalize_url("Example.com/Path/");
        let b = canonicalize_url("Example.com/Path/");
        assert_eq!(a, b);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_canonicalization_idempotent(domain in "[a-z]{3,20}\\.[a-z]{2,5}", path in "[a-z/]{0,30}") {
            let url = format!("{domain}/{path}");
            let once = canonicalize_url(&url);
            let twice = canonicalize_url(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_never_panics(input in ".{0,200}") {
            let _ = canonicalize_url(&input);
        }
    }
}
