//! Request URL to artifact.

use percent_encoding::percent_decode_str;

use crate::output::{Artifact, ArtifactSet};

const INDEX: &str = "index.html";

/// What a request resolves to.
#[derive(Debug)]
pub(super) enum Route<'a> {
    /// An artifact at the requested path.
    File(&'a Artifact),
    /// Client-side route answered with the entry document.
    Fallback(&'a Artifact),
    NotFound,
}

/// Output path a request URL names, relative to the output directory.
///
/// `None` for URLs outside `public_path` or escaping the output directory.
pub(super) fn output_path(url: &str, public_path: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    // a full URL public path (CDN) is served from the root
    let base = if public_path.starts_with('/') {
        public_path.trim_end_matches('/')
    } else {
        ""
    };
    let rest = decoded.strip_prefix(base)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let rel = rest.trim_start_matches('/');
    if rel.split('/').any(|seg| seg == "..") {
        return None;
    }
    Some(if rel.is_empty() || rel.ends_with('/') {
        format!("{rel}{INDEX}")
    } else {
        rel.to_string()
    })
}

/// Resolve a GET/HEAD request against `set`.
pub(super) fn route<'a>(
    set: &'a ArtifactSet,
    url: &str,
    public_path: &str,
    history_fallback: bool,
) -> Route<'a> {
    let Some(path) = output_path(url, public_path) else {
        return Route::NotFound;
    };
    if let Some(artifact) = set.get(&path) {
        return Route::File(artifact);
    }

    // `/users/42` is a client route; `/missing.png` is a missing file
    let last = path.rsplit('/').next().unwrap_or("");
    if history_fallback
        && !last.contains('.')
        && let Some(index) = set.get(INDEX)
    {
        return Route::Fallback(index);
    }
    Route::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ArtifactRole, ContentHash, OutputArtifact};

    fn set() -> ArtifactSet {
        let mut set = ArtifactSet::new();
        for (path, role) in [
            ("index.html", ArtifactRole::Document),
            ("assets/js/main.0123abcd.js", ArtifactRole::Script),
        ] {
            set.insert(
                OutputArtifact {
                    source_path: path.into(),
                    output_path: path.into(),
                    content_hash: ContentHash::of(path.as_bytes()),
                    role,
                    module_id: None,
                },
                path.as_bytes().to_vec(),
            )
            .unwrap();
        }
        set
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("/", "/").as_deref(), Some("index.html"));
        assert_eq!(output_path("/?x=1", "/").as_deref(), Some("index.html"));
        assert_eq!(
            output_path("/assets/js/a%20b.js#top", "/").as_deref(),
            Some("assets/js/a b.js")
        );
        assert_eq!(output_path("/app/", "/app/").as_deref(), Some("index.html"));
        assert_eq!(output_path("/app/x.js", "/app").as_deref(), Some("x.js"));
        assert_eq!(output_path("/application", "/app"), None);
        assert_eq!(output_path("/other/x.js", "/app/"), None);
        assert_eq!(output_path("/../secret", "/"), None);
        assert_eq!(
            output_path("/x.js", "https://cdn.example.com/").as_deref(),
            Some("x.js")
        );
    }

    #[test]
    fn test_route_files_and_fallback() {
        let set = set();
        assert!(matches!(
            route(&set, "/assets/js/main.0123abcd.js", "/", true),
            Route::File(a) if a.meta.role == ArtifactRole::Script
        ));
        assert!(matches!(route(&set, "/", "/", true), Route::File(_)));
        assert!(matches!(
            route(&set, "/users/42", "/", true),
            Route::Fallback(a) if a.meta.output_path == "index.html"
        ));
        assert!(matches!(route(&set, "/missing.png", "/", true), Route::NotFound));
        assert!(matches!(route(&set, "/users/42", "/", false), Route::NotFound));
    }
}
