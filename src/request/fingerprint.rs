use super::normalize::canonical_url;
use super::FetchRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a fetch request
///
/// Two requests with equal fingerprints are treated as the same resource by
/// the deduplicator and share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex-encoded SHA-256 digest, 64 characters
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the fingerprint of a request
///
/// The digest covers the method, the canonical URL, the content type, the
/// headers (names lowercased), query params, form data and JSON body. The
/// extractor, transport, metadata and timeout do not participate.
pub fn fingerprint(request: &FetchRequest) -> Fingerprint {
    let mut hasher = Sha256::new();

    field(&mut hasher, "method", request.method().as_str());
    field(&mut hasher, "url", &canonical_url(request.url()));
    field(&mut hasher, "content-type", request.content_type().as_str());

    let headers: BTreeMap<String, &str> = request
        .headers()
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
        .collect();
    pairs(&mut hasher, "headers", headers.iter().map(|(k, v)| (k.as_str(), *v)));
    pairs(
        &mut hasher,
        "params",
        request.params().iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    pairs(
        &mut hasher,
        "form",
        request
            .form_data()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    // serde_json::Value keeps object keys sorted, so Display is canonical
    let body = request
        .json_data()
        .map(|v| v.to_string())
        .unwrap_or_default();
    field(&mut hasher, "json", &body);

    Fingerprint(hex::encode(hasher.finalize()))
}

fn field(hasher: &mut Sha256, name: &str, value: &str) {
    hasher.update(name.as_bytes());
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn pairs<'a>(hasher: &mut Sha256, name: &str, entries: impl Iterator<Item = (&'a str, &'a str)>) {
    hasher.update(name.as_bytes());
    for (key, value) in entries {
        field(hasher, "k", key);
        field(hasher, "v", value);
    }
    hasher.update(b"\0");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testing::{builder, get};
    use crate::request::{ContentType, Method};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = fingerprint(&get("https://example.com/"));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_request_same_fingerprint() {
        let a = fingerprint(&get("https://example.com/list?page=1"));
        let b = fingerprint(&get("https://example.com/list?page=1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fragment_and_query_order_ignored() {
        let a = fingerprint(&get("https://example.com/list?a=1&b=2#top"));
        let b = fingerprint(&get("https://example.com/list?b=2&a=1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_metadata_and_timeout_ignored() {
        let a = builder("https://example.com/")
            .metadata(json!({"depth": 1}))
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let b = builder("https://example.com/")
            .metadata(json!({"depth": 7}))
            .build()
            .unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_header_name_case_ignored() {
        let a = builder("https://example.com/")
            .header("Accept", "text/html")
            .build()
            .unwrap();
        let b = builder("https://example.com/")
            .header("accept", "text/html")
            .build()
            .unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_distinguishing_fields() {
        let base = fingerprint(&get("https://example.com/"));

        let other_url = fingerprint(&get("https://example.com/other"));
        let json_type = fingerprint(
            &builder("https://example.com/")
                .content_type(ContentType::Json)
                .build()
                .unwrap(),
        );
        let with_param = fingerprint(
            &builder("https://example.com/")
                .param("page", "2")
                .build()
                .unwrap(),
        );
        let post = fingerprint(
            &builder("https://example.com/")
                .method(Method::Post)
                .form("q", "x")
                .build()
                .unwrap(),
        );

        for fp in [&other_url, &json_type, &with_param, &post] {
            assert_ne!(&base, fp);
        }
    }

    #[test]
    fn test_json_body_key_order_ignored() {
        let a = builder("https://example.com/api")
            .method(Method::Post)
            .json_body(json!({"a": 1, "b": 2}))
            .build()
            .unwrap();
        let b = builder("https://example.com/api")
            .method(Method::Post)
            .json_body(serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap())
            .build()
            .unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_param_boundaries_are_unambiguous() {
        let a = builder("https://example.com/")
            .param("ab", "c")
            .build()
            .unwrap();
        let b = builder("https://example.com/")
            .param("a", "bc")
            .build()
            .unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
