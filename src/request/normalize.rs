use crate::RequestError;
use url::Url;

/// Parses a URL and checks that it can be fetched
///
/// Only `http` and `https` URLs with a host are accepted.
pub fn parse_fetch_url(url_str: &str) -> Result<Url, RequestError> {
    let url = Url::parse(url_str.trim()).map_err(|e| RequestError::Parse(e.to_string()))?;
    check_fetch_url(&url)?;
    Ok(url)
}

/// Checks scheme and host of an already parsed URL
pub fn check_fetch_url(url: &Url) -> Result<(), RequestError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RequestError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(RequestError::MissingHost);
    }

    Ok(())
}

/// Produces the canonical form of a URL used for fingerprinting
///
/// # Normalization Steps
///
/// 1. Host is lowercased (the `url` crate already does this for special schemes)
/// 2. Empty path becomes `/`
/// 3. Fragment is removed
/// 4. Query parameters are sorted by key, then by value
/// 5. An empty query string is removed
///
/// Path segments and parameter values are otherwise left untouched: two URLs
/// that differ only in path case or trailing slash may address different
/// resources.
///
/// # Examples
///
/// ```
/// use sumi_harvest::request::canonical_url;
/// use url::Url;
///
/// let url = Url::parse("https://Example.com/list?b=2&a=1#top").unwrap();
/// assert_eq!(canonical_url(&url), "https://example.com/list?a=1&b=2");
/// ```
pub fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    }

    if url.query().is_some() {
        let params = sorted_query_pairs(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url.to_string()
}

fn sorted_query_pairs(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();
    params
}
