use super::{ContentType, FetchRequest};
use crate::extract::{html, ExtractError};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// The successful result of fetching a [`FetchRequest`]
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The request that produced this response
    pub request: FetchRequest,

    /// HTTP status code
    pub status_code: u16,

    /// Final URL after redirects
    pub url: Url,

    /// Raw response body
    pub text: String,

    /// Parsed body for JSON requests
    pub data: Option<serde_json::Value>,

    /// Response headers, names lowercased
    pub headers: BTreeMap<String, String>,

    /// Whether the payload was served from the cache
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn new(request: FetchRequest, status_code: u16, url: Url, text: impl Into<String>) -> Self {
        Self {
            request,
            status_code,
            url,
            text: text.into(),
            data: None,
            headers: BTreeMap::new(),
            from_cache: false,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Parses the body as an HTML document
    ///
    /// Refused for requests declared as JSON.
    pub fn html(&self) -> Result<Html, ExtractError> {
        if self.request.content_type() == ContentType::Json {
            return Err(ExtractError::NotHtml(self.url.to_string()));
        }
        Ok(Html::parse_document(&self.text))
    }

    /// Parsed JSON body, if any
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Absolute links found in the HTML body
    ///
    /// Empty for JSON responses.
    pub fn links(&self) -> Vec<String> {
        self.html()
            .map(|document| html::extract_links(&document, &self.url))
            .unwrap_or_default()
    }

    /// Page title from the HTML body
    pub fn title(&self) -> Option<String> {
        self.html()
            .ok()
            .and_then(|document| html::extract_title(&document))
    }

    /// Text content of every element matching a CSS selector
    pub fn select_text(&self, selector: &str) -> Result<Vec<String>, ExtractError> {
        let document = self.html()?;
        html::select_text(&document, selector)
    }

    /// Snapshot of the fetched payload for the cache
    pub fn to_payload(&self) -> CachedPayload {
        CachedPayload {
            status_code: self.status_code,
            url: self.url.to_string(),
            text: self.text.clone(),
            data: self.data.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Rebuilds a response for `request` from a cached payload
    pub fn from_payload(request: FetchRequest, payload: CachedPayload) -> Self {
        let url = Url::parse(&payload.url).unwrap_or_else(|_| request.url().clone());
        Self {
            request,
            status_code: payload.status_code,
            url,
            text: payload.text,
            data: payload.data,
            headers: payload.headers,
            from_cache: true,
        }
    }
}

/// Pre-extraction fetch payload as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub status_code: u16,
    pub url: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testing::{builder, get};
    use serde_json::json;

    const PAGE: &str = r#"<html><head><title> Books </title></head>
        <body><a href="/catalog/1">One</a><a href="mailto:x@example.com">Mail</a>
        <p class="price">10</p><p class="price">12</p></body></html>"#;

    fn response(text: &str) -> FetchResponse {
        let request = get("https://example.com/index.html");
        let url = request.url().clone();
        FetchResponse::new(request, 200, url, text)
    }

    #[test]
    fn test_title_and_links() {
        let response = response(PAGE);
        assert_eq!(response.title(), Some("Books".to_string()));
        assert_eq!(response.links(), vec!["https://example.com/catalog/1"]);
    }

    #[test]
    fn test_select_text() {
        let response = response(PAGE);
        assert_eq!(response.select_text("p.price").unwrap(), vec!["10", "12"]);
        assert!(matches!(
            response.select_text("p[["),
            Err(ExtractError::Selector(_))
        ));
    }

    #[test]
    fn test_html_refused_for_json_request() {
        let request = builder("https://example.com/api")
            .content_type(ContentType::Json)
            .build()
            .unwrap();
        let url = request.url().clone();
        let response =
            FetchResponse::new(request, 200, url, "{\"a\":1}").with_data(json!({"a": 1}));

        assert!(matches!(response.html(), Err(ExtractError::NotHtml(_))));
        assert!(response.links().is_empty());
        assert_eq!(response.json(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_payload_restores_response() {
        let original = response(PAGE).with_header("Content-Type", "text/html");
        let payload = original.to_payload();
        assert_eq!(payload.headers.get("content-type").map(String::as_str), Some("text/html"));

        let restored = FetchResponse::from_payload(original.request.clone(), payload);
        assert!(restored.from_cache);
        assert_eq!(restored.text, original.text);
        assert_eq!(restored.url, original.url);
        assert_eq!(restored.status_code, 200);
    }
}
