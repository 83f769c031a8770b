//! Fetch requests and responses
//!
//! A [`FetchRequest`] describes one resource to retrieve together with the
//! extraction step to run on it and the transport that fetches it. Requests are
//! immutable once built; new requests are derived with [`FetchRequest::follow`]
//! or assembled with a [`RequestBuilder`].

mod fingerprint;
mod normalize;
mod response;

use crate::extract::Extractor;
use crate::transport::Transport;
use crate::{RequestError, RequestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use fingerprint::{fingerprint, Fingerprint};
pub use normalize::{canonical_url, check_fetch_url, parse_fetch_url};
pub use response::{CachedPayload, FetchResponse};

/// HTTP method of a fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected content type of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Raw text, typically HTML
    #[default]
    Text,
    /// JSON, parsed into [`FetchResponse::data`]
    Json,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// A single unit of work: what to fetch, how, and what to do with the result
#[derive(Clone)]
pub struct FetchRequest {
    url: Url,
    method: Method,
    content_type: ContentType,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    form_data: BTreeMap<String, String>,
    json_data: Option<serde_json::Value>,
    timeout: Option<Duration>,
    metadata: serde_json::Value,
    extractor: Arc<dyn Extractor>,
    transport: Arc<dyn Transport>,
}

impl FetchRequest {
    /// Starts building a request for `url`
    pub fn builder(
        url: impl Into<String>,
        extractor: Arc<dyn Extractor>,
        transport: Arc<dyn Transport>,
    ) -> RequestBuilder {
        RequestBuilder::new(url, extractor, transport)
    }

    /// Builds a plain GET request with default settings
    pub fn get(
        url: impl Into<String>,
        extractor: Arc<dyn Extractor>,
        transport: Arc<dyn Transport>,
    ) -> RequestResult<Self> {
        Self::builder(url, extractor, transport).build()
    }

    /// Starts a new request that reuses this request's extractor and transport
    ///
    /// Relative URLs are resolved against this request's URL. Headers, timeout,
    /// content type and metadata are not carried over.
    pub fn follow(&self, url: &str) -> RequestBuilder {
        let target = self
            .url
            .join(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());
        RequestBuilder::new(target, self.extractor.clone(), self.transport.clone())
    }

    /// Returns a builder pre-filled with every field of this request
    pub fn to_builder(&self) -> RequestBuilder {
        RequestBuilder {
            url: self.url.to_string(),
            method: self.method,
            content_type: self.content_type,
            headers: self.headers.clone(),
            params: self.params.clone(),
            form_data: self.form_data.clone(),
            json_data: self.json_data.clone(),
            timeout: self.timeout,
            metadata: self.metadata.clone(),
            extractor: self.extractor.clone(),
            transport: self.transport.clone(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn form_data(&self) -> &BTreeMap<String, String> {
        &self.form_data
    }

    pub fn json_data(&self) -> Option<&serde_json::Value> {
        self.json_data.as_ref()
    }

    /// Per-request timeout; the transport default applies when `None`
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Caller metadata carried through to the extraction step
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn extractor(&self) -> &Arc<dyn Extractor> {
        &self.extractor
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("form_data", &self.form_data)
            .field("json_data", &self.json_data)
            .field("timeout", &self.timeout)
            .field("metadata", &self.metadata)
            .field("extractor", &self.extractor.name())
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Builder for [`FetchRequest`]
///
/// Validation happens in [`RequestBuilder::build`]:
/// - the URL must be `http` or `https` and have a host
/// - `POST` requires form data or a JSON body
/// - `GET` must carry neither
pub struct RequestBuilder {
    url: String,
    method: Method,
    content_type: ContentType,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    form_data: BTreeMap<String, String>,
    json_data: Option<serde_json::Value>,
    timeout: Option<Duration>,
    metadata: serde_json::Value,
    extractor: Arc<dyn Extractor>,
    transport: Arc<dyn Transport>,
}

impl RequestBuilder {
    pub fn new(
        url: impl Into<String>,
        extractor: Arc<dyn Extractor>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            content_type: ContentType::Text,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            form_data: BTreeMap::new(),
            json_data: None,
            timeout: None,
            metadata: serde_json::Value::Null,
            extractor,
            transport,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.insert(name.into(), value.into());
        self
    }

    pub fn json_body(mut self, body: serde_json::Value) -> Self {
        self.json_data = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn build(self) -> RequestResult<FetchRequest> {
        let url = parse_fetch_url(&self.url)?;
        let has_body = !self.form_data.is_empty() || self.json_data.is_some();

        match self.method {
            Method::Post if !has_body => {
                return Err(RequestError::Invalid(
                    "POST requests require form data or a JSON body".to_string(),
                ));
            }
            Method::Get if has_body => {
                return Err(RequestError::Invalid(
                    "GET requests cannot carry form data or a JSON body".to_string(),
                ));
            }
            _ => {}
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(RequestError::Invalid("timeout must be non-zero".to_string()));
        }

        Ok(FetchRequest {
            url,
            method: self.method,
            content_type: self.content_type,
            headers: self.headers,
            params: self.params,
            form_data: self.form_data,
            json_data: self.json_data,
            timeout: self.timeout,
            metadata: self.metadata,
            extractor: self.extractor,
            transport: self.transport,
        })
    }
}
