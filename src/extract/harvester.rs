use crate::config::HarvestConfig;
use crate::extract::{ExtractError, ExtractionStream, Extractor, Output};
use crate::request::FetchResponse;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashSet;

/// Built-in extractor that records every page and follows its links
///
/// Each page yields one record `{url, title, status, depth}`,
/// followed by a request for every new link while the page's depth is below
/// `max_depth`. The depth travels in request metadata under `"depth"`; seeds
/// without it start at 0.
#[derive(Debug, Clone)]
pub struct PageHarvester {
    max_depth: u32,
    same_host: bool,
}

impl PageHarvester {
    pub fn new(max_depth: u32, same_host: bool) -> Self {
        Self {
            max_depth,
            same_host,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.max_depth, config.same_host)
    }

    fn outputs(&self, response: &FetchResponse) -> Vec<Result<Output, ExtractError>> {
        let depth = response
            .request
            .metadata()
            .get("depth")
            .and_then(|d| d.as_u64())
            .unwrap_or(0);

        let mut outputs = vec![Ok(Output::record(json!({
            "url": response.url.as_str(),
            "title": response.title(),
            "status": response.status_code,
            "depth": depth,
        })))];

        if depth >= u64::from(self.max_depth) {
            return outputs;
        }

        let host = response.request.url().host_str();
        let mut seen = HashSet::new();

        for link in response.links() {
            if !seen.insert(link.clone()) {
                continue;
            }

            let request = response
                .request
                .follow(&link)
                .metadata(json!({ "depth": depth + 1 }))
                .build();

            match request {
                Ok(request) if self.same_host && request.url().host_str() != host => {
                    tracing::trace!("Skipping off-host link {}", link);
                }
                Ok(request) => outputs.push(Ok(Output::Request(request))),
                Err(e) => outputs.push(Err(e.into())),
            }
        }

        outputs
    }
}

impl Extractor for PageHarvester {
    fn name(&self) -> &str {
        "page-harvester"
    }

    fn extract(&self, response: FetchResponse) -> ExtractionStream {
        stream::iter(self.outputs(&response)).boxed()
    }
}
