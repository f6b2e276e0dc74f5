use std::time::Duration;

use iclogs_core::model::log::QueryResult;
use iclogs_core::query::{QueryRequest, QuerySpec};
use iclogs_core::stream::StreamParser;
use iclogs_core::{IclogsError, Result};
use reqwest::Client;

use crate::endpoint::Endpoint;
use crate::transport_error;

pub const QUERY_PATH: &str = "/v1/query";

/// Client for the Cloud Logs query API. One request per call, no retries.
pub struct LogsClient {
    http: Client,
    endpoint: Endpoint,
}

impl LogsClient {
    /// `timeout` bounds the whole exchange, including reading the streamed body.
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        tracing::debug!(endpoint = endpoint.as_str(), ?timeout, "logs client ready");
        Ok(Self { http, endpoint })
    }

    pub async fn query(&self, token: &str, query: &str, spec: &QuerySpec) -> Result<QueryResult> {
        self.query_with_parser(token, query, spec, StreamParser::new())
            .await
    }

    pub async fn query_with_parser(
        &self,
        token: &str,
        query: &str,
        spec: &QuerySpec,
        mut parser: StreamParser,
    ) -> Result<QueryResult> {
        let url = self.endpoint.join(QUERY_PATH)?;
        let body = QueryRequest::new(query, spec);
        tracing::debug!(url = %url, with_metadata = body.metadata.is_some(), "submitting query");

        let mut response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(transport_error)?;
            return Err(IclogsError::Http {
                status: status.as_u16(),
                body,
            });
        }

        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            parser.feed(&chunk)?;
        }
        parser.finish()
    }
}
