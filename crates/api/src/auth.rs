use std::sync::Arc;
use std::time::Duration;

use iclogs_core::time::Clock;
use iclogs_core::{IclogsError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::endpoint::Endpoint;
use crate::transport_error;

pub const TOKEN_PATH: &str = "/identity/token";
pub const API_KEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Token {
    #[serde(rename = "access_token")]
    pub value: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Epoch seconds at which the token was received.
    #[serde(skip)]
    pub created: i64,
}

impl Token {
    pub fn expires_at(&self) -> i64 {
        self.created + self.expires_in
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "errorCode", default)]
    code: String,
    #[serde(rename = "errorMessage", default)]
    message: String,
    #[serde(rename = "errorDetails", default)]
    details: String,
}

/// Exchanges an API key for a bearer token at the IAM token endpoint.
pub struct TokenProvider {
    http: Client,
    endpoint: Endpoint,
    clock: Arc<dyn Clock>,
}

impl TokenProvider {
    pub fn new(endpoint: Endpoint, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = Client::builder()
            .timeout(AUTH_TIMEOUT)
            .build()
            .map_err(transport_error)?;
        tracing::debug!(endpoint = endpoint.as_str(), "token provider ready");
        Ok(Self {
            http,
            endpoint,
            clock,
        })
    }

    pub async fn get_token(&self, api_key: &str) -> Result<Token> {
        let url = self.endpoint.join(TOKEN_PATH)?;
        tracing::debug!(url = %url, "requesting token");

        let response = self
            .http
            .post(url)
            .form(&[("grant_type", API_KEY_GRANT_TYPE), ("apikey", api_key)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.map_err(transport_error)?;
            let envelope = serde_json::from_str::<ErrorEnvelope>(&body).unwrap_or_else(|e| {
                ErrorEnvelope {
                    message: format!("cannot decode error body: {e}"),
                    details: body.clone(),
                    ..ErrorEnvelope::default()
                }
            });
            return Err(IclogsError::Auth {
                status: status.as_u16(),
                code: envelope.code,
                message: envelope.message,
                details: envelope.details,
            });
        }

        let mut token: Token = response
            .json()
            .await
            .map_err(|e| IclogsError::Parse(format!("cannot decode token response: {e}")))?;
        token.created = self.clock.now().timestamp();
        tracing::debug!(expires_in = token.expires_in, "token issued");
        Ok(token)
    }
}
