//! Thin JSON client for the Northern backend.
//!
//! [`ApiClient`] wraps a `reqwest::Client` and a parsed API base URL. Every
//! response is decoded as loosely-typed JSON; non-2xx statuses and bodies
//! that are not JSON become [`ClientError`]s.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use northern_core::DashboardConfig;

use crate::endpoints::Endpoint;
use crate::error::{ClientError, Result};

/// JSON client bound to one API base.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for `api_base` with an optional request timeout.
    pub fn new(api_base: &str, timeout: Option<Duration>) -> Result<Self> {
        let base = Url::parse(api_base.trim())
            .map_err(|_| ClientError::InvalidBaseUrl(api_base.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(api_base.to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    /// Create a client from the dashboard config.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(
            &config.api_base,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    /// Absolute URL for an endpoint.
    pub fn url(&self, endpoint: &Endpoint) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(endpoint.segments());
        Ok(url)
    }

    /// GET an endpoint and decode its JSON body.
    pub async fn get_json(&self, endpoint: &Endpoint, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(endpoint)?;
        debug!(%endpoint, "GET {}", url);

        let response = self.client.get(url).query(query).send().await?;
        Self::read_json(endpoint, response).await
    }

    /// POST a JSON body to an endpoint and decode the JSON reply.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<Value> {
        let url = self.url(endpoint)?;
        debug!(%endpoint, "POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        Self::read_json(endpoint, response).await
    }

    async fn read_json(endpoint: &Endpoint, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::from_http_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            path: format!("/{}", endpoint.segments().join("/")),
            message: e.to_string(),
        })
    }
}
