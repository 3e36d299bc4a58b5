//! HTTP client for the agent's local control API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;

use tk_core::config::AgentConfig;
use tk_core::traits::ControlApi;
use tk_core::types::TunnelList;
use tk_core::{ApiError, ApiErrorDetail, Tunnel, TunnelCreationRequest};

const TUNNELS_PATH: &str = "/api/tunnels";

/// Client bound to one control API endpoint
#[derive(Debug, Clone)]
pub struct ControlApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlApiClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:4040`)
    ///
    /// Every request is bounded by `timeout` so an unresponsive agent
    /// cannot hang the caller.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the agent configuration
    pub fn from_config(config: &AgentConfig) -> Result<Self, ApiError> {
        Self::new(config.api_base_url(), config.request_timeout)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tunnels_url(&self) -> String {
        format!("{}{}", self.base_url, TUNNELS_PATH)
    }
}

/// Turn a non-success response into an error, preferring the structured form
fn failure(status: StatusCode, body: String) -> ApiError {
    match ApiErrorDetail::parse(&body) {
        Some(detail) => ApiError::Structured {
            status: status.as_u16(),
            detail,
        },
        None => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl ControlApi for ControlApiClient {
    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, ApiError> {
        let response = self
            .http
            .get(self.tunnels_url())
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_transport)?;
        tracing::debug!(status = status.as_u16(), "GET {}: '{}'", TUNNELS_PATH, body);

        if !status.is_success() {
            return Err(failure(status, body));
        }

        match serde_json::from_str::<TunnelList>(&body) {
            Ok(list) => Ok(list.tunnels),
            Err(source) => Err(ApiError::MalformedResponse { body, source }),
        }
    }

    async fn create_tunnel(&self, request: &TunnelCreationRequest) -> Result<Tunnel, ApiError> {
        tracing::debug!("POST {} request: {:?}", TUNNELS_PATH, request);

        let response = self
            .http
            .post(self.tunnels_url())
            .json(request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_transport)?;
        tracing::debug!(status = status.as_u16(), "POST {}: '{}'", TUNNELS_PATH, body);

        if !status.is_success() {
            return Err(failure(status, body));
        }

        match serde_json::from_str::<Tunnel>(&body) {
            Ok(tunnel) => Ok(tunnel),
            Err(source) => Err(ApiError::MalformedResponse { body, source }),
        }
    }
}
