pub mod memory;

use autoscale_core::{AutoscaleError, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body,
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request/response round trip against the autoscale service.
#[cfg_attr(test, mockall::automock)]
pub trait AutoscaleRepository: Send + Sync {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

pub struct ReqwestAutoscaleRepository {
    client: Client,
}

impl ReqwestAutoscaleRepository {
    pub fn new(auth_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = auth_token {
            let mut value = HeaderValue::from_str(token.trim()).map_err(|e| {
                AutoscaleError::InvalidConfiguration(format!("invalid auth token: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTH_TOKEN_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AutoscaleError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl AutoscaleRepository for ReqwestAutoscaleRepository {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        debug!(method = %request.method, url = %request.url, "Dispatching autoscale request");

        let mut builder = self.client.request(request.method.clone(), &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| {
            AutoscaleError::Transport(format!(
                "{} {} failed: {e}",
                request.method, request.url
            ))
        })?;
        let status = response.status().as_u16();

        let body = response.text().map_err(|e| {
            AutoscaleError::Transport(format!("failed to read response body: {e}"))
        })?;

        debug!(method = %request.method, url = %request.url, status, "Autoscale response received");
        Ok(ApiResponse { status, body })
    }
}
