//! HTTP transport for the language-model API.
//!
//! The generator talks to the network only through [`HttpClient`], so tests
//! can substitute a canned response and never open a socket.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP communication with external APIs.
///
/// # Example
///
/// ```ignore
/// use agentkit::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.post_json(
///     "https://api.example.com/endpoint",
///     &[("content-type", "application/json")],
///     &serde_json::json!({"key": "value"}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only transport
    /// failures produce `Err`.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

/// Production client backed by reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        Ok(HttpResponse {
            status,
            body: response.text().await?,
        })
    }
}
