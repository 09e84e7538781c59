use std::time::Duration;

use async_trait::async_trait;

/// A JSON document to POST.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPost {
    pub url: url::Url,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("http error: {0}")]
    Other(String),
}

/// Outbound HTTP used by notification sinks.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Returns the response status; the body is not read.
    async fn post_json(&self, post: JsonPost, timeout: Duration) -> Result<u16, HttpError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("deploystep-exec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Other(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(&self, post: JsonPost, timeout: Duration) -> Result<u16, HttpError> {
        let resp = self
            .client
            .post(post.url)
            .timeout(timeout)
            .json(&post.body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout
                } else if e.is_connect() || e.is_request() {
                    HttpError::Network(e.to_string())
                } else {
                    HttpError::Other(e.to_string())
                }
            })?;
        Ok(resp.status().as_u16())
    }
}
