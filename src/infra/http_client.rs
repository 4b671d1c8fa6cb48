use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::app::ports::TransportPort;
use crate::error::TransportError;
use crate::request::{HttpMethod, WireRequest};

/// Production transport: one POST per call over a shared `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("moodle-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    // reqwest errors render the request URL, which carries the token
    fn classify(&self, err: reqwest::Error) -> TransportError {
        let err = err.without_url();
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn execute(&self, request: &WireRequest) -> Result<Value, TransportError> {
        if request.method != HttpMethod::Post {
            return Err(TransportError::UnsupportedMethod(request.method.to_string()));
        }

        debug!("HTTP POST request to: {}", request.redacted_url());
        let resp = self
            .client
            .post(&request.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;
        debug!("HTTP response: status={}, size={} bytes", status.as_u16(), body.len());

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
