//! JSON-over-HTTP transport
//!
//! `reqwest` runs on top of `fetch` when compiled to wasm32, so the same
//! client serves the browser and native tools.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} was not JSON: {message}")]
    Body { url: String, message: String },
}

#[async_trait(?Send)]
pub trait HttpClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestHttpClient { client }
    }
}

#[async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, HttpError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| HttpError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| HttpError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
