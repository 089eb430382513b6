use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE};
use thiserror::Error;

use crate::network::HTTP_CLIENT;

/// Per-request options of a post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostOptions {
    /// The request fails with `TransportError::Timeout` after this duration.
    pub timeout: Duration,

    /// Accept compressed responses.
    pub compress: bool,
}

/// Possible errors when posting to the ranking service.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No response within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// Wrong endpoint, or maybe not available right now.
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    /// The service answered, but not with a success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err)
        }
    }
}

/// Posts request bodies to the ranking service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a body, and return the response body.
    async fn post(&self, body: Vec<u8>, options: PostOptions) -> Result<Vec<u8>, TransportError>;
}

/// A `Transport` that sends HTTP POST requests.
pub struct HttpTransport {
    url: String,
}

impl HttpTransport {
    pub fn new(url: &str) -> Self {
        HttpTransport {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: Vec<u8>, options: PostOptions) -> Result<Vec<u8>, TransportError> {
        let mut request = HTTP_CLIENT
            .post(&self.url)
            .timeout(options.timeout)
            .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
            .body(body);
        if !options.compress {
            request = request.header(ACCEPT_ENCODING, "identity");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
