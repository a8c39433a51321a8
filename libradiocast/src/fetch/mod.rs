//! Network transport
//!
//! Both suspension points of the shell (the fragment fetch and the feed
//! fetch) go through the [`Fetcher`] trait, so tests can script transport
//! outcomes with [`mock::MockFetcher`].

use async_trait::async_trait;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{FetchError, Result};

// Mock fetcher is available for all builds (not just tests) to support integration tests
pub mod mock;

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Asynchronous GET transport
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a GET request and read the whole body as text
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` when the request cannot be completed.
    /// A non-success status is NOT an error at this level.
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}

/// GET `url` and return the body, treating a non-success status as failure
pub async fn fetch_text(fetcher: &dyn Fetcher, url: &str) -> Result<String> {
    let response = fetcher.get(url).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        }
        .into());
    }
    Ok(response.body)
}

/// [`Fetcher`] backed by a shared `reqwest` client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| FetchError::Transport {
            url: String::new(),
            message: format!("HTTP client init failed: {}", e),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        tracing::debug!(url, "GET");
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        tracing::debug!(url, status, bytes = body.len(), "Response received");

        Ok(FetchResponse { status, body })
    }
}
