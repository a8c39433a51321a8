//! Mock transport for testing
//!
//! Routes are registered per URL. Each route can answer with a status and
//! body, fail at the transport level, or wait before answering (to stage
//! overlapping loads). Unknown URLs answer 404.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::{FetchResponse, Fetcher};
use crate::error::{FetchError, Result};

#[derive(Debug, Clone)]
enum Outcome {
    Respond(FetchResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    outcome: Outcome,
    delay: Duration,
}

/// Scriptable [`Fetcher`]
///
/// Clones share routes and the request log, so a test can keep a handle
/// after giving the fetcher to the shell.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with status 200 and `body`
    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.set_route(url, Outcome::Respond(FetchResponse::ok(body)), Duration::ZERO);
        self
    }

    /// Answer `url` with the given status and body
    pub fn with_status(self, url: &str, status: u16, body: &str) -> Self {
        self.set_route(
            url,
            Outcome::Respond(FetchResponse {
                status,
                body: body.to_string(),
            }),
            Duration::ZERO,
        );
        self
    }

    /// Reject requests to `url` at the transport level
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.set_route(url, Outcome::Fail(message.to_string()), Duration::ZERO);
        self
    }

    /// Answer `url` with status 200 and `body` after `delay`
    pub fn with_delayed_page(self, url: &str, body: &str, delay: Duration) -> Self {
        self.set_route(url, Outcome::Respond(FetchResponse::ok(body)), delay);
        self
    }

    /// Replace the answer for `url` on an existing (possibly shared) fetcher
    pub fn set_page(&self, url: &str, body: &str) {
        self.set_route(url, Outcome::Respond(FetchResponse::ok(body)), Duration::ZERO);
    }

    /// Every URL requested so far, oldest first
    pub fn requests(&self) -> Vec<String> {
        self.lock_requests().clone()
    }

    /// How many times `url` was requested
    pub fn request_count(&self, url: &str) -> usize {
        self.lock_requests().iter().filter(|u| *u == url).count()
    }

    fn set_route(&self, url: &str, outcome: Outcome, delay: Duration) {
        self.routes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(url.to_string(), Route { outcome, delay });
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        self.lock_requests().push(url.to_string());

        let route = self
            .routes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(url)
            .cloned();

        let Some(route) = route else {
            return Ok(FetchResponse {
                status: 404,
                body: "Not Found".to_string(),
            });
        };

        if !route.delay.is_zero() {
            sleep(route.delay).await;
        }

        match route.outcome {
            Outcome::Respond(response) => Ok(response),
            Outcome::Fail(message) => Err(FetchError::Transport {
                url: url.to_string(),
                message,
            }
            .into()),
        }
    }
}
