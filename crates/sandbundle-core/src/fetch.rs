//! Network fetch primitive for CDN modules.

use futures::future::BoxFuture;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::engine;

/// A completed HTTP response, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level fetch failure (no response was received).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("engine is not initialized, no HTTP client available for {url}")]
    NotInitialized { url: String },

    #[error("{0}")]
    Other(String),
}

/// Issues GET requests. Implementations must be safe to call concurrently.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}

/// `reqwest`-backed fetcher.
///
/// Without an explicit client it borrows the engine's shared client at
/// request time.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Option<Client>,
}

impl HttpFetcher {
    /// Fetcher that uses the engine's shared client.
    #[must_use]
    pub fn shared() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http: Some(http) }
    }
}

impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        Box::pin(async move {
            let http = match &self.http {
                Some(client) => client.clone(),
                None => engine::http_client().ok_or_else(|| FetchError::NotInitialized {
                    url: url.to_string(),
                })?,
            };

            let request_error = |source| FetchError::Request {
                url: url.to_string(),
                source,
            };

            let response = http.get(url.as_str()).send().await.map_err(request_error)?;
            let status = response.status().as_u16();
            let final_url = response.url().clone();
            let body = response.text().await.map_err(request_error)?;

            tracing::debug!(url = %url, final_url = %final_url, status, bytes = body.len(), "fetched");
            Ok(FetchResponse {
                status,
                url: final_url,
                body,
            })
        })
    }
}
