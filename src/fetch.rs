/// HTTP transport for upstream providers.
///
/// Provider adapters depend on the `Fetcher` trait rather than on reqwest
/// directly, so the aggregation logic can be driven by canned responses in
/// tests and by `OfflineFetcher` when the service runs without network.

use std::time::Duration;

use crate::model::ProviderError;

/// Fetches a URL and returns the response body of a 2xx answer.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// Blocking reqwest client with a per-call timeout. No retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coastmon_service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpError(response.status().as_u16()));
        }

        response.text().map_err(classify_reqwest_error)
    }
}

/// Maps a reqwest error onto the provider taxonomy. The URL is stripped
/// from the message since it may carry an API key.
fn classify_reqwest_error(err: reqwest::Error) -> ProviderError {
    let timed_out = err.is_timeout();
    let message = err.without_url().to_string();
    if timed_out {
        ProviderError::Timeout(message)
    } else {
        ProviderError::Transport(message)
    }
}

// ---------------------------------------------------------------------------
// Offline implementation
// ---------------------------------------------------------------------------

/// Fails every request as not configured. With this fetcher the service
/// serves default and simulated readings only.
pub struct OfflineFetcher;

impl Fetcher for OfflineFetcher {
    fn fetch(&self, _url: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(
            "offline mode: upstream requests are disabled".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------
