//! Identity provider client
//!
//! Resolves a bearer token into a [`Profile`] with one GET to the provider's
//! token-introspection endpoint. Every call ends in a profile or a typed
//! [`ResolutionError`]; the whole exchange is bounded by a timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use tracing;

use crate::config::ProviderConfig;
use crate::error::{GatewayError, ResolutionError, Result};
use crate::profile::Profile;
use crate::token::fingerprint;

/// Boxed future returned by [`ProfileFetcher::fetch_profile`]
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Profile, ResolutionError>> + Send + 'a>>;

/// Anything that can turn a token into a profile.
///
/// Object-safe so the cache can hold `Arc<dyn ProfileFetcher>`.
pub trait ProfileFetcher: Send + Sync + 'static {
    fn fetch_profile<'a>(&'a self, token: &'a str) -> FetchFuture<'a>;
}

/// HTTP client for the provider's token-introspection endpoint
#[derive(Clone)]
pub struct IdentityProviderClient {
    http_client: Client,
    endpoint: String,
    token_param: String,
    timeout: Duration,
}

impl IdentityProviderClient {
    /// Create a client for `endpoint`, passing the token as the `token_param` query parameter
    pub fn new(endpoint: impl Into<String>, token_param: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            token_param: token_param.into(),
            timeout,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(
            config.introspection_url(),
            config.token_param.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the profile for `token`
    pub async fn fetch(&self, token: &str) -> std::result::Result<Profile, ResolutionError> {
        tracing::debug!("Requesting profile for token {} from {}", fingerprint(token), self.endpoint);

        match tokio::time::timeout(self.timeout, self.request(token)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("Identity provider did not answer within {:?}", self.timeout);
                Err(ResolutionError::Timeout)
            }
        }
    }

    async fn request(&self, token: &str) -> std::result::Result<Profile, ResolutionError> {
        let url = format!(
            "{}?{}={}",
            self.endpoint,
            urlencoding::encode(&self.token_param),
            urlencoding::encode(token)
        );

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Identity provider rejected introspection with status: {}", status);
            return Err(ResolutionError::UpstreamStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ResolutionError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        Profile::from_json(value)
    }
}

/// Map a transport failure to a resolution error, dropping the URL (it carries the token)
fn classify(err: reqwest::Error) -> ResolutionError {
    if err.is_timeout() {
        ResolutionError::Timeout
    } else {
        ResolutionError::Network(err.without_url().to_string())
    }
}

impl ProfileFetcher for IdentityProviderClient {
    fn fetch_profile<'a>(&'a self, token: &'a str) -> FetchFuture<'a> {
        Box::pin(self.fetch(token))
    }
}

impl std::fmt::Debug for IdentityProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProviderClient")
            .field("endpoint", &self.endpoint)
            .field("token_param", &self.token_param)
            .field("timeout", &self.timeout)
            .finish()
    }
}
