//! Authenticated JSON calls from the client to the gateway

use reqwest::Client;
use serde_json::Value;
use tracing;

use super::storage::KeyValueStore;
use super::store::TokenStore;
use crate::error::{GatewayError, Result};

/// HTTP client that attaches the stored bearer token while logged in
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET `path` and decode the JSON body. Non-2xx responses are errors.
    pub async fn fetch<S: KeyValueStore>(&self, store: &TokenStore<S>, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");

        if store.logged_in() {
            if let Some(token) = store.get()? {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Request to {} denied with status {}", url, status);
            return Err(GatewayError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}
