//! Shared fakes for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::ResolutionError;
use crate::profile::Profile;
use crate::provider::{FetchFuture, ProfileFetcher};

/// Fake provider that counts calls and answers from a fixed table
pub(crate) struct CountingFetcher {
    calls: AtomicUsize,
    delay: Duration,
    answers: HashMap<String, Result<Value, ResolutionError>>,
    fallback: Result<Value, ResolutionError>,
}

impl CountingFetcher {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            answers: HashMap::new(),
            fallback: Err(ResolutionError::UpstreamStatus(401)),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `token` with a profile holding `roles`
    pub(crate) fn with_roles(mut self, token: &str, roles: &[&str]) -> Self {
        let body = json!({
            "user_id": format!("auth0|{}", roles.join("-")),
            "app_metadata": { "roles": roles },
        });
        self.answers.insert(token.to_string(), Ok(body));
        self
    }

    pub(crate) fn with_body(mut self, token: &str, body: Value) -> Self {
        self.answers.insert(token.to_string(), Ok(body));
        self
    }

    pub(crate) fn with_error(mut self, token: &str, err: ResolutionError) -> Self {
        self.answers.insert(token.to_string(), Err(err));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl ProfileFetcher for CountingFetcher {
    fn fetch_profile<'a>(&'a self, token: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let answer = self.answers.get(token).unwrap_or(&self.fallback).clone();
            Profile::from_json(answer?)
        })
    }
}

/// Serve `router` on an ephemeral localhost port
#[cfg(feature = "server")]
pub(crate) async fn spawn_stub(router: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
