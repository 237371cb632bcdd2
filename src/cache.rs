//! Token to profile cache with single-flight resolution
//!
//! Concurrent lookups for the same uncached token share one provider call.
//! The entry map and the in-flight markers live under one mutex, so the
//! check for an existing flight and the insertion of a new one are atomic.
//!
//! Each provider call runs in its own task, which publishes the outcome and
//! clears the in-flight marker even when every caller has gone away.
//! Successful profiles are cached until the token is invalidated, pruned as
//! expired, or pushed out by the optional size cap. Failures are handed to
//! every caller waiting on that flight and are never cached.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing;

use crate::error::ResolutionError;
use crate::profile::Profile;
use crate::provider::ProfileFetcher;
use crate::token::{fingerprint, TokenValidator};

type Outcome = Result<Arc<Profile>, ResolutionError>;

/// One outstanding provider call
struct Flight {
    outcome: watch::Receiver<Option<Outcome>>,
    /// Set by `invalidate`; the outcome still reaches waiters but is not cached
    revoked: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<Profile>>,
    /// Insertion order, oldest first, for the size cap
    order: VecDeque<String>,
    in_flight: HashMap<String, Flight>,
}

impl CacheState {
    fn remove_entry(&mut self, token: &str) -> bool {
        let removed = self.entries.remove(token).is_some();
        if removed {
            self.order.retain(|t| t != token);
        }
        removed
    }

    fn prune_expired(&mut self, validator: &TokenValidator) -> usize {
        let before = self.entries.len();
        self.entries.retain(|token, _| !validator.is_expired(token));
        let entries = &self.entries;
        self.order.retain(|t| entries.contains_key(t));
        before - self.entries.len()
    }

    fn store(&mut self, token: &str, profile: Arc<Profile>, max_entries: Option<usize>, validator: &TokenValidator) {
        if let Some(cap) = max_entries {
            if !self.entries.contains_key(token) && self.entries.len() >= cap {
                self.prune_expired(validator);
            }
            while !self.entries.contains_key(token) && self.entries.len() >= cap {
                let Some(oldest) = self.order.pop_front() else { break };
                self.entries.remove(&oldest);
                tracing::debug!("Evicted profile for token {} (cache full)", fingerprint(&oldest));
            }
        }

        if self.entries.insert(token.to_string(), profile).is_none() {
            self.order.push_back(token.to_string());
        }
    }
}

/// Shared profile cache; one instance per gateway process
pub struct ProfileCache {
    fetcher: Arc<dyn ProfileFetcher>,
    validator: TokenValidator,
    max_entries: Option<usize>,
    state: Arc<Mutex<CacheState>>,
}

impl ProfileCache {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self {
            fetcher,
            validator: TokenValidator::default(),
            max_entries: None,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Cap the number of cached profiles
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Validator used when pruning expired entries
    pub fn with_validator(mut self, validator: TokenValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Resolve `token` to a profile.
    ///
    /// Callers are expected to have rejected expired tokens already; a hit is
    /// returned without consulting the provider.
    pub async fn resolve(&self, token: &str) -> Outcome {
        let mut outcome = {
            let mut state = self.state.lock().await;
            if let Some(profile) = state.entries.get(token) {
                tracing::debug!("Profile cache hit for token {}", fingerprint(token));
                return Ok(profile.clone());
            }

            match state.in_flight.get(token) {
                Some(flight) => {
                    tracing::debug!("Joining in-flight resolution for token {}", fingerprint(token));
                    flight.outcome.clone()
                }
                None => {
                    tracing::debug!("Profile cache miss for token {}", fingerprint(token));
                    let (publish, outcome) = watch::channel(None);
                    state.in_flight.insert(
                        token.to_string(),
                        Flight {
                            outcome: outcome.clone(),
                            revoked: false,
                        },
                    );
                    self.lead(token, publish);
                    outcome
                }
            }
        };

        let published = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());
        match published {
            Ok(Some(outcome)) => outcome,
            _ => Err(ResolutionError::Network("profile resolution ended without a result".to_string())),
        }
    }

    /// Start the provider call for a new flight.
    ///
    /// The task owns everything it needs, so dropping the callers does not
    /// cancel it; the marker is always removed and the outcome always sent.
    fn lead(&self, token: &str, publish: watch::Sender<Option<Outcome>>) {
        let fetcher = self.fetcher.clone();
        let state = self.state.clone();
        let validator = self.validator;
        let max_entries = self.max_entries;
        let token = token.to_string();

        tokio::spawn(async move {
            let outcome = fetcher.fetch_profile(&token).await.map(Arc::new);

            let mut state = state.lock().await;
            let revoked = state.in_flight.remove(&token).is_some_and(|flight| flight.revoked);
            match &outcome {
                Ok(_) if revoked => {
                    tracing::debug!("Token {} was invalidated during resolution; not caching", fingerprint(&token));
                }
                Ok(profile) => {
                    state.store(&token, profile.clone(), max_entries, &validator);
                    tracing::info!("Cached profile {} for token {}", profile.subject_id, fingerprint(&token));
                }
                Err(err) => {
                    tracing::warn!(
                        "Profile resolution failed for token {} ({}): {}",
                        fingerprint(&token),
                        err.kind(),
                        err
                    );
                }
            }
            publish.send_replace(Some(outcome));
        });
    }

    /// Drop the cached profile for `token`.
    ///
    /// A resolution already running for it keeps serving its waiters, and
    /// late callers still join it, but its result is not cached. Returns true
    /// if a cached profile was removed.
    pub async fn invalidate(&self, token: &str) -> bool {
        let mut state = self.state.lock().await;
        if let Some(flight) = state.in_flight.get_mut(token) {
            flight.revoked = true;
        }
        let removed = state.remove_entry(token);
        if removed {
            tracing::info!("Invalidated cached profile for token {}", fingerprint(token));
        }
        removed
    }

    /// Remove entries whose token has expired, returning how many were dropped
    pub async fn prune_expired(&self) -> usize {
        let pruned = self.state.lock().await.prune_expired(&self.validator);
        if pruned > 0 {
            tracing::debug!("Pruned {} expired profiles", pruned);
        }
        pruned
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.state.lock().await.entries.contains_key(token)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
