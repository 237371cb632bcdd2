//! Client-side holder for the current token and cached profile

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing;

use super::storage::KeyValueStore;
use crate::error::Result;
use crate::profile::Profile;
use crate::token::TokenValidator;

pub const TOKEN_KEY: &str = "id_token";
pub const PROFILE_KEY: &str = "profile";
pub const REDIRECT_KEY: &str = "redirect_after_login";

const UPDATE_CAPACITY: usize = 16;

/// Persisted credential holder.
///
/// Profile updates are published on a broadcast channel after the write has
/// completed; each subscriber sees each update at most once.
pub struct TokenStore<S> {
    storage: S,
    validator: TokenValidator,
    updates: broadcast::Sender<Arc<Profile>>,
}

impl<S: KeyValueStore> TokenStore<S> {
    pub fn new(storage: S) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            storage,
            validator: TokenValidator::default(),
            updates,
        }
    }

    pub fn with_validator(mut self, validator: TokenValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn get(&self) -> Result<Option<String>> {
        self.storage.get(TOKEN_KEY)
    }

    pub fn set(&self, token: &str) -> Result<()> {
        self.storage.set(TOKEN_KEY, token)
    }

    /// Forget the token and the profile
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(PROFILE_KEY)
    }

    /// Stored profile, or an empty one when nothing is stored
    pub fn get_profile(&self) -> Result<Profile> {
        match self.storage.get(PROFILE_KEY)? {
            Some(raw) => Ok(Profile::from_attributes(serde_json::from_str(&raw)?)),
            None => Ok(Profile::default()),
        }
    }

    pub fn set_profile(&self, profile: Profile) -> Result<()> {
        let raw = serde_json::to_string(&profile.raw_attributes)?;
        self.storage.set(PROFILE_KEY, &raw)?;

        let delivered = self.updates.send(Arc::new(profile)).unwrap_or(0);
        tracing::debug!("Profile stored; notified {} subscribers", delivered);
        Ok(())
    }

    /// Receive every profile stored from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Profile>> {
        self.updates.subscribe()
    }

    /// A token is stored and it has not expired. Storage failures count as logged out.
    pub fn logged_in(&self) -> bool {
        match self.get() {
            Ok(Some(token)) => !self.validator.is_expired(&token),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!("Could not read stored token: {}", err);
                false
            }
        }
    }

    /// Stored profile holds `role`. Unreadable profiles hold nothing.
    pub fn has_role(&self, role: &str) -> bool {
        self.get_profile().map(|p| p.has_role(role)).unwrap_or(false)
    }

    /// Remember where to go after login, replacing any earlier target
    pub fn record_redirect(&self, path: &str) -> Result<()> {
        self.storage.set(REDIRECT_KEY, path)
    }

    /// Take the post-login target, clearing it
    pub fn take_redirect(&self) -> Result<Option<String>> {
        let target = self.storage.get(REDIRECT_KEY)?;
        if target.is_some() {
            self.storage.remove(REDIRECT_KEY)?;
        }
        Ok(target)
    }
}
