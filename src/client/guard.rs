//! Navigation gate driven only by the local token store
//!
//! No network round-trip happens here. A protected view visited while logged
//! out records its path in the single redirect slot and sends the user to
//! the login view; the next authenticated visit replays that path once.

use tracing;

use super::storage::KeyValueStore;
use super::store::TokenStore;
use crate::error::Result;

pub const INDEX_PATH: &str = "/";
pub const HOME_PATH: &str = "/home";
pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_PATH: &str = "/admin";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome of entering a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

impl Navigation {
    fn redirect(path: &str) -> Self {
        Navigation::Redirect(path.to_string())
    }
}

pub struct RouteGuard<'a, S> {
    store: &'a TokenStore<S>,
}

impl<'a, S: KeyValueStore> RouteGuard<'a, S> {
    pub fn new(store: &'a TokenStore<S>) -> Self {
        Self { store }
    }

    /// Gate a view that needs a logged-in user
    pub fn require_auth(&self, path: &str) -> Result<Navigation> {
        if !self.store.logged_in() {
            tracing::debug!("Not logged in; remembering {} and sending to login", path);
            self.store.record_redirect(path)?;
            return Ok(Navigation::redirect(LOGIN_PATH));
        }

        match self.store.take_redirect()? {
            Some(target) if target != path => {
                tracing::debug!("Replaying post-login destination {}", target);
                Ok(Navigation::Redirect(target))
            }
            _ => Ok(Navigation::Proceed),
        }
    }

    /// Gate a view that needs a role in the stored profile
    pub fn require_role(&self, role: &str) -> Navigation {
        if self.store.has_role(role) {
            Navigation::Proceed
        } else {
            tracing::debug!("Stored profile lacks role {}", role);
            Navigation::redirect(UNAUTHORIZED_PATH)
        }
    }

    /// Apply the view table: index -> home, home needs login, admin needs the admin role
    pub fn enter(&self, path: &str) -> Result<Navigation> {
        match path {
            INDEX_PATH => Ok(Navigation::redirect(HOME_PATH)),
            HOME_PATH => self.require_auth(path),
            ADMIN_PATH => Ok(self.require_role("admin")),
            _ => Ok(Navigation::Proceed),
        }
    }
}
