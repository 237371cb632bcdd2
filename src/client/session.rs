//! Login and logout on the client side

use std::sync::Arc;

use tracing;

use super::guard::{RouteGuard, HOME_PATH};
use super::storage::KeyValueStore;
use super::store::TokenStore;
use crate::error::{GatewayError, ResolutionError, Result};
use crate::provider::ProfileFetcher;
use crate::token::fingerprint;

/// Where to go after a login, and whether the profile could be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub destination: String,
    pub profile_error: Option<ResolutionError>,
}

/// Client session: token store plus the provider used to load profiles
pub struct Session<S> {
    store: TokenStore<S>,
    fetcher: Arc<dyn ProfileFetcher>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(store: TokenStore<S>, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    pub fn guard(&self) -> RouteGuard<'_, S> {
        RouteGuard::new(&self.store)
    }

    /// Store a freshly issued token, load its profile, and pick the next view.
    ///
    /// The recorded pre-login path is consumed here, so it is replayed once.
    /// A profile that fails to load leaves the user logged in with an empty
    /// profile; the failure is returned in the outcome.
    pub async fn complete_login(&self, token: &str) -> Result<LoginOutcome> {
        if token.is_empty() {
            return Err(GatewayError::InvalidToken("empty token from provider".to_string()));
        }
        self.store.set(token)?;
        tracing::info!("Stored token {}", fingerprint(token));

        let profile_error = match self.fetcher.fetch_profile(token).await {
            Ok(profile) => {
                self.store.set_profile(profile)?;
                None
            }
            Err(err) => {
                tracing::warn!("Error loading the profile: {}", err);
                Some(err)
            }
        };

        let destination = self
            .store
            .take_redirect()?
            .unwrap_or_else(|| HOME_PATH.to_string());

        Ok(LoginOutcome {
            destination,
            profile_error,
        })
    }

    pub fn logout(&self) -> Result<()> {
        tracing::info!("Logging out");
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::guard::{Navigation, LOGIN_PATH};
    use crate::client::storage::MemoryStore;
    use crate::test_support::CountingFetcher;
    use crate::token::validator::tests::fresh_token;

    #[tokio::test]
    async fn test_login_replays_recorded_path_once() {
        let token = fresh_token("u1");
        let fetcher = CountingFetcher::new().with_roles(&token, &["admin"]).shared();
        let session = Session::new(TokenStore::new(MemoryStore::new()), fetcher);

        assert_eq!(session.guard().require_auth("/reports").unwrap(), Navigation::Redirect(LOGIN_PATH.to_string()));

        let outcome = session.complete_login(&token).await.unwrap();
        assert_eq!(outcome.destination, "/reports");
        assert_eq!(outcome.profile_error, None);
        assert!(session.store().has_role("admin"));

        assert_eq!(session.store().take_redirect().unwrap(), None);
        assert_eq!(session.guard().require_auth("/reports").unwrap(), Navigation::Proceed);
    }

    #[tokio::test]
    async fn test_login_without_recorded_path_goes_home() {
        let token = fresh_token("u1");
        let fetcher = CountingFetcher::new().with_roles(&token, &["user"]).shared();
        let session = Session::new(TokenStore::new(MemoryStore::new()), fetcher);

        let outcome = session.complete_login(&token).await.unwrap();
        assert_eq!(outcome.destination, HOME_PATH);
    }

    #[tokio::test]
    async fn test_login_publishes_profile_update() {
        let token = fresh_token("u1");
        let fetcher = CountingFetcher::new().with_roles(&token, &["admin"]).shared();
        let session = Session::new(TokenStore::new(MemoryStore::new()), fetcher);
        let mut updates = session.store().subscribe();

        session.complete_login(&token).await.unwrap();
        assert!(updates.recv().await.unwrap().has_role("admin"));
    }

    #[tokio::test]
    async fn test_profile_failure_reported_but_logged_in() {
        let token = fresh_token("u1");
        let fetcher = CountingFetcher::new()
            .with_error(&token, ResolutionError::Timeout)
            .shared();
        let session = Session::new(TokenStore::new(MemoryStore::new()), fetcher);

        let outcome = session.complete_login(&token).await.unwrap();
        assert_eq!(outcome.profile_error, Some(ResolutionError::Timeout));
        assert!(session.store().logged_in());
        assert!(session.store().get_profile().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_credentials() {
        let token = fresh_token("u1");
        let fetcher = CountingFetcher::new().with_roles(&token, &["admin"]).shared();
        let session = Session::new(TokenStore::new(MemoryStore::new()), fetcher);

        session.complete_login(&token).await.unwrap();
        session.logout().unwrap();

        assert!(!session.store().logged_in());
        assert!(!session.store().has_role("admin"));
    }
}
