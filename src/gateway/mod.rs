//! Per-request authorization decisions
//!
//! A request moves through `Start -> TokenExtracted -> ProfileResolved` and
//! ends in exactly one of [`Decision::Authorized`], [`Decision::Denied`] or
//! [`Decision::Errored`]:
//!
//! - no token, a malformed or expired token, or a failed signature check is
//!   denied before the cache is touched
//! - a failed profile resolution is an error, never a denial
//! - a resolved profile without the required role is denied
//!
//! With the `server` feature, [`RequireRole`] wraps this in a tower layer.

use std::sync::Arc;

use tracing;

use crate::cache::ProfileCache;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, ResolutionError, Result};
use crate::profile::Profile;
use crate::provider::IdentityProviderClient;
use crate::token::{fingerprint, SignatureVerifier, TokenValidator};

#[cfg(feature = "server")]
pub mod middleware;

#[cfg(feature = "server")]
pub use middleware::{RequireRole, RequireRoleMiddleware};

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    InvalidToken(String),
    MissingRole(String),
}

/// Terminal state of one authorization pass
#[derive(Debug, Clone)]
pub enum Decision {
    Authorized(Arc<Profile>),
    Denied(DenyReason),
    Errored(ResolutionError),
}

impl Decision {
    /// Convert into the gateway error taxonomy
    pub fn into_result(self) -> Result<Arc<Profile>> {
        match self {
            Decision::Authorized(profile) => Ok(profile),
            Decision::Denied(DenyReason::MissingToken) => {
                Err(GatewayError::InvalidToken("missing bearer token".to_string()))
            }
            Decision::Denied(DenyReason::InvalidToken(reason)) => Err(GatewayError::InvalidToken(reason)),
            Decision::Denied(DenyReason::MissingRole(role)) => Err(GatewayError::Unauthorized(denial_message(&role))),
            Decision::Errored(err) => Err(GatewayError::Resolution(err)),
        }
    }
}

/// Role name with its first letter capitalized, for user-facing messages
pub fn role_label(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stable denial text for a role, e.g. `admin` -> `Admin access denied.`
pub fn denial_message(role: &str) -> String {
    format!("{} access denied.", role_label(role))
}

/// Orchestrates token checks, profile resolution and role evaluation
#[derive(Clone)]
pub struct Gateway {
    cache: Arc<ProfileCache>,
    validator: TokenValidator,
    verifier: Option<SignatureVerifier>,
}

impl Gateway {
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self {
            cache,
            validator: TokenValidator::default(),
            verifier: None,
        }
    }

    pub fn with_validator(mut self, validator: TokenValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Build a gateway backed by the real identity provider client
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let client = IdentityProviderClient::from_config(&config.provider)?;
        let validator = TokenValidator::new(config.cache.leeway_secs);
        let cache = ProfileCache::new(Arc::new(client))
            .with_validator(validator)
            .with_max_entries(config.cache.max_entries);

        let mut gateway = Self::new(Arc::new(cache)).with_validator(validator);
        if let Some(secret) = &config.provider.client_secret {
            gateway = gateway.with_verifier(SignatureVerifier::hs256(secret, &config.provider.client_id));
        }
        Ok(gateway)
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    /// Decide whether the holder of `token` has `required_role`
    pub async fn authorize(&self, token: Option<&str>, required_role: &str) -> Decision {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!("Start -> Denied: no bearer token");
            return Decision::Denied(DenyReason::MissingToken);
        };

        if self.validator.is_expired(token) {
            tracing::debug!("Start -> Denied: token {} is expired or malformed", fingerprint(token));
            return Decision::Denied(DenyReason::InvalidToken("token is expired or malformed".to_string()));
        }
        if let Some(verifier) = &self.verifier {
            if let Err(err) = verifier.verify(token) {
                tracing::debug!("Start -> Denied: token {} {}", fingerprint(token), err);
                return Decision::Denied(DenyReason::InvalidToken("token signature is not valid".to_string()));
            }
        }
        tracing::debug!("Start -> TokenExtracted: {}", fingerprint(token));

        let profile = match self.cache.resolve(token).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::error!("TokenExtracted -> Errored: {} ({})", err, err.kind());
                return Decision::Errored(err);
            }
        };
        tracing::debug!("TokenExtracted -> ProfileResolved: {}", profile.subject_id);

        if profile.has_role(required_role) {
            tracing::info!("{} access granted to {}", required_role, profile.subject_id);
            Decision::Authorized(profile)
        } else {
            tracing::info!("{} access denied to {}", required_role, profile.subject_id);
            Decision::Denied(DenyReason::MissingRole(required_role.to_string()))
        }
    }

    /// Forget a token on logout or revocation
    pub async fn revoke(&self, token: &str) -> bool {
        self.cache.invalidate(token).await
    }
}
