//! # rolegate - bearer-token role gateway
//!
//! Guards HTTP routes behind a role held in the caller's identity-provider
//! profile. Tokens are checked locally for expiry (and optionally signature)
//! before any network call; profiles are resolved once per token through a
//! single-flight cache.
//!
//! ## Features
//!
//! - `server`: axum middleware, extractors, and the HTTP router
//! - `client`: persisted token store, route guard, and API client

pub mod error;
pub use error::{GatewayError, ResolutionError, Result};

pub mod authz;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod profile;
pub mod provider;
pub mod token;

#[cfg(feature = "server")]
pub mod axum_integration;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use crate::authz::has_role;
pub use crate::cache::ProfileCache;
pub use crate::config::{load_config, GatewayConfig, ProviderConfig, RouteRule};
pub use crate::gateway::{Decision, DenyReason, Gateway};
pub use crate::profile::Profile;
pub use crate::provider::{IdentityProviderClient, ProfileFetcher};
pub use crate::token::{SignatureVerifier, TokenValidator};

#[cfg(feature = "server")]
pub use crate::axum_integration::CurrentProfile;

#[cfg(feature = "server")]
pub use crate::gateway::RequireRole;
