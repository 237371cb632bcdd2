//! Bearer token checks that never leave the process
//!
//! - [`is_expired`] decodes the embedded `exp` claim and fails closed
//! - [`SignatureVerifier`] optionally proves a token was issued for this client

pub mod signature;
pub mod validator;

pub use signature::SignatureVerifier;
pub use validator::{expiration, fingerprint, is_expired, is_expired_at, TokenValidator};
