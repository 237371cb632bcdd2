//! Optional shared-secret signature check for bearer tokens

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// HS256 signature and audience verifier keyed by the provider client secret.
///
/// Expiry is left to [`TokenValidator`](super::TokenValidator); this only
/// proves the token was minted for this client.
#[derive(Clone)]
pub struct SignatureVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SignatureVerifier {
    pub fn hs256(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<()> {
        decode::<Value>(token, &self.key, &self.validation)
            .map(|_| ())
            .map_err(|e| GatewayError::InvalidToken(format!("signature check failed: {}", e)))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::validator::now_unix;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn signed(secret: &str, claims: Value) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_accepts_matching_secret_and_audience() {
        let verifier = SignatureVerifier::hs256("s3cret", "client-abc");
        let token = signed("s3cret", json!({ "sub": "u1", "aud": "client-abc", "exp": now_unix() + 60 }));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let verifier = SignatureVerifier::hs256("s3cret", "client-abc");
        let token = signed("other", json!({ "sub": "u1", "aud": "client-abc", "exp": now_unix() + 60 }));
        assert!(matches!(verifier.verify(&token), Err(GatewayError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_wrong_audience() {
        let verifier = SignatureVerifier::hs256("s3cret", "client-abc");
        let token = signed("s3cret", json!({ "sub": "u1", "aud": "someone-else", "exp": now_unix() + 60 }));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        let verifier = SignatureVerifier::hs256("s3cret", "client-abc");
        assert!(verifier.verify("garbage").is_err());
    }
}
