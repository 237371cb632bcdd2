//! Error types for gateway operations

/// Failure to resolve a token into a profile at the identity provider.
///
/// Cloneable so that a single upstream outcome can be handed to every caller
/// waiting on the same in-flight resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Identity provider unreachable: {0}")]
    Network(String),

    #[error("Identity provider returned status {0}")]
    UpstreamStatus(u16),

    #[error("Malformed identity provider response: {0}")]
    MalformedResponse(String),

    #[error("Identity provider timed out")]
    Timeout,
}

impl ResolutionError {
    /// Short failure class for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::Network(_) => "network",
            ResolutionError::UpstreamStatus(_) => "upstream_status",
            ResolutionError::MalformedResponse(_) => "malformed_response",
            ResolutionError::Timeout => "timeout",
        }
    }
}

/// Gateway-wide error type
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Request failed with status {0}")]
    Status(u16),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(feature = "server")]
impl GatewayError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            GatewayError::InvalidToken(_) | GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Resolution(ResolutionError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Resolution(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
