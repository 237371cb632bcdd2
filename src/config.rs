//! Configuration loading for the gateway
//!
//! Settings come from a TOML file or from `ROLEGATE_*` environment variables.
//! Provider credentials are checked once at startup; a missing client id or
//! domain is a [`GatewayError::Config`] and never a per-request condition.
//!
//! # Example
//!
//! ```rust,ignore
//! use rolegate::config::GatewayConfig;
//!
//! let config = GatewayConfig::load("rolegate.toml")?;
//! config.validate()?;
//! ```

use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";
pub const PUBLIC_PATH: &str = "/api/public";
pub const DEFAULT_PROTECTED_PATH: &str = "/api/private";
pub const DEFAULT_REQUIRED_ROLE: &str = "admin";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Identity provider section
    pub provider: ProviderConfig,

    /// HTTP server section
    #[serde(default)]
    pub server: ServerConfig,

    /// Profile cache section
    #[serde(default)]
    pub cache: CacheConfig,

    /// Protected routes and the role each one requires
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,
}

/// Identity provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Client identifier registered with the provider
    #[serde(default)]
    pub client_id: String,

    /// Provider domain, e.g. `tenant.eu.auth0.com`
    #[serde(default)]
    pub domain: String,

    /// Shared secret; when set, token signatures and audience are verified locally
    #[serde(default)]
    pub client_secret: Option<String>,

    /// URL scheme used to reach the provider
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Token-introspection path on the provider domain
    #[serde(default = "default_introspection_path")]
    pub introspection_path: String,

    /// Query parameter carrying the token
    #[serde(default = "default_token_param")]
    pub token_param: String,

    /// Upper bound on one introspection call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ProviderConfig {
    pub fn new(client_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            domain: domain.into(),
            client_secret: None,
            scheme: default_scheme(),
            introspection_path: default_introspection_path(),
            token_param: default_token_param(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Full introspection endpoint URL
    pub fn introspection_url(&self) -> String {
        let path = self.introspection_path.trim_start_matches('/');
        format!("{}://{}/{}", self.scheme, self.domain.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Size cap on cached profiles (unbounded when absent)
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Clock-skew allowance when checking token expiry
    #[serde(default)]
    pub leeway_secs: u64,

    /// How often the server drops profiles whose token has expired
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            leeway_secs: 0,
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

/// A protected path and the role it requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub path: String,
    #[serde(default = "default_role")]
    pub required_role: String,
}

fn default_prune_interval_secs() -> u64 {
    60
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_introspection_path() -> String {
    "/tokeninfo".to_string()
}

fn default_token_param() -> String {
    "id_token".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_role() -> String {
    DEFAULT_REQUIRED_ROLE.to_string()
}

fn default_routes() -> Vec<RouteRule> {
    vec![RouteRule {
        path: DEFAULT_PROTECTED_PATH.to_string(),
        required_role: default_role(),
    }]
}

impl GatewayConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            routes: default_routes(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Build configuration from environment variables.
    ///
    /// # Required env vars
    /// - `ROLEGATE_CLIENT_ID`
    /// - `ROLEGATE_DOMAIN`
    ///
    /// # Optional env vars
    /// - `ROLEGATE_CLIENT_SECRET`: enables local signature verification
    /// - `ROLEGATE_REQUIRED_ROLE`: role for `/api/private` (default `admin`)
    /// - `ROLEGATE_BIND`: listen address (default `0.0.0.0:3001`)
    /// - `ROLEGATE_TIMEOUT_MS`: provider call timeout
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_id = lookup("ROLEGATE_CLIENT_ID")
            .ok_or_else(|| GatewayError::Config("ROLEGATE_CLIENT_ID is required".to_string()))?;
        let domain = lookup("ROLEGATE_DOMAIN")
            .ok_or_else(|| GatewayError::Config("ROLEGATE_DOMAIN is required".to_string()))?;

        let mut provider = ProviderConfig::new(client_id, domain);
        provider.client_secret = lookup("ROLEGATE_CLIENT_SECRET").filter(|s| !s.is_empty());
        if let Some(ms) = lookup("ROLEGATE_TIMEOUT_MS") {
            provider.timeout_ms = ms
                .parse()
                .map_err(|e| GatewayError::Config(format!("ROLEGATE_TIMEOUT_MS: {}", e)))?;
        }

        let mut config = Self::new(provider);
        if let Some(role) = lookup("ROLEGATE_REQUIRED_ROLE") {
            config.routes = vec![RouteRule {
                path: DEFAULT_PROTECTED_PATH.to_string(),
                required_role: role,
            }];
        }
        if let Some(bind) = lookup("ROLEGATE_BIND") {
            config.server.bind = bind;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gateway cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.provider.client_id.trim().is_empty() {
            return Err(GatewayError::Config("provider.client_id is required".to_string()));
        }
        if self.provider.domain.trim().is_empty() {
            return Err(GatewayError::Config("provider.domain is required".to_string()));
        }
        if self.provider.timeout_ms == 0 {
            return Err(GatewayError::Config("provider.timeout_ms must be positive".to_string()));
        }
        if self.cache.max_entries == Some(0) {
            return Err(GatewayError::Config("cache.max_entries must be positive".to_string()));
        }
        if self.cache.prune_interval_secs == 0 {
            return Err(GatewayError::Config("cache.prune_interval_secs must be positive".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for rule in &self.routes {
            if !rule.path.starts_with('/') {
                return Err(GatewayError::Config(format!("route path must start with '/': {}", rule.path)));
            }
            if rule.required_role.trim().is_empty() {
                return Err(GatewayError::Config(format!("route {} has an empty required_role", rule.path)));
            }
            if rule.path == PUBLIC_PATH {
                return Err(GatewayError::Config(format!("{} is always public", PUBLIC_PATH)));
            }
            if !seen.insert(rule.path.as_str()) {
                return Err(GatewayError::Config(format!("route {} is listed twice", rule.path)));
            }
        }
        Ok(())
    }
}

/// Load configuration from a TOML file and validate it
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

    let config: GatewayConfig = toml::from_str(&content)
        .map_err(|e| GatewayError::Config(format!("Failed to parse TOML config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_minimal_config() {
        let toml_str = r#"
[provider]
client_id = "vOnLrGLl"
domain = "tenant.au.auth0.com"
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        assert_eq!(config.provider.introspection_url(), "https://tenant.au.auth0.com/tokeninfo");
        assert_eq!(config.provider.token_param, "id_token");
        assert_eq!(config.provider.timeout_ms, 5_000);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.routes, default_routes());
        assert!(config.cache.max_entries.is_none());
        assert_eq!(config.cache.prune_interval_secs, 60);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[provider]
client_id = "vOnLrGLl"
domain = "127.0.0.1:9000/"
client_secret = "shh"
scheme = "http"
introspection_path = "introspect"
token_param = "token"
timeout_ms = 250

[server]
bind = "127.0.0.1:8080"

[cache]
max_entries = 1000
leeway_secs = 30

[[routes]]
path = "/api/private"
required_role = "admin"

[[routes]]
path = "/api/reports"
required_role = "analyst"
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        assert_eq!(config.provider.introspection_url(), "http://127.0.0.1:9000/introspect");
        assert_eq!(config.provider.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.cache.max_entries, Some(1000));
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].required_role, "analyst");
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let toml_str = r#"
[provider]
domain = "tenant.au.auth0.com"
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));

        let config = GatewayConfig::new(ProviderConfig::new("client", "  "));
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_route_and_cache_settings() {
        let mut config = GatewayConfig::new(ProviderConfig::new("client", "tenant"));
        config.routes.push(RouteRule {
            path: "api/x".to_string(),
            required_role: "admin".to_string(),
        });
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::new(ProviderConfig::new("client", "tenant"));
        config.cache.max_entries = Some(0);
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::new(ProviderConfig::new("client", "tenant"));
        config.cache.prune_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_and_public_routes() {
        let mut config = GatewayConfig::new(ProviderConfig::new("client", "tenant"));
        config.routes.push(RouteRule {
            path: DEFAULT_PROTECTED_PATH.to_string(),
            required_role: "editor".to_string(),
        });
        assert!(matches!(config.validate(), Err(GatewayError::Config(ref msg)) if msg.contains("twice")));

        let mut config = GatewayConfig::new(ProviderConfig::new("client", "tenant"));
        config.routes = vec![RouteRule {
            path: PUBLIC_PATH.to_string(),
            required_role: "admin".to_string(),
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ROLEGATE_CLIENT_ID", "client"),
            ("ROLEGATE_DOMAIN", "tenant.auth0.com"),
            ("ROLEGATE_CLIENT_SECRET", ""),
            ("ROLEGATE_REQUIRED_ROLE", "editor"),
            ("ROLEGATE_TIMEOUT_MS", "750"),
        ]
        .into_iter()
        .collect();

        let config = GatewayConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.provider.client_id, "client");
        assert!(config.provider.client_secret.is_none());
        assert_eq!(config.provider.timeout_ms, 750);
        assert_eq!(config.routes[0].required_role, "editor");
    }

    #[test]
    fn test_from_env_lookup_missing_client_id() {
        let err = GatewayConfig::from_lookup(|k| (k == "ROLEGATE_DOMAIN").then(|| "tenant".to_string())).unwrap_err();
        assert!(err.to_string().contains("ROLEGATE_CLIENT_ID"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolegate.toml");
        std::fs::write(&path, "[provider]\nclient_id = \"c\"\ndomain = \"d\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.domain, "d");
        assert!(load_config(dir.path().join("missing.toml")).is_err());
    }
}
