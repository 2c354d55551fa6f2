use std::{collections::HashMap, env, path::PathBuf};

use crate::ConfigError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            session: SessionConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the provider-scoped protected content trees
    pub content_dir: PathBuf,
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("SERVER_PORT", "3000", "must be a valid port number")?,
            content_dir: PathBuf::from(
                env::var("CONTENT_DIR").unwrap_or_else(|_| "content".to_string()),
            ),
        })
    }
}

/// Logging Configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Ok(level) = env::var("LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }

        Ok(Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            modules,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules: HashMap::new(),
        }
    }
}

/// Session cookie configuration
///
/// The TTL is deliberately short: the sample setup expires sessions after
/// tens of seconds so the expiry path is easy to exercise by hand.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC key for the session cookie (`COOKIE_ID`)
    pub cookie_secret: String,
    pub cookie_name: String,
    pub ttl_secs: u64,
}

impl SessionConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cookie_secret: required("COOKIE_ID")?,
            cookie_name: env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "sid".to_string()),
            ttl_secs: parse_var("SESSION_TTL_SECS", "30", "must be a number of seconds")?,
        })
    }
}

/// Authentication configuration: one entry per identity provider
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Externally reachable base URL used to build redirect URIs
    pub base_url: String,
    /// Timeout for token-exchange and userinfo calls to the provider
    pub http_timeout_secs: u64,
    pub providers: Vec<OidcProviderConfig>,
}

impl AuthConfig {
    /// Load from environment variables
    ///
    /// All three providers are required; a missing variable for any of them
    /// aborts startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("PROTOCOL_AND_DOMAIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let providers = vec![
            OidcProviderConfig::from_env("auth-gcp", "GCP", &base_url)?,
            OidcProviderConfig::from_env("auth-azure", "AZURE", &base_url)?,
            OidcProviderConfig::from_env("auth-yahoo", "YAHOO", &base_url)?,
        ];

        Ok(Self {
            base_url,
            http_timeout_secs: parse_var(
                "AUTH_HTTP_TIMEOUT_SECS",
                "10",
                "must be a number of seconds",
            )?,
            providers,
        })
    }
}

/// Per-provider OIDC configuration, immutable after process start
#[derive(Debug, Clone)]
pub struct OidcProviderConfig {
    /// Provider key, doubling as the route prefix (e.g. "auth-gcp")
    pub key: String,
    pub issuer: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Computed: `{base_url}/{key}/callback`
    pub redirect_uri: String,
    /// Requested scopes; the adapter always adds "openid" on top
    pub scopes: Vec<String>,
}

impl OidcProviderConfig {
    /// Load one provider from `{prefix}_*` environment variables
    pub fn from_env(key: &str, prefix: &str, base_url: &str) -> Result<Self, ConfigError> {
        let scopes = env::var(format!("{prefix}_SCOPE"))
            .unwrap_or_else(|_| "profile email".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            key: key.to_string(),
            issuer: required(&format!("{prefix}_ISSUER"))?,
            auth_url: required(&format!("{prefix}_AUTH_URL"))?,
            token_url: required(&format!("{prefix}_TOKEN_URL"))?,
            userinfo_url: required(&format!("{prefix}_USERINFO_URL"))?,
            client_id: required(&format!("{prefix}_CLIENT_ID"))?,
            client_secret: required(&format!("{prefix}_CLIENT_SECRET"))?,
            redirect_uri: format!("{}/{}/callback", base_url.trim_end_matches('/'), key),
            scopes,
        })
    }
}

/// Read a required variable; unset or empty both count as missing
fn required(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar {
            name: name.to_string(),
        }),
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    default: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            reason: reason.to_string(),
        })
}
