// Provider registry
//
// Built once at startup from configuration and read-only afterwards. Every
// provider shares one HTTP client so the token-exchange and userinfo calls
// all carry the same timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use config::AuthConfig;
use reqwest::Client;
use tracing::info;

use super::oidc::OidcClient;
use super::ports::{AuthError, ProviderKey};

pub struct ProviderRegistry {
    clients: HashMap<ProviderKey, Arc<OidcClient>>,
}

impl ProviderRegistry {
    /// Build one OIDC client per configured provider
    pub fn from_config(auth: &AuthConfig) -> Result<Self, AuthError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(auth.http_timeout_secs))
            // The token endpoint must answer directly, not via redirects
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        let mut clients = HashMap::new();
        for provider_config in &auth.providers {
            let key = ProviderKey::from_key(&provider_config.key).ok_or_else(|| {
                AuthError::ConfigError(format!("unknown provider key: {}", provider_config.key))
            })?;

            let client = OidcClient::new(key, provider_config, http_client.clone())?;
            info!(provider = %key, "OIDC provider configured");
            clients.insert(key, Arc::new(client));
        }

        Ok(Self { clients })
    }

    pub fn get(&self, key: ProviderKey) -> Option<Arc<OidcClient>> {
        self.clients.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
