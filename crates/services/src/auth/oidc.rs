// OIDC client adapter
//
// Wraps the authorization-code + PKCE flow against one provider's endpoints:
// `begin_login` builds the authorization redirect, `complete_login` turns a
// callback into a normalized `Identity`. One instance per provider, injected
// explicitly; there is no process-wide registry of middleware instances.

use chrono::Utc;
use config::OidcProviderConfig;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::ports::{AuthError, Identity, PendingLogin, ProviderKey};
use super::session::random_token;

/// Accepted clock skew when checking ID token timestamps
const CLOCK_LEEWAY_SECS: i64 = 60;

/// Extra token-response field carrying the OIDC ID token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenFields {
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type OidcTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

// Type alias for a fully configured OAuth client
type ConfiguredClient = oauth2::Client<
    BasicErrorResponse,
    OidcTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Claims checked on the ID token returned by the token endpoint
#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `aud` is a single string or an array of strings depending on the provider
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// OIDC relying-party client for a single provider
pub struct OidcClient {
    provider: ProviderKey,
    issuer: String,
    client_id: String,
    userinfo_url: String,
    scopes: Vec<Scope>,
    client: ConfiguredClient,
    http_client: Client,
}

impl OidcClient {
    pub fn new(
        provider: ProviderKey,
        config: &OidcProviderConfig,
        http_client: Client,
    ) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| AuthError::ConfigError(format!("invalid {provider} auth URL: {e}")))?;

        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AuthError::ConfigError(format!("invalid {provider} token URL: {e}")))?;

        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| AuthError::ConfigError(format!("invalid {provider} redirect URL: {e}")))?;

        let client: ConfiguredClient =
            oauth2::Client::new(ClientId::new(config.client_id.clone()))
                .set_client_secret(ClientSecret::new(config.client_secret.clone()))
                .set_auth_uri(auth_url)
                .set_token_uri(token_url)
                .set_redirect_uri(redirect_url);

        // "openid" is always requested on top of the configured scopes
        let scopes = std::iter::once("openid".to_string())
            .chain(
                config
                    .scopes
                    .iter()
                    .filter(|scope| scope.as_str() != "openid")
                    .cloned(),
            )
            .map(Scope::new)
            .collect();

        Ok(Self {
            provider,
            issuer: config.issuer.clone(),
            client_id: config.client_id.clone(),
            userinfo_url: config.userinfo_url.clone(),
            scopes,
            client,
            http_client,
        })
    }

    pub fn provider(&self) -> ProviderKey {
        self.provider
    }

    /// Build the authorization redirect for a new login attempt
    ///
    /// The returned `PendingLogin` must be persisted before the user is sent
    /// to the provider; the flow fails if its `state` is absent on return.
    pub fn begin_login(&self) -> (Url, PendingLogin) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let nonce = random_token(16);

        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("nonce", nonce.as_str())
            .url();

        let pending = PendingLogin {
            state: csrf_state.secret().to_string(),
            nonce,
            pkce_verifier: pkce_verifier.secret().to_string(),
            provider: self.provider,
            created_at: Utc::now(),
        };

        debug!(provider = %self.provider, "authorization redirect prepared");
        (auth_url, pending)
    }

    /// Complete a login from the provider's callback
    ///
    /// Exchanges the authorization code, validates the ID token against the
    /// pending login's nonce, and merges the userinfo response into an
    /// `Identity`. Every failure short-circuits; no session state is touched
    /// here.
    pub async fn complete_login(
        &self,
        code: &str,
        state: &str,
        pending: &PendingLogin,
    ) -> Result<Identity, AuthError> {
        if state != pending.state {
            return Err(AuthError::StateMismatch);
        }

        debug!(provider = %self.provider, "exchanging authorization code");
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let id_token = token.extra_fields().id_token.as_deref().ok_or_else(|| {
            AuthError::TokenInvalid("token response carried no id_token".to_string())
        })?;
        let claims = self.validate_id_token(id_token, &pending.nonce)?;

        let profile = self.fetch_userinfo(token.access_token().secret()).await?;

        // The userinfo response must describe the ID token's subject
        if let Some(userinfo_sub) = profile.get("sub").and_then(|v| v.as_str()) {
            if userinfo_sub != claims.sub {
                return Err(AuthError::UserinfoFailed(
                    "userinfo subject does not match the ID token".to_string(),
                ));
            }
        }

        let identity = Identity {
            subject: claims.sub,
            display_name: profile
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or(claims.name),
            email: profile
                .get("email")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or(claims.email),
            raw_profile: profile,
            provider: self.provider,
        };

        info!(provider = %self.provider, subject = %identity.subject, "user authenticated");
        Ok(identity)
    }

    /// Check the ID token's claims against this client and the pending nonce
    fn validate_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
    ) -> Result<IdTokenClaims, AuthError> {
        let claims = decode_claims(id_token)?;

        if claims.iss != self.issuer {
            return Err(AuthError::TokenInvalid(format!(
                "issuer mismatch: {}",
                claims.iss
            )));
        }

        if !claims.aud.contains(&self.client_id) {
            return Err(AuthError::TokenInvalid(
                "audience does not include this client".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        if claims.exp < now - CLOCK_LEEWAY_SECS {
            return Err(AuthError::TokenInvalid("token expired".to_string()));
        }
        if claims.iat.is_some_and(|iat| iat > now + CLOCK_LEEWAY_SECS) {
            return Err(AuthError::TokenInvalid(
                "token issued in the future".to_string(),
            ));
        }

        match claims.nonce.as_deref() {
            Some(nonce) if nonce == expected_nonce => {}
            Some(_) => return Err(AuthError::TokenInvalid("nonce mismatch".to_string())),
            None => return Err(AuthError::TokenInvalid("missing nonce".to_string())),
        }

        Ok(claims)
    }

    /// Fetch the userinfo endpoint with the access token
    async fn fetch_userinfo(&self, access_token: &str) -> Result<serde_json::Value, AuthError> {
        debug!(provider = %self.provider, "fetching userinfo");

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| AuthError::UserinfoFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::UserinfoFailed(format!(
                "userinfo endpoint returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::UserinfoFailed(format!("failed to parse response: {e}")))
    }
}

/// Decode the claims segment of a compact JWT
///
/// The token arrives on the direct TLS response from the token endpoint, so
/// only the claims are inspected; no JWKS round trip.
fn decode_claims(id_token: &str) -> Result<IdTokenClaims, AuthError> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut parts = id_token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::TokenInvalid("malformed JWT".to_string()));
    };

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::TokenInvalid(format!("claims are not base64url: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::TokenInvalid(format!("claims are not valid JSON: {e}")))
}
