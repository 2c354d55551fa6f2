#![allow(dead_code)]

use std::sync::Arc;

use api::{build_app, AppState};
use config::{AuthConfig, OidcProviderConfig, SessionConfig};
use httpmock::prelude::*;
use serde_json::json;
use services::auth::{MemorySessionStore, PendingLoginStore, ProviderRegistry, SessionStore};

pub const PROVIDERS: [&str; 3] = ["auth-gcp", "auth-azure", "auth-yahoo"];

pub struct TestApp {
    pub server: axum_test::TestServer,
    // Held so the protected content trees outlive the test
    _content_dir: tempfile::TempDir,
}

/// Helper function to create one provider's test configuration
pub fn provider_config(key: &str, idp_base: &str) -> OidcProviderConfig {
    OidcProviderConfig {
        key: key.to_string(),
        issuer: idp_base.to_string(),
        auth_url: format!("{idp_base}/authorize"),
        token_url: format!("{idp_base}/token"),
        userinfo_url: format!("{idp_base}/userinfo"),
        client_id: format!("client-{key}"),
        client_secret: "test-secret".to_string(),
        redirect_uri: format!("http://localhost:3000/{key}/callback"),
        scopes: vec!["profile".to_string(), "email".to_string()],
    }
}

/// Setup a complete test server with all three providers pointed at the
/// given mock identity provider
pub async fn setup_test_server(idp_base: &str, ttl_secs: u64) -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let auth = AuthConfig {
        base_url: "http://localhost:3000".to_string(),
        http_timeout_secs: 5,
        providers: PROVIDERS
            .iter()
            .map(|key| provider_config(key, idp_base))
            .collect(),
    };
    let session = SessionConfig {
        cookie_secret: "test-cookie-secret".to_string(),
        cookie_name: "sid".to_string(),
        ttl_secs,
    };

    let content_dir = tempfile::tempdir().unwrap();
    for key in PROVIDERS {
        let dir = content_dir.path().join(key);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("index.html"),
            format!("protected content for {key}"),
        )
        .unwrap();
    }

    let registry = Arc::new(ProviderRegistry::from_config(&auth).unwrap());
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(ttl_secs));
    // Pending logins get their own generous window so tests can exercise
    // session expiry without killing the login flow itself
    let pending = Arc::new(PendingLoginStore::new(300));

    let state = AppState {
        registry,
        pending,
        sessions,
        session,
    };

    let app = build_app(state, content_dir.path());
    TestApp {
        server: axum_test::TestServer::new(app).unwrap(),
        _content_dir: content_dir,
    }
}

/// Build a compact JWT with the given claims; only the claims are inspected
/// by the relying party
pub fn make_id_token(issuer: &str, audience: &str, nonce: &str, sub: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "iss": issuer,
            "sub": sub,
            "aud": audience,
            "exp": chrono::Utc::now().timestamp() + 3600,
            "iat": chrono::Utc::now().timestamp(),
            "nonce": nonce,
        })
        .to_string(),
    );
    format!("{header}.{payload}.sig")
}

/// Query parameters of a redirect target
pub fn location_params(location: &str) -> std::collections::HashMap<String, String> {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Drive a full login for one provider against the mock IdP and return the
/// session cookie pair (`sid=<signed token>`)
pub async fn perform_login(app: &TestApp, idp: &MockServer, key: &str, sub: &str) -> String {
    let login = app.server.get(&format!("/{key}/login")).await;
    assert_eq!(login.status_code(), axum::http::StatusCode::SEE_OTHER);

    let location = login
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let params = location_params(&location);
    let state = params["state"].clone();
    let nonce = params["nonce"].clone();

    let id_token = make_id_token(&idp.base_url(), &format!("client-{key}"), &nonce, sub);
    let token_mock = idp
        .mock_async(move |when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "at-12345",
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "id_token": id_token,
                }));
        })
        .await;
    let sub_owned = sub.to_string();
    let userinfo_mock = idp
        .mock_async(move |when, then| {
            when.method(GET).path("/userinfo");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "sub": sub_owned,
                    "name": "Taro Yamada",
                    "email": "taro@example.com",
                }));
        })
        .await;

    let callback = app
        .server
        .get(&format!("/{key}/callback?code=demo-code&state={state}"))
        .await;
    assert_eq!(callback.status_code(), axum::http::StatusCode::SEE_OTHER);
    assert_eq!(
        callback.headers().get("location").unwrap(),
        "loginsuccess",
        "callback should land on the success page"
    );

    token_mock.delete_async().await;
    userinfo_mock.delete_async().await;

    let set_cookie = callback
        .headers()
        .get("set-cookie")
        .expect("successful callback must set the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));

    set_cookie
        .split(';')
        .next()
        .unwrap()
        .trim()
        .to_string()
}
