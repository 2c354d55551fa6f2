pub mod middleware;
pub mod models;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use config::SessionConfig;
use services::auth::{
    PendingLoginStore, ProviderKey, ProviderRegistry, SessionStore,
};
use tower_http::services::ServeDir;

use crate::middleware::{provider_gate, GateState};
use crate::routes::{callback, index_page, login, login_fail, login_success, logout};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub pending: Arc<PendingLoginStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub session: SessionConfig,
}

/// State for one provider's sub-router
#[derive(Clone)]
pub struct ProviderContext {
    pub provider: ProviderKey,
    pub app: AppState,
}

/// Build the complete application router
///
/// One sub-router per registered provider, nested under its key, plus the
/// index page at the root.
pub fn build_app(state: AppState, content_dir: &Path) -> Router {
    let mut app = Router::new().route("/", get(index_page));

    for provider in ProviderKey::ALL {
        if state.registry.get(provider).is_none() {
            continue;
        }
        app = app.nest(
            &format!("/{provider}"),
            provider_routes(provider, state.clone(), content_dir),
        );
    }

    app
}

/// Build one provider's routes: the login flow plus its gated content tree
///
/// The original shipped three nearly identical route files; here the
/// provider is data and this constructor is called once per registry entry.
pub fn provider_routes(provider: ProviderKey, state: AppState, content_dir: &Path) -> Router {
    let ctx = ProviderContext {
        provider,
        app: state.clone(),
    };
    let gate_state = GateState {
        sessions: state.sessions.clone(),
        cookie_name: state.session.cookie_name.clone(),
        cookie_secret: state.session.cookie_secret.clone(),
        provider,
    };

    // Everything that is not part of the login flow is protected content
    let content = Router::new()
        .fallback_service(ServeDir::new(content_dir.join(provider.as_str())))
        .layer(from_fn_with_state(gate_state, provider_gate));

    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/loginsuccess", get(login_success))
        .route("/loginfail", get(login_fail))
        .route("/logout", post(logout))
        .with_state(ctx)
        .merge(content)
}
