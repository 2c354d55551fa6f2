use std::sync::Arc;

use api::{build_app, AppState};
use config::{AppConfig, LoggingConfig};
use services::auth::{
    MemorySessionStore, PendingLoginStore, ProviderKey, ProviderRegistry, SessionStore,
};

#[tokio::main]
async fn main() {
    // Load configuration first to get logging settings
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Application cannot start without a valid configuration.");
        std::process::exit(1);
    });

    init_tracing(&config.logging);

    let registry = Arc::new(ProviderRegistry::from_config(&config.auth).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to configure OIDC providers");
        tracing::error!("Application cannot start without a valid configuration. Exiting.");
        std::process::exit(1);
    }));

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(config.session.ttl_secs));
    let pending = Arc::new(PendingLoginStore::new(config.session.ttl_secs));

    let state = AppState {
        registry,
        pending: pending.clone(),
        sessions: sessions.clone(),
        session: config.session.clone(),
    };

    let app = build_app(state, &config.server.content_dir);

    // Periodic sweep; lazy expiry on lookup is what actually guards access
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await + pending.cleanup_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "swept expired session state");
            }
        }
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();

    tracing::info!(address = %bind_address, "Server started successfully");
    tracing::info!(
        session_ttl_secs = config.session.ttl_secs,
        "Session TTL (deliberately short for the demo)"
    );
    tracing::info!("Endpoints:");
    tracing::info!("  - GET / (Login index)");
    for provider in ProviderKey::ALL {
        tracing::info!("  - GET /{provider}/login (Redirect to the identity provider)");
        tracing::info!("  - GET /{provider}/callback (OIDC callback)");
        tracing::info!("  - POST /{provider}/logout (Logout)");
        tracing::info!("  - GET /{provider}/* (Protected content)");
    }

    axum::serve(listener, app).await.unwrap();
}

fn init_tracing(logging_config: &LoggingConfig) {
    // Build the filter string from the logging configuration
    let mut filter = logging_config.level.clone();

    for (module, level) in &logging_config.modules {
        filter.push_str(&format!(",{}={}", module, level));
    }

    // Initialize tracing based on the format specified in the configuration
    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}
