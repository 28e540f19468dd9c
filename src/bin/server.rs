//! Treeform Server
//!
//! Serves emitter and platform records over an authenticated HTTP API.
//!
//! # Configuration
//!
//! Environment variables:
//! - `TREEFORM_CONFIG`: Path to config file (default: ~/.config/treeform/config.yaml)
//! - `TREEFORM_PORT`: Port to listen on (default: 8080)
//! - `TREEFORM_DATABASE_PATH`: SQLite database (default: ~/.local/share/treeform/treeform.db)
//! - `TREEFORM_JWT_KEY`: Token signing key, at least 32 bytes (required)
//! - `TREEFORM_ID_POLICY`: `server_generated` or `client_supplied`
//! - `TREEFORM_PERSIST_STRATEGY`: `replace` or `field_updates`
//! - `TREEFORM_COOKIE_SECURE`: `false` to drop `Secure` from the session cookie
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! database_path: /var/lib/treeform/treeform.db
//! id_policy: server_generated
//! persist_strategy: replace
//! cors_origins: ["http://localhost:3000"]
//! cookie_secure: true
//! jwt:
//!   key: "a-signing-key-of-at-least-32-bytes"
//!   issuer: "treeform"
//!   audience: "treeform-clients"
//!   expiry_minutes: 60
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use treeform::auth::{TokenIssuer, UserService};
use treeform::config::Config;
use treeform::db::{init_db, SqliteDocumentStore, UserRepository};
use treeform::server::{router, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treeform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load(None)?;
    config.validate()?;

    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!(
        "Id policy: {}, persist strategy: {}",
        config.id_policy,
        config.persist_strategy
    );

    let pool = init_db(&config.database_path).await?;

    let tokens = Arc::new(TokenIssuer::new(
        config.jwt.key.as_bytes(),
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
        config.jwt.expiry_minutes,
    ));
    let users = UserService::new(UserRepository::new(pool.clone()), tokens);

    // Build app state
    let store = Arc::new(SqliteDocumentStore::new(pool));
    let state = AppState::new(store, users, &config);

    let app = router(state, &config.cors_origins);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
