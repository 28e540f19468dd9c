//! HTTP API for the treeform server.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `POST /api/users/signup`, `POST /api/users/signin` (no auth required)
//! - `GET /api/users/me`, `GET /api/users`, `PUT /api/users/{id}/role`
//! - `/api/emitter` and `/api/platform`: list, create, counts, get, update,
//!   delete, and the `updatedby` / `updateddate` patches

mod error;
mod middleware;
mod records;
mod users;

pub use error::{ApiError, ErrorBody};
pub use middleware::AUTH_COOKIE;
pub use records::{record_routes, RecordRoutes};

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use treeform_core::{Emitter, Platform};

use crate::auth::UserService;
use crate::config::Config;
use crate::records::RecordService;
use crate::store::DocumentStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub emitters: RecordService<Emitter>,
    pub platforms: RecordService<Platform>,
    pub users: UserService,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, users: UserService, config: &Config) -> Self {
        Self {
            emitters: RecordService::new(
                Arc::clone(&store),
                config.id_policy,
                config.persist_strategy,
            ),
            platforms: RecordService::new(store, config.id_policy, config.persist_strategy),
            users,
            cookie_secure: config.cookie_secure,
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::IF_MATCH])
        .expose_headers([header::ETAG])
        .allow_credentials(true)
}

/// Builds the application router.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/signin", post(users::signin));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::me))
        .route("/api/users/{id}/role", put(users::set_role))
        .merge(record_routes::<Emitter>("/api/emitter"))
        .merge(record_routes::<Platform>("/api/platform"))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}
