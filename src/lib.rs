pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod reporting;
pub mod routes;
pub mod state;
pub mod upload;
pub mod validate;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::{Mailer, SystemMailer};
use crate::state::{AppState, SharedState};
use crate::upload::{HttpImageUploader, ImageUploader};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let mailer = config.smtp.as_ref().and_then(|smtp| match SystemMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("System SMTP configured");
            Some(Arc::new(mailer) as Arc<dyn Mailer>)
        }
        Err(e) => {
            tracing::warn!("System SMTP not available: {e}");
            None
        }
    });
    if config.smtp.is_none() {
        tracing::warn!("SMTP not configured, workspace invitations are disabled");
    }

    let uploader = match config.upload.as_ref() {
        Some(upload) => Some(Arc::new(HttpImageUploader::new(upload)) as Arc<dyn ImageUploader>),
        None => {
            tracing::warn!("Upload service not configured, profile images are disabled");
            None
        }
    };

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        mailer,
        uploader,
    });

    build_router(state)
}

/// The full router over an existing state. Tests use this to plug in fake
/// collaborators.
pub fn build_router(state: SharedState) -> Router {
    let max_body_size = state.config.max_body_size;
    let cors = cors_layer(&state.config.client_url);

    let mut router = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(client_url: &str) -> Option<CorsLayer> {
    match client_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true),
        ),
        Err(e) => {
            tracing::warn!("Invalid client URL for CORS, cross-origin requests disabled: {e}");
            None
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
