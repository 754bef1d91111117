//! Catalog API Library
//!
//! Product catalog backend: CRUD and paginated weighted full-text search
//! over products, served with axum on top of a sea-orm store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod search;
pub mod tracing;

use axum::Router;
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::repositories::{ProductRepository, ProductStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub store: Arc<dyn ProductStore>,
}

impl AppState {
    /// State backed by the sea-orm product repository
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig) -> Self {
        let store: Arc<dyn ProductStore> = Arc::new(ProductRepository::new(db.clone()));
        Self { db, config, store }
    }
}

/// Builds the CORS layer from configuration.
///
/// Returns `None` when no origins are configured and permissive CORS is not
/// allowed for this environment.
pub fn cors_layer(cfg: &AppConfig) -> Option<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

/// Assembles the application: health, product routes under the configured
/// prefix, OpenAPI docs, and the request-id, CORS and tracing layers.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    let cors = cors_layer(&state.config).unwrap_or_else(|| {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    });

    Router::<AppState>::new()
        .merge(health::health_routes())
        .nest(&prefix, handlers::products::products_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
