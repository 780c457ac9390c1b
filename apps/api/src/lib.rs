//! # materi-api: REST Server for Materi
//!
//! Thin HTTP layer over `materi-db`. Handlers decode lenient JSON, hand
//! validated drafts to the repositories, and map errors to JSON responses.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  /health                                 GET                            │
//! │  /quotes                                 GET  POST                      │
//! │  /quotes/next-number                     GET                            │
//! │  /quotes/save                            POST                           │
//! │  /quotes/:id                             GET  PATCH  DELETE             │
//! │  /quotes/:id/export-to-cart              POST                           │
//! │  /quote-line-items                       GET  POST                      │
//! │  /quote-line-items/:id                   GET  PATCH  DELETE             │
//! │  /carts                                  GET  POST                      │
//! │  /carts/:id                              GET  PATCH                     │
//! │  /carts/:id/totals                       GET                            │
//! │  /cart-items                             GET  POST                      │
//! │  /cart-items/:id                         GET  PATCH  DELETE             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use materi_db::Database;

pub use crate::config::{AppConfig, ConfigError};
pub use crate::error::{ApiError, ApiResult, ErrorCode};

use crate::handlers::{carts, health, line_items, quotes};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health::health))
        // Quotes
        .route("/quotes", get(quotes::list_quotes).post(quotes::create_quote))
        .route("/quotes/next-number", get(quotes::next_number))
        .route("/quotes/save", post(quotes::save_quote))
        .route(
            "/quotes/:id",
            get(quotes::get_quote)
                .patch(quotes::update_quote)
                .delete(quotes::delete_quote),
        )
        .route("/quotes/:id/export-to-cart", post(quotes::export_to_cart))
        // Quote line items
        .route(
            "/quote-line-items",
            get(line_items::list_line_items).post(line_items::create_line_item),
        )
        .route(
            "/quote-line-items/:id",
            get(line_items::get_line_item)
                .patch(line_items::update_line_item)
                .delete(line_items::delete_line_item),
        )
        // Carts
        .route("/carts", get(carts::list_carts).post(carts::create_cart))
        .route("/carts/:id", get(carts::get_cart).patch(carts::update_cart))
        .route("/carts/:id/totals", get(carts::cart_totals))
        .route(
            "/cart-items",
            get(carts::list_cart_items).post(carts::create_cart_item),
        )
        .route(
            "/cart-items/:id",
            get(carts::get_cart_item)
                .patch(carts::update_cart_item)
                .delete(carts::delete_cart_item),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Any origin without credentials when no origins are configured, otherwise
/// only the listed origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
