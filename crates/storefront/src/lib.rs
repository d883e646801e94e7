//! Vitrine Storefront library.
//!
//! JSON API for a small clothing and electronics shop: catalog browsing and
//! search, favorites, order history, customer support tickets, and an admin
//! surface for tickets and products. The binary in `main.rs` wires
//! configuration, `PostgreSQL` and Sentry around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body, http::Request};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tower_sessions::cookie::KeyError;
use tracing::Level;

use crate::middleware::{
    create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// `store` backs the session layer: `PostgresStore` in production,
/// `MemoryStore` in router tests.
///
/// # Errors
///
/// Returns `KeyError` if the session secret cannot be used as a signing key.
pub fn app<Store>(state: AppState, store: Store) -> Result<Router, KeyError>
where
    Store: SessionStore + Clone,
{
    let session_layer = create_session_layer(store, state.config())?;

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Ok(routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}
