//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /s/{code}`        - Short link resolution (public)
//! - `POST /s/{code}`        - Password submission for protected links
//! - `POST /api/track-click` - Click tracking API
//! - `GET  /health`          - Health check: DB, cache, click queue
//!
//! Bare `/{code}` URLs on the hybrid platform domain and on customer domains
//! reach `/s/{code}` through the domain router, which runs before routing.
//!
//! # Middleware (outermost first)
//!
//! - **Path normalization** - Trailing slash handling
//! - **Request id** - `x-request-id` generated when absent and echoed back
//! - **Tracing** - Structured request/response logging
//! - **Domain router** - Host-based path rewriting
//! - **Rate limiting** - Per-IP token bucket on `/s/{code}`
//!
//! `/api` is not rate limited: the recorder's HTTP channel posts every click
//! there from a single address.

use std::sync::Arc;

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler, redirect_password_handler};
use crate::api::middleware::domain_router::domain_router;
use crate::api::middleware::rate_limit::{self, RateLimitSettings};
use crate::api::middleware::tracing;
use crate::application::services::DomainRoutingService;
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState, limits: RateLimitSettings) -> NormalizePath<Router> {
    let routing = state.domain_routing.clone();

    let router = with_domain_routing(routes(state, limits), routing)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(tracing::layer())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Application routes with state applied, without the outer middleware.
pub fn routes(state: AppState, limits: RateLimitSettings) -> Router {
    let public = Router::new().route(
        "/s/{code}",
        get(redirect_handler).post(redirect_password_handler),
    );

    Router::new()
        .merge(rate_limit::apply(public, limits))
        .nest("/api", api::routes::api_routes())
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Wraps `inner` so every request is offered to the domain router before
/// route matching.
///
/// Middleware added with `Router::layer` runs after routing, so the
/// rewrite lives on an outer router that forwards everything to `inner`.
pub fn with_domain_routing(inner: Router, routing: Arc<DomainRoutingService>) -> Router {
    Router::new()
        .fallback_service(inner)
        .layer(middleware::from_fn_with_state(routing, domain_router))
}
