//! API route configuration.

use crate::api::handlers::track_click_handler;
use crate::state::AppState;
use axum::{Router, routing::post};

/// JSON API routes, nested under `/api`.
///
/// # Endpoints
///
/// - `POST /track-click` - Record a click reported by the redirect path
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/track-click", post(track_click_handler))
}
