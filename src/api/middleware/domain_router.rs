//! Host-based request rewriting ahead of routing.
//!
//! Wraps the whole router so a rewritten URI is matched against the normal
//! routes, e.g. `GET brand.example/abc?utm_source=x` becomes
//! `GET /s/abc?utm_source=x`.

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::services::{DomainRoutingService, RouteDecision};
use crate::utils::extract_domain::{extract_domain_from_headers, normalize_host};

pub async fn domain_router(
    State(routing): State<Arc<DomainRoutingService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = extract_domain_from_headers(request.headers())
        .ok()
        .or_else(|| request.uri().host().map(normalize_host));

    if let Some(host) = host {
        let path = request.uri().path().to_string();
        let query = request.uri().query().map(str::to_string);

        if let RouteDecision::Rewrite(target) = routing.route(&host, &path, query.as_deref()).await
        {
            match target.parse::<Uri>() {
                Ok(uri) => {
                    debug!(host, from = %path, to = %uri.path(), "Rewriting request");
                    *request.uri_mut() = uri;
                }
                Err(e) => warn!(host, target, error = %e, "Rewrite produced an invalid URI"),
            }
        }
    }

    next.run(request).await
}
