//! Host-based routing decisions for platform and customer domains.
//!
//! Given a normalized host and a path, decides whether the request passes
//! through untouched or is rewritten to an internal path before routing:
//!
//! | Host | Path | Result |
//! |---|---|---|
//! | hybrid platform domain | system prefix or `/` | pass through |
//! | hybrid platform domain | `/{code}` | `/s/{code}` |
//! | other platform domain | any | pass through |
//! | active customer domain | `/` (storefront) | `/store/{owner_id}` |
//! | active customer domain | `/` (bio page) | `/bio/{handle}` |
//! | active customer domain | `/{code}` | `/s/{code}` |
//!
//! Customer lookups fail open: a missing, inactive or unreachable binding
//! always means pass through.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::services::retry::BackoffRetrier;
use crate::domain::entities::{DomainBinding, TargetType};
use crate::domain::repositories::DomainRepository;
use crate::infrastructure::cache::CacheService;

/// Path prefixes served by the platform itself on the hybrid domain.
pub const SYSTEM_PREFIXES: &[&str] = &[
    "/api",
    "/health",
    "/s",
    "/static",
    "/dashboard",
    "/login",
    "/signup",
    "/store",
    "/bio",
    "/favicon.ico",
    "/robots.txt",
];

/// Marker cached for hosts with no binding, so unknown hosts don't hit the database every time.
const NO_BINDING: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    PassThrough,
    /// New path and query (`/s/abc?utm_source=x`).
    Rewrite(String),
}

#[derive(Debug, Clone, Default)]
pub struct DomainRoutingSettings {
    /// Hosts owned by the platform (lower-case).
    pub platform_domains: Vec<String>,
    /// Platform host that also answers bare `/{code}` short links.
    pub hybrid_domain: Option<String>,
    pub cache_ttl_seconds: u64,
}

pub struct DomainRoutingService {
    domains: Arc<dyn DomainRepository>,
    cache: Arc<dyn CacheService>,
    retrier: BackoffRetrier,
    settings: DomainRoutingSettings,
}

impl DomainRoutingService {
    pub fn new(
        domains: Arc<dyn DomainRepository>,
        cache: Arc<dyn CacheService>,
        retrier: BackoffRetrier,
        settings: DomainRoutingSettings,
    ) -> Self {
        Self {
            domains,
            cache,
            retrier,
            settings,
        }
    }

    /// Decides how to route `path` on `host`.
    ///
    /// `host` must already be normalized (see
    /// [`crate::utils::extract_domain::normalize_host`]).
    pub async fn route(&self, host: &str, path: &str, query: Option<&str>) -> RouteDecision {
        if self.settings.hybrid_domain.as_deref() == Some(host) {
            return route_hybrid(path, query);
        }

        if self.is_platform_domain(host) {
            return RouteDecision::PassThrough;
        }

        let Some(binding) = self.active_binding(host).await else {
            return RouteDecision::PassThrough;
        };

        if path == "/" || path.is_empty() {
            return self.route_root(&binding, query).await;
        }

        match single_segment(path) {
            Some(code) => rewrite(&format!("/s/{code}"), query),
            None => RouteDecision::PassThrough,
        }
    }

    fn is_platform_domain(&self, host: &str) -> bool {
        self.settings.platform_domains.iter().any(|d| d == host)
    }

    async fn route_root(&self, binding: &DomainBinding, query: Option<&str>) -> RouteDecision {
        match binding.target_type {
            TargetType::Storefront => rewrite(&format!("/store/{}", binding.owner_id), query),
            TargetType::BioPage => match self.public_handle(binding.owner_id).await {
                Some(handle) => rewrite(&format!("/bio/{handle}"), query),
                None => RouteDecision::PassThrough,
            },
            TargetType::Links => RouteDecision::PassThrough,
        }
    }

    async fn active_binding(&self, host: &str) -> Option<DomainBinding> {
        let key = format!("domain:{host}");

        if let Ok(Some(cached)) = self.cache.get(&key).await {
            if cached == NO_BINDING {
                return None;
            }
            match serde_json::from_str::<DomainBinding>(&cached) {
                Ok(binding) => return binding.is_active().then_some(binding),
                Err(e) => debug!(host, error = %e, "Ignoring unreadable cached binding"),
            }
        }

        let found = self
            .retrier
            .execute(|| self.domains.find_binding(host))
            .await;

        let binding = match found {
            Ok(binding) => binding,
            Err(e) => {
                warn!(host, error = %e, "Domain binding lookup failed, passing through");
                return None;
            }
        };

        let cached = match &binding {
            Some(b) => serde_json::to_string(b).ok(),
            None => Some(NO_BINDING.to_string()),
        };
        if let Some(value) = cached {
            let _ = self
                .cache
                .set(&key, &value, Some(self.settings.cache_ttl_seconds))
                .await;
        }

        binding.filter(DomainBinding::is_active)
    }

    async fn public_handle(&self, owner_id: i64) -> Option<String> {
        match self
            .retrier
            .execute(|| self.domains.find_public_handle(owner_id))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!(owner_id, error = %e, "Public handle lookup failed, passing through");
                None
            }
        }
    }
}

fn route_hybrid(path: &str, query: Option<&str>) -> RouteDecision {
    if path == "/" || path.is_empty() || is_system_path(path) {
        return RouteDecision::PassThrough;
    }

    match single_segment(path) {
        Some(code) => rewrite(&format!("/s/{code}"), query),
        None => RouteDecision::PassThrough,
    }
}

/// True if `path` is a system prefix or lies below one.
pub fn is_system_path(path: &str) -> bool {
    SYSTEM_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Returns the segment of a `/{segment}` path (trailing slash allowed).
fn single_segment(path: &str) -> Option<&str> {
    let segment = path.strip_prefix('/')?.strip_suffix('/').unwrap_or(&path[1..]);
    (!segment.is_empty() && !segment.contains('/')).then_some(segment)
}

fn rewrite(path: &str, query: Option<&str>) -> RouteDecision {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => RouteDecision::Rewrite(format!("{path}?{q}")),
        None => RouteDecision::Rewrite(path.to_string()),
    }
}
