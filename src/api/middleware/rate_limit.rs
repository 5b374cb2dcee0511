//! Rate limiting middleware using token bucket algorithm.

use axum::Router;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Creates a per-IP rate limiter keyed on the socket peer address.
///
/// `per_second` is the sustained request rate; one token is replenished every
/// `1000 / per_second` ms. Requests exceeding the limit receive
/// `429 Too Many Requests`. Values come from `RATE_LIMIT_PER_SECOND` and
/// `RATE_LIMIT_BURST`; both are validated to be non-zero at startup.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/track-click", post(track_click_handler))
///     .layer(rate_limit::layer(2, 100));
/// ```
pub fn layer(
    per_second: u64,
    burst: u32,
) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_interval_ms(per_second))
            .burst_size(burst)
            .finish()
            .expect("rate limit values are validated at startup"),
    );

    GovernorLayer::new(governor_conf)
}

/// Same limits, keyed on the client IP reported by the reverse proxy.
///
/// Reads `X-Forwarded-For`, `X-Real-IP` and `Forwarded` before falling back
/// to the peer address. Only use when `BEHIND_PROXY=true`.
pub fn proxied_layer(
    per_second: u64,
    burst: u32,
) -> GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_interval_ms(per_second))
            .burst_size(burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("rate limit values are validated at startup"),
    );

    GovernorLayer::new(governor_conf)
}

/// Per-IP limits applied to the public routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub per_second: u64,
    pub burst: u32,
    /// Key on the proxy-reported client IP instead of the socket peer.
    pub behind_proxy: bool,
}

/// Layers the matching limiter onto `router`.
pub fn apply<S>(router: Router<S>, settings: RateLimitSettings) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if settings.behind_proxy {
        router.layer(proxied_layer(settings.per_second, settings.burst))
    } else {
        router.layer(layer(settings.per_second, settings.burst))
    }
}

fn replenish_interval_ms(per_second: u64) -> u64 {
    (1000 / per_second.max(1)).max(1)
}
