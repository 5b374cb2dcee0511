//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, worker spawning, and the Axum
//! server lifecycle including the click queue flush on shutdown.

use crate::api::middleware::rate_limit::RateLimitSettings;
use crate::application::services::{
    BackoffRetrier, ClickDispatcher, ClickRecorder, DomainRoutingService, LinkService,
    RedirectService, RetryPolicy,
};
use crate::config::Config;
use crate::domain::click_worker::run_click_worker;
use crate::domain::geo::GeoLocator;
use crate::domain::repositories::{ClickRepository, DomainRepository, LinkRepository};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::geo::{HttpGeoLocator, NullGeoLocator};
use crate::infrastructure::persistence::{
    PgClickRepository, PgDomainRepository, PgLinkRepository,
};
use crate::infrastructure::tracking::{HttpTrackingChannel, MinimalStoreChannel, StoreChannel};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Key prefix for everything this service stores in Redis.
const CACHE_KEY_PREFIX: &str = "link-resolver";

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache (or NullCache fallback)
/// - Geolocation client (or a no-op locator)
/// - Click recording chain and its background worker
/// - Axum HTTP server with graceful shutdown
///
/// After the server stops accepting requests the click queue is drained,
/// bounded by `SHUTDOWN_FLUSH_SECONDS`.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The tracking HTTP client cannot be built
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    let cache = connect_cache(&config).await;
    let geo = build_geo_locator(&config)?;

    let pool = Arc::new(pool);
    let link_repository: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(pool.clone()));
    let click_repository: Arc<dyn ClickRepository> =
        Arc::new(PgClickRepository::new(pool.clone()));
    let domain_repository: Arc<dyn DomainRepository> =
        Arc::new(PgDomainRepository::new(pool.clone()));

    let channel_timeout = config.recording_channel_timeout();
    let tracking = HttpTrackingChannel::new(&config.tracking_endpoint, channel_timeout)
        .context("Failed to build tracking HTTP client")?;
    let recorder = Arc::new(ClickRecorder::new(
        Arc::new(tracking),
        Arc::new(StoreChannel::new(click_repository.clone())),
        Arc::new(MinimalStoreChannel::new(click_repository.clone())),
        link_repository.clone(),
        channel_timeout,
    ));

    let (dispatcher, click_rx) = ClickDispatcher::channel(config.click_queue_capacity);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        recorder,
        config.click_worker_concurrency,
    ));
    info!(
        concurrency = config.click_worker_concurrency,
        "Click worker started"
    );

    let edge_retrier = BackoffRetrier::new(RetryPolicy::edge());
    let link_service = Arc::new(LinkService::new(
        link_repository,
        BackoffRetrier::new(config.lookup_retry_policy()),
    ));
    let redirect_service = Arc::new(RedirectService::new(
        link_service.clone(),
        geo.clone(),
        edge_retrier,
        dispatcher.clone(),
        config.redirect_settings(),
    ));
    let domain_routing = Arc::new(DomainRoutingService::new(
        domain_repository,
        cache.clone(),
        edge_retrier,
        config.domain_routing_settings(),
    ));

    // Every dispatcher clone lives in the state; once the router is dropped
    // the queue closes and the worker drains.
    let state = AppState {
        redirect_service,
        link_service,
        domain_routing,
        click_repository,
        geo,
        geo_retrier: edge_retrier,
        dispatcher,
        cache,
        behind_proxy: config.behind_proxy,
    };

    let app = app_router(
        state,
        RateLimitSettings {
            per_second: config.rate_limit_per_second,
            burst: config.rate_limit_burst,
            behind_proxy: config.behind_proxy,
        },
    );

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped, flushing click queue");
    let flush = Duration::from_secs(config.shutdown_flush_seconds);
    match tokio::time::timeout(flush, worker).await {
        Ok(Ok(())) => info!("Click queue flushed"),
        Ok(Err(e)) => warn!(error = %e, "Click worker terminated abnormally"),
        Err(_) => warn!(
            timeout_secs = config.shutdown_flush_seconds,
            "Click queue flush timed out, remaining clicks are lost"
        ),
    }

    Ok(())
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds, CACHE_KEY_PREFIX).await {
        Ok(redis) => {
            info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis, using NullCache");
            Arc::new(NullCache::new())
        }
    }
}

fn build_geo_locator(config: &Config) -> Result<Arc<dyn GeoLocator>> {
    let Some(url) = &config.geo_lookup_url else {
        info!("Geolocation disabled");
        return Ok(Arc::new(NullGeoLocator));
    };

    let locator = HttpGeoLocator::new(
        url.clone(),
        Duration::from_millis(config.geo_lookup_timeout_ms),
    )
    .context("Failed to build geolocation HTTP client")?;
    info!("Geolocation enabled");

    Ok(Arc::new(locator))
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
