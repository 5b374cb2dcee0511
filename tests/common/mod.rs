#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Layer;

use link_resolver::AppError;
use link_resolver::application::services::{
    BackoffRetrier, ClickDispatcher, DomainRoutingService, DomainRoutingSettings, LinkService,
    RedirectService, RedirectSettings, RetryPolicy,
};
use link_resolver::domain::click_job::ClickJob;
use link_resolver::domain::entities::{
    BindingStatus, ClickEvent, DomainBinding, Link, MinimalClickEvent, TargetType,
};
use link_resolver::domain::geo::{GeoError, GeoLocator};
use link_resolver::domain::repositories::{ClickRepository, DomainRepository, LinkRepository};
use link_resolver::infrastructure::cache::NullCache;
use link_resolver::state::AppState;

pub const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const HYBRID_DOMAIN: &str = "go.example.com";
pub const PLATFORM_DOMAIN: &str = "app.example.com";

#[derive(Default)]
pub struct InMemoryLinks {
    links: Mutex<HashMap<String, Link>>,
    pub unavailable: AtomicBool,
}

impl InMemoryLinks {
    pub fn insert(&self, link: Link) {
        self.links
            .lock()
            .unwrap()
            .insert(link.short_code.clone(), link);
    }

    pub fn clicks(&self, code: &str) -> i64 {
        self.links
            .lock()
            .unwrap()
            .get(code)
            .map(|l| l.clicks)
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinks {
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        self.check()?;
        Ok(self.links.lock().unwrap().get(code).cloned())
    }

    async fn increment_clicks(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        self.check()?;
        let mut links = self.links.lock().unwrap();
        let link = links
            .values_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "id": id })))?;
        link.clicks += 1;
        link.last_clicked_at = Some(at);
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()
    }
}

#[derive(Default)]
pub struct InMemoryClicks {
    pub events: Mutex<Vec<ClickEvent>>,
    pub minimal: Mutex<Vec<MinimalClickEvent>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl ClickRepository for InMemoryClicks {
    async fn append(&self, event: ClickEvent) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn append_minimal(&self, event: MinimalClickEvent) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        self.minimal.lock().unwrap().push(event);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryDomains {
    bindings: Mutex<HashMap<String, DomainBinding>>,
    handles: Mutex<HashMap<i64, String>>,
}

impl InMemoryDomains {
    pub fn bind(&self, domain: &str, owner_id: i64, status: BindingStatus, target: TargetType) {
        self.bindings.lock().unwrap().insert(
            domain.to_string(),
            DomainBinding {
                domain: domain.to_string(),
                owner_id,
                status,
                target_type: target,
            },
        );
    }

    pub fn set_handle(&self, owner_id: i64, handle: &str) {
        self.handles
            .lock()
            .unwrap()
            .insert(owner_id, handle.to_string());
    }
}

#[async_trait]
impl DomainRepository for InMemoryDomains {
    async fn find_binding(&self, host: &str) -> Result<Option<DomainBinding>, AppError> {
        Ok(self.bindings.lock().unwrap().get(host).cloned())
    }

    async fn find_public_handle(&self, owner_id: i64) -> Result<Option<String>, AppError> {
        Ok(self.handles.lock().unwrap().get(&owner_id).cloned())
    }
}

/// Answers every lookup with a fixed country.
pub struct StaticGeo(pub Option<&'static str>);

#[async_trait]
impl GeoLocator for StaticGeo {
    async fn country_for(&self, _ip: &str) -> Result<Option<String>, GeoError> {
        Ok(self.0.map(str::to_string))
    }
}

pub struct TestContext {
    pub state: AppState,
    pub links: Arc<InMemoryLinks>,
    pub clicks: Arc<InMemoryClicks>,
    pub domains: Arc<InMemoryDomains>,
    pub click_rx: mpsc::Receiver<ClickJob>,
}

impl TestContext {
    /// Jobs queued by the redirect path so far.
    pub fn queued_jobs(&mut self) -> Vec<ClickJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.click_rx.try_recv() {
            jobs.push(job);
        }
        jobs
    }
}

/// State with in-memory stores, no retry delays and a fixed A/B draw of 25.
pub fn create_test_state() -> TestContext {
    create_test_state_with_geo(StaticGeo(None))
}

pub fn create_test_state_with_geo(geo: StaticGeo) -> TestContext {
    let links = Arc::new(InMemoryLinks::default());
    let clicks = Arc::new(InMemoryClicks::default());
    let domains = Arc::new(InMemoryDomains::default());
    let geo: Arc<dyn GeoLocator> = Arc::new(geo);
    let cache = Arc::new(NullCache::new());

    let no_retry = BackoffRetrier::new(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO));
    let (dispatcher, click_rx) = ClickDispatcher::channel(100);

    let link_service = Arc::new(LinkService::new(links.clone(), no_retry));
    let redirect_service = Arc::new(
        RedirectService::new(
            link_service.clone(),
            geo.clone(),
            no_retry,
            dispatcher.clone(),
            RedirectSettings {
                fingerprint_salt: "test-salt".to_string(),
                ..RedirectSettings::default()
            },
        )
        .with_draw(|| 25.0),
    );
    let domain_routing = Arc::new(DomainRoutingService::new(
        domains.clone(),
        cache.clone(),
        no_retry,
        DomainRoutingSettings {
            platform_domains: vec![PLATFORM_DOMAIN.to_string(), HYBRID_DOMAIN.to_string()],
            hybrid_domain: Some(HYBRID_DOMAIN.to_string()),
            cache_ttl_seconds: 60,
        },
    ));

    let state = AppState {
        redirect_service,
        link_service,
        domain_routing,
        click_repository: clicks.clone(),
        geo,
        geo_retrier: no_retry,
        dispatcher,
        cache,
        behind_proxy: false,
    };

    TestContext {
        state,
        links,
        clicks,
        domains,
        click_rx,
    }
}

pub fn link(id: i64, code: &str, url: &str) -> Link {
    Link::new(id, code.to_string(), url.to_string())
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "203.0.113.10:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
