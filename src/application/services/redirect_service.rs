//! Redirect orchestration: from a short code to a navigation decision.
//!
//! A request moves through `Resolving → {Failed | PasswordRequired |
//! Redirecting} → Done`. The flow is held in a [`RedirectFlow`] that refuses
//! transitions outside that graph. Click recording is queued and never
//! awaited, so storage trouble can't delay the visitor.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::application::services::click_recorder::ClickDispatcher;
use crate::application::services::link_service::LinkService;
use crate::application::services::retry::BackoffRetrier;
use crate::domain::click_job::ClickJob;
use crate::domain::entities::{Link, UtmParams};
use crate::domain::geo::GeoLocator;
use crate::domain::user_agent::UserAgentInfo;
use crate::domain::variant::{AB_DRAW_RANGE, SelectionContext};
use crate::domain::{deep_link, fingerprint, policy, variant};
use crate::error::ResolveError;

/// Where to send the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub final_url: String,
    /// Native-app URI tried first; `final_url` is the fallback.
    pub deep_link: Option<String>,
    /// How long an interstitial waits for the app before falling back.
    pub fallback_after: Duration,
}

/// State of one redirect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectState {
    Resolving,
    Failed(ResolveError),
    /// The link is protected; `rejected` is set after a wrong submission.
    PasswordRequired {
        rejected: bool,
    },
    Redirecting(Navigation),
    Done,
}

impl RedirectState {
    fn name(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Failed(_) => "failed",
            Self::PasswordRequired { .. } => "password_required",
            Self::Redirecting(_) => "redirecting",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RedirectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("illegal redirect transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// State holder enforcing the redirect state graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectFlow {
    state: RedirectState,
}

impl Default for RedirectFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RedirectFlow {
    pub fn new() -> Self {
        Self {
            state: RedirectState::Resolving,
        }
    }

    pub fn state(&self) -> &RedirectState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == RedirectState::Done
    }

    /// Moves to `next` if the graph allows it.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] and leaves the state untouched otherwise.
    pub fn transition(&mut self, next: RedirectState) -> Result<(), IllegalTransition> {
        use RedirectState::*;

        let allowed = matches!(
            (&self.state, &next),
            (Resolving, Failed(_) | PasswordRequired { .. } | Redirecting(_))
                | (PasswordRequired { .. }, PasswordRequired { .. } | Redirecting(_) | Failed(_))
                | (Failed(_) | PasswordRequired { .. } | Redirecting(_), Done)
        );

        if !allowed {
            return Err(IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }

        self.state = next;
        Ok(())
    }

    /// Marks the response as delivered.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] while the flow is still resolving or already done.
    pub fn finish(&mut self) -> Result<(), IllegalTransition> {
        self.transition(RedirectState::Done)
    }
}

/// Request ids currently being processed.
#[derive(Debug, Clone, Default)]
pub struct InFlightRequests {
    ids: Arc<DashMap<String, ()>>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically marks `request_id` in flight. Returns `None` for a duplicate.
    pub fn try_acquire(&self, request_id: &str) -> Option<InFlightGuard> {
        match self.ids.entry(request_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    ids: self.ids.clone(),
                    request_id: request_id.to_string(),
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Clears the in-flight marker when dropped, including on cancellation.
#[derive(Debug)]
pub struct InFlightGuard {
    ids: Arc<DashMap<String, ()>>,
    request_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.remove(&self.request_id);
    }
}

/// What is known about the visitor at request time.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub request_id: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub ip: Option<String>,
    /// Country from edge headers, upper-case.
    pub country: Option<String>,
    pub language: Option<String>,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub timezone: Option<String>,
    pub utm: UtmParams,
}

#[derive(Debug, Clone, Default)]
pub struct RedirectRequest {
    pub code: String,
    pub password: Option<String>,
    pub visitor: VisitorContext,
}

/// Tunables of the redirect path.
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    pub fingerprint_salt: String,
    pub deep_link_fallback: Duration,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            fingerprint_salt: String::new(),
            deep_link_fallback: Duration::from_millis(2500),
        }
    }
}

type DrawFn = dyn Fn() -> f64 + Send + Sync;

/// Runs the decision pipeline for one request.
pub struct RedirectService {
    links: Arc<LinkService>,
    geo: Arc<dyn GeoLocator>,
    geo_retrier: BackoffRetrier,
    dispatcher: ClickDispatcher,
    in_flight: InFlightRequests,
    settings: RedirectSettings,
    draw: Arc<DrawFn>,
}

impl RedirectService {
    pub fn new(
        links: Arc<LinkService>,
        geo: Arc<dyn GeoLocator>,
        geo_retrier: BackoffRetrier,
        dispatcher: ClickDispatcher,
        settings: RedirectSettings,
    ) -> Self {
        Self {
            links,
            geo,
            geo_retrier,
            dispatcher,
            in_flight: InFlightRequests::new(),
            settings,
            draw: Arc::new(|| {
                use rand::Rng;
                rand::rng().random_range(0.0..AB_DRAW_RANGE)
            }),
        }
    }

    /// Replaces the A/B random source.
    pub fn with_draw(mut self, draw: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.draw = Arc::new(draw);
        self
    }

    pub fn in_flight(&self) -> &InFlightRequests {
        &self.in_flight
    }

    /// Daily-rotating visitor id under this service's salt.
    pub fn visitor_id(&self, user_agent: Option<&str>, ip: Option<&str>, at: DateTime<Utc>) -> String {
        fingerprint::visitor_id(
            user_agent.unwrap_or_default(),
            ip.unwrap_or_default(),
            at,
            &self.settings.fingerprint_salt,
        )
    }

    /// Resolves a request to `Failed`, `PasswordRequired` or `Redirecting`.
    ///
    /// A click is queued only on `Redirecting`.
    pub async fn resolve(&self, request: RedirectRequest) -> RedirectFlow {
        let mut flow = RedirectFlow::new();

        let _guard = match request.visitor.request_id.as_deref() {
            Some(id) => match self.in_flight.try_acquire(id) {
                Some(guard) => Some(guard),
                None => {
                    info!(request_id = id, "Duplicate request already in flight");
                    advance(&mut flow, RedirectState::Failed(ResolveError::AlreadyInFlight));
                    return flow;
                }
            },
            None => None,
        };

        let next = match self.decide(&request).await {
            Ok(state) => state,
            Err(e) => {
                debug!(code = %request.code, reason = e.code(), "Redirect failed");
                RedirectState::Failed(e)
            }
        };
        advance(&mut flow, next);
        flow
    }

    async fn decide(&self, request: &RedirectRequest) -> Result<RedirectState, ResolveError> {
        let link = self.links.lookup(&request.code).await?;
        let now = Utc::now();

        let mut resolution = policy::evaluate(&link, now)?;

        if resolution.requires_password {
            match request.password.as_deref().filter(|p| !p.is_empty()) {
                None => return Ok(RedirectState::PasswordRequired { rejected: false }),
                Some(submitted) if !password_matches(&link, submitted) => {
                    info!(code = %link.short_code, "Wrong password submitted");
                    return Ok(RedirectState::PasswordRequired { rejected: true });
                }
                Some(_) => resolution = policy::evaluate_unlocked(&link, now)?,
            }
        }

        let visitor = &request.visitor;
        let country = self.visitor_country(&link, visitor).await;
        let ctx = SelectionContext {
            user_agent: UserAgentInfo::parse(visitor.user_agent.as_deref()),
            country,
        };

        let final_url =
            variant::select_destination(&link, &resolution.base_url, &ctx, (self.draw)())?;

        self.dispatcher
            .dispatch(self.click_job(&link, &final_url, &ctx, visitor));

        let deep_link = deep_link::translate(&final_url, ctx.user_agent.platform);
        if let Some(app) = deep_link.as_ref().and_then(|_| deep_link::app_name(&final_url)) {
            debug!(code = %link.short_code, app, "Deep link available");
        }

        Ok(RedirectState::Redirecting(Navigation {
            final_url,
            deep_link,
            fallback_after: self.settings.deep_link_fallback,
        }))
    }

    /// Edge headers win; IP geolocation is only worth the round trip when the
    /// link actually has geo redirects.
    async fn visitor_country(&self, link: &Link, visitor: &VisitorContext) -> Option<String> {
        if visitor.country.is_some() {
            return visitor.country.clone();
        }

        let has_geo = link.geo_redirects.as_ref().is_some_and(|m| !m.is_empty());
        let ip = visitor.ip.as_deref().filter(|_| has_geo)?;

        self.geo_retrier
            .execute(|| self.geo.country_for(ip))
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "Geolocation unavailable");
                None
            })
    }

    fn click_job(
        &self,
        link: &Link,
        final_url: &str,
        ctx: &SelectionContext,
        visitor: &VisitorContext,
    ) -> ClickJob {
        let now = Utc::now();
        let visitor_id =
            self.visitor_id(visitor.user_agent.as_deref(), visitor.ip.as_deref(), now);

        let mut job = ClickJob::new(link.id, &link.short_code, final_url, visitor_id, now);
        job.user_agent = visitor.user_agent.clone();
        job.referrer = visitor.referrer.clone();
        job.ip = visitor.ip.clone();
        job.country_hint = ctx.country.clone();
        job.language = visitor.language.clone();
        job.screen_width = visitor.screen_width;
        job.screen_height = visitor.screen_height;
        job.timezone = visitor.timezone.clone();
        job.utm = visitor.utm.clone();
        job
    }
}

fn password_matches(link: &Link, submitted: &str) -> bool {
    link.password
        .as_deref()
        .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(submitted.as_bytes())))
}

fn advance(flow: &mut RedirectFlow, next: RedirectState) {
    if let Err(e) = flow.transition(next) {
        error!(error = %e, "Redirect flow rejected transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::retry::RetryPolicy;
    use crate::domain::entities::{AbTestConfig, AbVariant, SmartRedirects};
    use crate::domain::geo::MockGeoLocator;
    use crate::domain::repositories::MockLinkRepository;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148 Safari/604.1";
    const DESKTOP: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36";

    fn no_retry() -> BackoffRetrier {
        BackoffRetrier::new(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO))
    }

    fn service_with(link: Option<Link>) -> (RedirectService, mpsc::Receiver<ClickJob>) {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .returning(move |_| Ok(link.clone()));
        let links = Arc::new(LinkService::new(Arc::new(repo), no_retry()));

        let mut geo = MockGeoLocator::new();
        geo.expect_country_for().returning(|_| Ok(None));

        let (dispatcher, rx) = ClickDispatcher::channel(16);
        let service = RedirectService::new(
            links,
            Arc::new(geo),
            no_retry(),
            dispatcher,
            RedirectSettings::default(),
        )
        .with_draw(|| 50.0);
        (service, rx)
    }

    fn request(code: &str, ua: &str) -> RedirectRequest {
        RedirectRequest {
            code: code.to_string(),
            password: None,
            visitor: VisitorContext {
                user_agent: Some(ua.to_string()),
                ip: Some("203.0.113.9".to_string()),
                ..Default::default()
            },
        }
    }

    fn link() -> Link {
        Link::new(5, "abc".to_string(), "https://example.com/a".to_string())
    }

    #[test]
    fn test_flow_rejects_illegal_transitions() {
        let mut flow = RedirectFlow::new();
        assert!(flow.finish().is_err());
        assert_eq!(flow.state(), &RedirectState::Resolving);

        flow.transition(RedirectState::PasswordRequired { rejected: false })
            .unwrap();
        flow.transition(RedirectState::PasswordRequired { rejected: true })
            .unwrap();
        flow.finish().unwrap();
        assert!(flow.is_done());
        assert!(
            flow.transition(RedirectState::Failed(ResolveError::NotFound))
                .is_err()
        );
    }

    #[test]
    fn test_in_flight_guard_released_on_drop() {
        let in_flight = InFlightRequests::new();
        let guard = in_flight.try_acquire("req-1").unwrap();
        assert!(in_flight.try_acquire("req-1").is_none());
        assert!(in_flight.try_acquire("req-2").is_some());

        drop(guard);
        assert!(in_flight.try_acquire("req-1").is_some());
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_plain_link_redirects_and_queues_click() {
        let (service, mut rx) = service_with(Some(link()));

        let flow = service.resolve(request("abc", DESKTOP)).await;
        let RedirectState::Redirecting(nav) = flow.state() else {
            panic!("unexpected state {:?}", flow.state());
        };
        assert_eq!(nav.final_url, "https://example.com/a");
        assert_eq!(nav.deep_link, None);
        assert_eq!(nav.fallback_after, Duration::from_millis(2500));

        let job = rx.try_recv().unwrap();
        assert_eq!(job.link_id, 5);
        assert_eq!(job.destination_url, "https://example.com/a");
        assert_eq!(job.visitor_id.len(), 64);
    }

    #[tokio::test]
    async fn test_missing_link_fails_without_click() {
        let (service, mut rx) = service_with(None);

        let flow = service.resolve(request("zzz", DESKTOP)).await;
        assert_eq!(
            flow.state(),
            &RedirectState::Failed(ResolveError::NotFound)
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_click_limit_scenario() {
        let mut l = link();
        l.max_clicks = Some(5);
        l.clicks = 5;
        let (service, mut rx) = service_with(Some(l));

        let flow = service.resolve(request("abc", DESKTOP)).await;
        assert_eq!(
            flow.state(),
            &RedirectState::Failed(ResolveError::ClickLimitReached)
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_password_scenario() {
        let mut l = link();
        l.password = Some("p@ss".to_string());
        l.expiration_date = Some(Utc::now() + ChronoDuration::days(1));
        let (service, mut rx) = service_with(Some(l));

        let flow = service.resolve(request("abc", DESKTOP)).await;
        assert_eq!(
            flow.state(),
            &RedirectState::PasswordRequired { rejected: false }
        );

        let mut wrong = request("abc", DESKTOP);
        wrong.password = Some("nope".to_string());
        let flow = service.resolve(wrong).await;
        assert_eq!(
            flow.state(),
            &RedirectState::PasswordRequired { rejected: true }
        );
        assert!(rx.try_recv().is_err());

        let mut right = request("abc", DESKTOP);
        right.password = Some("p@ss".to_string());
        let flow = service.resolve(right).await;
        assert!(matches!(flow.state(), RedirectState::Redirecting(_)));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_ios_visitor_in_us_gets_geo_url() {
        let mut l = link();
        l.smart_redirects = Some(SmartRedirects {
            ios: Some("https://x".to_string()),
            ..Default::default()
        });
        l.geo_redirects = Some(HashMap::from([("US".to_string(), "https://y".to_string())]));
        let (service, mut rx) = service_with(Some(l));

        let mut req = request("abc", IPHONE);
        req.visitor.country = Some("US".to_string());
        let flow = service.resolve(req).await;

        let RedirectState::Redirecting(nav) = flow.state() else {
            panic!("unexpected state {:?}", flow.state());
        };
        assert_eq!(nav.final_url, "https://y");
        assert_eq!(rx.try_recv().unwrap().destination_url, "https://y");
    }

    #[tokio::test]
    async fn test_geo_lookup_used_when_no_edge_country() {
        let mut l = link();
        l.geo_redirects = Some(HashMap::from([("DE".to_string(), "https://de".to_string())]));

        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().returning(move |_| Ok(Some(l.clone())));
        let mut geo = MockGeoLocator::new();
        geo.expect_country_for()
            .withf(|ip| ip == "203.0.113.9")
            .times(1)
            .returning(|_| Ok(Some("DE".to_string())));

        let (dispatcher, _rx) = ClickDispatcher::channel(4);
        let service = RedirectService::new(
            Arc::new(LinkService::new(Arc::new(repo), no_retry())),
            Arc::new(geo),
            no_retry(),
            dispatcher,
            RedirectSettings::default(),
        );

        let flow = service.resolve(request("abc", DESKTOP)).await;
        let RedirectState::Redirecting(nav) = flow.state() else {
            panic!("unexpected state {:?}", flow.state());
        };
        assert_eq!(nav.final_url, "https://de");
    }

    #[tokio::test]
    async fn test_ab_draw_is_used() {
        let mut l = link();
        l.ab_test_config = Some(AbTestConfig {
            enabled: true,
            variants: vec![
                AbVariant {
                    url: "https://a".to_string(),
                    weight: 30.0,
                },
                AbVariant {
                    url: "https://b".to_string(),
                    weight: 70.0,
                },
            ],
        });
        let (service, _rx) = service_with(Some(l));

        let service = service.with_draw(|| 25.0);
        let flow = service.resolve(request("abc", DESKTOP)).await;
        assert!(
            matches!(flow.state(), RedirectState::Redirecting(nav) if nav.final_url == "https://a")
        );

        let service = service.with_draw(|| 95.0);
        let flow = service.resolve(request("abc", DESKTOP)).await;
        assert!(
            matches!(flow.state(), RedirectState::Redirecting(nav) if nav.final_url == "https://b")
        );
    }

    #[tokio::test]
    async fn test_deep_link_for_mobile_visitor() {
        let l = Link::new(
            6,
            "yt".to_string(),
            "https://www.youtube.com/watch?v=abc123".to_string(),
        );
        let (service, _rx) = service_with(Some(l));

        let flow = service.resolve(request("yt", IPHONE)).await;
        let RedirectState::Redirecting(nav) = flow.state() else {
            panic!("unexpected state {:?}", flow.state());
        };
        assert_eq!(nav.deep_link.as_deref(), Some("youtube://watch?v=abc123"));
        assert_eq!(nav.final_url, "https://www.youtube.com/watch?v=abc123");
    }

    #[tokio::test]
    async fn test_duplicate_request_id_is_rejected() {
        let (service, _rx) = service_with(Some(link()));
        let held = service.in_flight().try_acquire("req-7").unwrap();

        let mut req = request("abc", DESKTOP);
        req.visitor.request_id = Some("req-7".to_string());
        let flow = service.resolve(req.clone()).await;
        assert_eq!(
            flow.state(),
            &RedirectState::Failed(ResolveError::AlreadyInFlight)
        );

        drop(held);
        let flow = service.resolve(req).await;
        assert!(matches!(flow.state(), RedirectState::Redirecting(_)));
        assert!(service.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_recording_failure_does_not_block_navigation() {
        let (service, rx) = service_with(Some(link()));
        drop(rx);

        let flow = service.resolve(request("abc", DESKTOP)).await;
        assert!(matches!(flow.state(), RedirectState::Redirecting(_)));
    }
}
