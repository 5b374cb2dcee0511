use std::sync::Arc;

use crate::application::services::{
    BackoffRetrier, ClickDispatcher, DomainRoutingService, LinkService, RedirectService,
};
use crate::domain::geo::GeoLocator;
use crate::domain::repositories::ClickRepository;
use crate::infrastructure::cache::CacheService;

/// Shared handler state. Cheap to clone: everything is behind `Arc` or a channel handle.
#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub link_service: Arc<LinkService>,
    pub domain_routing: Arc<DomainRoutingService>,
    pub click_repository: Arc<dyn ClickRepository>,
    pub geo: Arc<dyn GeoLocator>,
    pub geo_retrier: BackoffRetrier,
    pub dispatcher: ClickDispatcher,
    pub cache: Arc<dyn CacheService>,
    /// Trust `X-Forwarded-For` and friends for the client IP.
    pub behind_proxy: bool,
}
