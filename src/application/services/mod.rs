//! Business logic services for the application layer.

pub mod click_recorder;
pub mod domain_routing;
pub mod link_service;
pub mod redirect_service;
pub mod retry;

pub use click_recorder::{
    ClickChannel, ClickDispatcher, ClickRecorder, RecordingError, RecordingOutcome,
};
pub use domain_routing::{DomainRoutingService, DomainRoutingSettings, RouteDecision};
pub use link_service::LinkService;
pub use redirect_service::{
    InFlightRequests, Navigation, RedirectFlow, RedirectRequest, RedirectService,
    RedirectSettings, RedirectState, VisitorContext,
};
pub use retry::{BackoffRetrier, RetryPolicy};
