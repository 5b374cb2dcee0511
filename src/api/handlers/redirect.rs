//! Handlers for the short-link entry point.

use axum::{
    Form,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::warn;

use crate::application::services::{Navigation, RedirectRequest, RedirectState, VisitorContext};
use crate::domain::entities::UtmParams;
use crate::error::ResolveError;
use crate::state::AppState;
use crate::utils::visitor;
use crate::web::pages;

/// Query string accepted on `/s/{code}`.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub password: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

impl RedirectQuery {
    fn utm(&self) -> UtmParams {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        UtmParams {
            source: clean(&self.utm_source),
            medium: clean(&self.utm_medium),
            campaign: clean(&self.utm_campaign),
            term: clean(&self.utm_term),
            content: clean(&self.utm_content),
        }
    }
}

/// Body of the password form.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: Option<String>,
}

/// Resolves a short code and navigates the visitor.
///
/// # Endpoint
///
/// `GET /s/{code}[?password=...&utm_source=...]`
///
/// Public `/{code}` URLs on the hybrid and customer domains are rewritten
/// here by the domain router.
///
/// # Responses
///
/// - **302 Found**: plain redirect to the chosen destination
/// - **200 OK**: open-in-app interstitial when a deep link applies
/// - **401 Unauthorized**: password challenge (first visit or wrong password)
/// - **404 Not Found**: missing, expired, not yet active, exhausted or invalid link
/// - **409 Conflict**: the same request id is already being processed
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<RedirectQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let request = RedirectRequest {
        code,
        password: query.password.clone(),
        visitor: visitor_context(&state, &headers, addr, query.utm()),
    };

    respond(&state, request).await
}

/// Accepts a password submission for a protected link.
///
/// # Endpoint
///
/// `POST /s/{code}` with form field `password`. The challenge page puts the
/// visit's UTM parameters on the form action, so they are carried through.
pub async fn redirect_password_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<RedirectQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<PasswordForm>,
) -> Response {
    let request = RedirectRequest {
        code,
        password: form.password,
        visitor: visitor_context(&state, &headers, addr, query.utm()),
    };

    respond(&state, request).await
}

async fn respond(state: &AppState, request: RedirectRequest) -> Response {
    let code = request.code.clone();
    let utm = request.visitor.utm.clone();
    let mut flow = state.redirect_service.resolve(request).await;

    let response = match flow.state() {
        RedirectState::Redirecting(navigation) => navigate(navigation),
        RedirectState::PasswordRequired { rejected } => {
            pages::password_page(&code, &utm, *rejected)
        }
        RedirectState::Failed(e) => pages::error_page(e),
        RedirectState::Resolving | RedirectState::Done => {
            pages::error_page(&ResolveError::NotFound)
        }
    };

    if let Err(e) = flow.finish() {
        warn!(code, error = %e, "Redirect flow could not be finished");
    }

    response
}

fn navigate(navigation: &Navigation) -> Response {
    match navigation.deep_link.as_deref() {
        Some(deep_link) => pages::open_app_page(deep_link, navigation),
        None => (
            StatusCode::FOUND,
            [
                (header::LOCATION, navigation.final_url.clone()),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response(),
    }
}

fn visitor_context(
    state: &AppState,
    headers: &HeaderMap,
    addr: SocketAddr,
    utm: UtmParams,
) -> VisitorContext {
    VisitorContext {
        request_id: headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        user_agent: visitor::user_agent(headers),
        referrer: visitor::referrer(headers),
        ip: visitor::client_ip(headers, Some(addr.ip()), state.behind_proxy),
        country: visitor::edge_country(headers),
        language: visitor::primary_language(headers),
        utm,
        ..Default::default()
    }
}
