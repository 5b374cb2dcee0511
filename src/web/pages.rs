//! Askama pages rendered on the redirect path.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use url::form_urlencoded;

use crate::application::services::Navigation;
use crate::domain::entities::UtmParams;
use crate::error::ResolveError;

/// Password challenge for a protected link.
///
/// Renders `templates/password.html`; the form posts back to `/s/{code}`
/// with `query` (empty or `?utm_...`) appended.
#[derive(Template, WebTemplate)]
#[template(path = "password.html")]
pub struct PasswordTemplate {
    pub code: String,
    pub query: String,
    pub rejected: bool,
}

/// Interstitial that tries the native app first.
///
/// Renders `templates/open_app.html`. The page navigates to `deep_link`
/// and falls back to `fallback_url` after `fallback_ms` if the app did not
/// take over.
#[derive(Template, WebTemplate)]
#[template(path = "open_app.html")]
pub struct OpenAppTemplate {
    pub deep_link: String,
    pub fallback_url: String,
    pub fallback_ms: u128,
}

/// Resolution failure page. Renders `templates/error.html`.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub code: &'static str,
    pub message: String,
}

/// `401` challenge page, flagged when a wrong password was submitted.
///
/// The visit's UTM parameters ride along on the form action; a password from
/// the query string never does.
pub fn password_page(code: &str, utm: &UtmParams, rejected: bool) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        PasswordTemplate {
            code: code.to_string(),
            query: utm_query(utm),
            rejected,
        },
    )
        .into_response()
}

fn utm_query(utm: &UtmParams) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (name, value) in [
        ("utm_source", &utm.source),
        ("utm_medium", &utm.medium),
        ("utm_campaign", &utm.campaign),
        ("utm_term", &utm.term),
        ("utm_content", &utm.content),
    ] {
        if let Some(value) = value {
            query.append_pair(name, value);
        }
    }

    let query = query.finish();
    if query.is_empty() {
        query
    } else {
        format!("?{query}")
    }
}

pub fn open_app_page(deep_link: &str, navigation: &Navigation) -> Response {
    OpenAppTemplate {
        deep_link: deep_link.to_string(),
        fallback_url: navigation.final_url.clone(),
        fallback_ms: navigation.fallback_after.as_millis(),
    }
    .into_response()
}

/// Error page with the status from [`ResolveError::status`].
///
/// Lookup outages read like a missing link so the page does not reveal
/// infrastructure state.
pub fn error_page(error: &ResolveError) -> Response {
    let shown = match error {
        ResolveError::LookupFailed => &ResolveError::NotFound,
        other => other,
    };

    (
        error.status(),
        ErrorTemplate {
            code: shown.code(),
            message: shown.to_string(),
        },
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_password_page_marks_rejection() {
        let html = PasswordTemplate {
            code: "abc".to_string(),
            query: String::new(),
            rejected: true,
        }
        .render()
        .unwrap();

        assert!(html.contains("action=\"/s/abc\""));
        assert!(html.contains("Incorrect password"));
    }

    #[test]
    fn test_utm_query_for_form_action() {
        assert_eq!(utm_query(&UtmParams::default()), "");

        let utm = UtmParams {
            source: Some("ig".to_string()),
            campaign: Some("spring sale/2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            utm_query(&utm),
            "?utm_source=ig&utm_campaign=spring+sale%2F2"
        );
    }

    #[test]
    fn test_open_app_page_escapes_urls() {
        let html = OpenAppTemplate {
            deep_link: "youtube://watch?v=1&t=2".to_string(),
            fallback_url: "https://example.com/\"><script>".to_string(),
            fallback_ms: Duration::from_millis(2500).as_millis(),
        }
        .render()
        .unwrap();

        assert!(html.contains("data-fallback-ms=\"2500\""));
        assert!(!html.contains("\"><script>"));
    }

    #[test]
    fn test_lookup_failure_is_rendered_as_not_found() {
        let response = error_page(&ResolveError::LookupFailed);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = error_page(&ResolveError::AlreadyInFlight);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
