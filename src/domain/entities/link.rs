//! Link entity: the resolvable record behind a short code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pseudo-scheme used by widget links that have no web destination of their own.
pub const WIDGET_SCHEME: &str = "widget://";

/// Content type of a link.
///
/// Anything other than a plain `link` is a widget kind. Widgets can only be
/// visited when their metadata carries an embeddable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkType {
    Link,
    Widget(String),
}

impl LinkType {
    pub fn is_widget(&self) -> bool {
        matches!(self, Self::Widget(_))
    }
}

impl From<String> for LinkType {
    fn from(value: String) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case("link") {
            Self::Link
        } else {
            Self::Widget(value)
        }
    }
}

impl From<LinkType> for String {
    fn from(value: LinkType) -> Self {
        match value {
            LinkType::Link => "link".to_string(),
            LinkType::Widget(kind) => kind,
        }
    }
}

/// Free-form metadata; only the escape-hatch URLs matter for resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Per-OS-class destination overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRedirects {
    #[serde(default)]
    pub ios: Option<String>,
    #[serde(default)]
    pub android: Option<String>,
    #[serde(default)]
    pub desktop: Option<String>,
}

/// One weighted destination of an A/B test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbVariant {
    pub url: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbTestConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub variants: Vec<AbVariant>,
}

/// A short link with its lifecycle, access and override settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub link_type: LinkType,
    pub metadata: LinkMetadata,
    pub created_at: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    pub clicks: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
    pub smart_redirects: Option<SmartRedirects>,
    /// Country code (upper-case, ISO 3166-1 alpha-2) to destination URL.
    pub geo_redirects: Option<HashMap<String, String>>,
    pub ab_test_config: Option<AbTestConfig>,
}

impl Link {
    /// Creates a plain link with no policies or overrides.
    pub fn new(id: i64, short_code: String, original_url: String) -> Self {
        Self {
            id,
            short_code,
            original_url,
            link_type: LinkType::Link,
            metadata: LinkMetadata::default(),
            created_at: Utc::now(),
            expiration_date: None,
            start_date: None,
            max_clicks: None,
            clicks: 0,
            last_clicked_at: None,
            password: None,
            smart_redirects: None,
            geo_redirects: None,
            ab_test_config: None,
        }
    }

    /// Returns true if a non-empty password protects this link.
    pub fn is_password_protected(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Returns true if the link is a widget or points at the widget pseudo-scheme.
    pub fn is_widget(&self) -> bool {
        self.link_type.is_widget() || is_widget_url(&self.original_url)
    }
}

/// Returns true for `widget://` pseudo URLs.
pub fn is_widget_url(url: &str) -> bool {
    url.trim_start().starts_with(WIDGET_SCHEME)
}
