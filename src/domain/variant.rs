//! Destination overrides: A/B variants, smart device redirects, geo redirects.
//!
//! Overrides are applied in a fixed order and each later step replaces the
//! result of the earlier ones: A/B, then device, then geo. A geo redirect
//! therefore beats an explicit device redirect.

use crate::domain::entities::Link;
use crate::domain::entities::link::is_widget_url;
use crate::domain::user_agent::{Platform, UserAgentInfo};
use crate::error::ResolveError;

/// Upper bound (exclusive) of the A/B draw.
pub const AB_DRAW_RANGE: f64 = 100.0;

/// Request-derived facts the selector needs.
#[derive(Debug, Clone)]
pub struct SelectionContext {
    pub user_agent: UserAgentInfo,
    /// Two-letter country code, upper-case.
    pub country: Option<String>,
}

/// Picks the final destination for one resolution.
///
/// `draw` is the A/B random number, uniform in `[0, 100)`.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidDestination`] when the chosen URL is empty
/// or still a `widget://` pseudo URL.
pub fn select_destination(
    link: &Link,
    base_url: &str,
    ctx: &SelectionContext,
    draw: f64,
) -> Result<String, ResolveError> {
    let mut url = base_url.to_string();

    if let Some(variant) = pick_ab_variant(link, draw) {
        url = variant.to_string();
    }

    if let Some(device_url) = pick_device_override(link, &ctx.user_agent) {
        url = device_url.to_string();
    }

    if let Some(geo_url) = pick_geo_override(link, ctx.country.as_deref()) {
        url = geo_url.to_string();
    }

    if url.trim().is_empty() || is_widget_url(&url) {
        return Err(ResolveError::InvalidDestination);
    }

    Ok(url)
}

/// Walks variants accumulating weight; the first whose cumulative weight
/// reaches `draw` wins. Returns `None` when the test is disabled, empty, or
/// the weights sum to less than `draw`.
pub fn pick_ab_variant(link: &Link, draw: f64) -> Option<&str> {
    let config = link.ab_test_config.as_ref().filter(|c| c.enabled)?;

    let mut cumulative = 0.0;
    for variant in &config.variants {
        cumulative += variant.weight;
        if cumulative >= draw {
            return Some(variant.url.as_str());
        }
    }

    None
}

fn pick_device_override<'a>(link: &'a Link, ua: &UserAgentInfo) -> Option<&'a str> {
    let redirects = link.smart_redirects.as_ref()?;
    let non_empty = |v: &'a Option<String>| v.as_deref().filter(|s| !s.is_empty());

    if ua.platform == Platform::Ios
        && let Some(url) = non_empty(&redirects.ios)
    {
        return Some(url);
    }
    if ua.platform == Platform::Android
        && let Some(url) = non_empty(&redirects.android)
    {
        return Some(url);
    }
    if !ua.is_mobile() {
        return non_empty(&redirects.desktop);
    }

    None
}

fn pick_geo_override<'a>(link: &'a Link, country: Option<&str>) -> Option<&'a str> {
    let country = country?.to_ascii_uppercase();
    let redirects = link.geo_redirects.as_ref()?;

    redirects
        .get(&country)
        .or_else(|| {
            redirects
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(&country))
                .map(|(_, url)| url)
        })
        .map(String::as_str)
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AbTestConfig, AbVariant, SmartRedirects};
    use std::collections::HashMap;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148 Safari/604.1";
    const ANDROID: &str =
        "Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0.0.0 Mobile Safari/537.36";
    const DESKTOP: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36";

    fn ctx(ua: &str, country: Option<&str>) -> SelectionContext {
        SelectionContext {
            user_agent: UserAgentInfo::parse(Some(ua)),
            country: country.map(str::to_string),
        }
    }

    fn ab_link() -> Link {
        let mut link = Link::new(1, "ab".to_string(), "https://base.example".to_string());
        link.ab_test_config = Some(AbTestConfig {
            enabled: true,
            variants: vec![
                AbVariant {
                    url: "A".to_string(),
                    weight: 30.0,
                },
                AbVariant {
                    url: "B".to_string(),
                    weight: 70.0,
                },
            ],
        });
        link
    }

    #[test]
    fn test_ab_draw_selects_by_cumulative_weight() {
        let link = ab_link();
        assert_eq!(pick_ab_variant(&link, 25.0), Some("A"));
        assert_eq!(pick_ab_variant(&link, 30.0), Some("A"));
        assert_eq!(pick_ab_variant(&link, 30.5), Some("B"));
        assert_eq!(pick_ab_variant(&link, 95.0), Some("B"));
        assert_eq!(pick_ab_variant(&link, 0.0), Some("A"));
    }

    #[test]
    fn test_ab_every_draw_selects_exactly_one_variant() {
        let link = ab_link();
        let mut hits_a = 0;
        let mut hits_b = 0;
        for step in 0..1000 {
            let draw = step as f64 / 10.0;
            match pick_ab_variant(&link, draw) {
                Some("A") => hits_a += 1,
                Some("B") => hits_b += 1,
                other => panic!("unexpected selection {other:?} for draw {draw}"),
            }
        }
        // Draws 0.0..=30.0 land on A, the rest on B.
        assert_eq!(hits_a, 301);
        assert_eq!(hits_b, 699);
    }

    #[test]
    fn test_ab_underweight_falls_back_to_base() {
        let mut link = ab_link();
        if let Some(config) = link.ab_test_config.as_mut() {
            config.variants[1].weight = 20.0;
        }
        assert_eq!(pick_ab_variant(&link, 80.0), None);

        let url = select_destination(&link, "https://base.example", &ctx(DESKTOP, None), 80.0)
            .unwrap();
        assert_eq!(url, "https://base.example");
    }

    #[test]
    fn test_ab_disabled_is_ignored() {
        let mut link = ab_link();
        if let Some(config) = link.ab_test_config.as_mut() {
            config.enabled = false;
        }
        assert_eq!(pick_ab_variant(&link, 10.0), None);
    }

    #[test]
    fn test_device_overrides() {
        let mut link = Link::new(1, "d".to_string(), "https://base.example".to_string());
        link.smart_redirects = Some(SmartRedirects {
            ios: Some("https://apps.apple.com/app".to_string()),
            android: Some("https://play.google.com/app".to_string()),
            desktop: Some("https://desktop.example".to_string()),
        });

        let base = "https://base.example";
        assert_eq!(
            select_destination(&link, base, &ctx(IPHONE, None), 0.0).unwrap(),
            "https://apps.apple.com/app"
        );
        assert_eq!(
            select_destination(&link, base, &ctx(ANDROID, None), 0.0).unwrap(),
            "https://play.google.com/app"
        );
        assert_eq!(
            select_destination(&link, base, &ctx(DESKTOP, None), 0.0).unwrap(),
            "https://desktop.example"
        );
    }

    #[test]
    fn test_desktop_override_not_applied_to_mobile() {
        let mut link = Link::new(1, "d".to_string(), "https://base.example".to_string());
        link.smart_redirects = Some(SmartRedirects {
            desktop: Some("https://desktop.example".to_string()),
            ..Default::default()
        });

        let url =
            select_destination(&link, "https://base.example", &ctx(IPHONE, None), 0.0).unwrap();
        assert_eq!(url, "https://base.example");
    }

    #[test]
    fn test_device_overrides_ab_variant() {
        let mut link = ab_link();
        link.smart_redirects = Some(SmartRedirects {
            android: Some("https://android.example".to_string()),
            ..Default::default()
        });

        let url =
            select_destination(&link, "https://base.example", &ctx(ANDROID, None), 10.0).unwrap();
        assert_eq!(url, "https://android.example");
    }

    #[test]
    fn test_geo_overrides_device_for_ios_visitor_in_us() {
        let mut link = Link::new(1, "g".to_string(), "https://base.example".to_string());
        link.smart_redirects = Some(SmartRedirects {
            ios: Some("https://x".to_string()),
            ..Default::default()
        });
        link.geo_redirects = Some(HashMap::from([("US".to_string(), "https://y".to_string())]));

        let url =
            select_destination(&link, "https://base.example", &ctx(IPHONE, Some("US")), 0.0)
                .unwrap();
        assert_eq!(url, "https://y");

        let url =
            select_destination(&link, "https://base.example", &ctx(IPHONE, Some("DE")), 0.0)
                .unwrap();
        assert_eq!(url, "https://x");
    }

    #[test]
    fn test_geo_country_match_is_case_insensitive() {
        let mut link = Link::new(1, "g".to_string(), "https://base.example".to_string());
        link.geo_redirects = Some(HashMap::from([("gb".to_string(), "https://uk".to_string())]));

        let url =
            select_destination(&link, "https://base.example", &ctx(DESKTOP, Some("GB")), 0.0)
                .unwrap();
        assert_eq!(url, "https://uk");
    }

    #[test]
    fn test_widget_or_empty_destination_is_invalid() {
        let link = Link::new(1, "w".to_string(), "https://base.example".to_string());
        assert_eq!(
            select_destination(&link, "widget://thing", &ctx(DESKTOP, None), 0.0),
            Err(ResolveError::InvalidDestination)
        );
        assert_eq!(
            select_destination(&link, "", &ctx(DESKTOP, None), 0.0),
            Err(ResolveError::InvalidDestination)
        );
    }
}
