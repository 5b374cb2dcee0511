//! Translation of web URLs into native-app deep links.
//!
//! A small static registry maps well-known hosts to an app rule. A rule
//! recognises the paths it can open natively; anything else (vanity paths
//! that cannot be told apart from reserved pages, search pages, settings)
//! stays a plain web redirect. The translator is pure and never touches the
//! network.
//!
//! Android gets `intent://` URIs carrying the app package, so the browser can
//! hand off to the app when it is installed. iOS gets the app's custom scheme.
//!
//! # Examples
//!
//! ```
//! use link_resolver::domain::deep_link::translate;
//! use link_resolver::domain::user_agent::Platform;
//!
//! let ios = translate("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Platform::Ios);
//! assert_eq!(ios.as_deref(), Some("youtube://watch?v=dQw4w9WgXcQ"));
//!
//! assert!(translate("https://example.com/page", Platform::Ios).is_none());
//! ```

use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::domain::user_agent::Platform;

/// One supported app.
struct AppRule {
    name: &'static str,
    android_package: &'static str,
    matches_host: fn(&str) -> bool,
    /// Builds the iOS URI; `None` means the path has no native target.
    ios_target: fn(&Url, &[&str]) -> Option<String>,
}

static REGISTRY: &[AppRule] = &[
    AppRule {
        name: "youtube",
        android_package: "com.google.android.youtube",
        matches_host: |h| h == "youtube.com" || h == "youtu.be",
        ios_target: youtube,
    },
    AppRule {
        name: "instagram",
        android_package: "com.instagram.android",
        matches_host: |h| h == "instagram.com",
        ios_target: instagram,
    },
    AppRule {
        name: "twitter",
        android_package: "com.twitter.android",
        matches_host: |h| h == "twitter.com" || h == "x.com",
        ios_target: twitter,
    },
    AppRule {
        name: "spotify",
        android_package: "com.spotify.music",
        matches_host: |h| h == "open.spotify.com",
        ios_target: spotify,
    },
    AppRule {
        name: "linkedin",
        android_package: "com.linkedin.android",
        matches_host: |h| h == "linkedin.com",
        ios_target: linkedin,
    },
    AppRule {
        name: "facebook",
        android_package: "com.facebook.katana",
        matches_host: |h| h == "facebook.com" || h == "fb.com",
        ios_target: facebook,
    },
    AppRule {
        name: "tiktok",
        android_package: "com.zhiliaoapp.musically",
        matches_host: |h| h == "tiktok.com",
        ios_target: tiktok,
    },
    AppRule {
        name: "whatsapp",
        android_package: "com.whatsapp",
        matches_host: |h| h == "wa.me",
        ios_target: whatsapp,
    },
    AppRule {
        name: "amazon",
        android_package: "com.amazon.mShop.android.shopping",
        matches_host: |h| h.starts_with("amazon.") && h.len() > "amazon.".len(),
        ios_target: amazon,
    },
];

/// Returns the deep link for `web_url` on `platform`, if any.
///
/// Only `http`/`https` URLs on a registered host with a recognised path are
/// translated. Desktop and unknown platforms always get `None`.
pub fn translate(web_url: &str, platform: Platform) -> Option<String> {
    if platform == Platform::Other {
        return None;
    }

    let url = Url::parse(web_url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = canonical_host(url.host_str()?);
    let rule = REGISTRY.iter().find(|rule| (rule.matches_host)(&host))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let ios = (rule.ios_target)(&url, &segments)?;

    match platform {
        Platform::Ios => Some(ios),
        Platform::Android => Some(android_intent(&url, rule.android_package)),
        Platform::Other => None,
    }
}

/// Name of the app `web_url` would open in, for logging.
pub fn app_name(web_url: &str) -> Option<&'static str> {
    let url = Url::parse(web_url).ok()?;
    let host = canonical_host(url.host_str()?);
    REGISTRY
        .iter()
        .find(|rule| (rule.matches_host)(&host))
        .map(|rule| rule.name)
}

fn canonical_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    for prefix in ["www.", "m.", "mobile."] {
        if let Some(rest) = host.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    host
}

fn android_intent(url: &Url, package: &str) -> String {
    let host = url.host_str().unwrap_or_default();
    let query = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    format!(
        "intent://{host}{path}{query}#Intent;scheme=https;package={package};end",
        path = url.path()
    )
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn is_handle(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn youtube(url: &Url, segments: &[&str]) -> Option<String> {
    if canonical_host(url.host_str()?) == "youtu.be" {
        let id = segments.first().filter(|id| is_handle(id))?;
        return Some(format!("youtube://watch?v={}", encode(id)));
    }

    match segments {
        ["watch"] => query_param(url, "v").map(|id| format!("youtube://watch?v={}", encode(&id))),
        ["shorts", id] if is_handle(id) => Some(format!("youtube://shorts/{id}")),
        [handle] if handle.starts_with('@') && is_handle(&handle[1..]) => {
            Some(format!("youtube://www.youtube.com/{handle}"))
        }
        ["channel", id] if is_handle(id) => Some(format!("youtube://www.youtube.com/channel/{id}")),
        _ => None,
    }
}

const INSTAGRAM_RESERVED: &[&str] = &[
    "explore", "accounts", "about", "developer", "legal", "direct", "stories", "reels", "p",
    "reel", "tv",
];

fn instagram(_url: &Url, segments: &[&str]) -> Option<String> {
    match segments {
        [user] if !INSTAGRAM_RESERVED.contains(user) && is_handle(user) => {
            Some(format!("instagram://user?username={}", encode(user)))
        }
        _ => None,
    }
}

const TWITTER_RESERVED: &[&str] = &[
    "home",
    "explore",
    "search",
    "i",
    "settings",
    "messages",
    "notifications",
    "login",
    "signup",
    "intent",
    "share",
    "hashtag",
    "compose",
];

fn twitter(_url: &Url, segments: &[&str]) -> Option<String> {
    match segments {
        [user, ..] if TWITTER_RESERVED.contains(user) => None,
        [_, "status", id, ..] if id.chars().all(|c| c.is_ascii_digit()) => {
            Some(format!("twitter://status?id={id}"))
        }
        [user] if is_handle(user) => Some(format!("twitter://user?screen_name={}", encode(user))),
        _ => None,
    }
}

const SPOTIFY_TYPES: &[&str] = &[
    "track", "album", "playlist", "artist", "show", "episode",
];

fn spotify(_url: &Url, segments: &[&str]) -> Option<String> {
    // Localised URLs carry an `intl-xx` prefix segment.
    let segments = match segments {
        [first, rest @ ..] if first.starts_with("intl-") => rest,
        all => all,
    };

    match segments {
        [kind, id] if SPOTIFY_TYPES.contains(kind) && is_handle(id) => {
            Some(format!("spotify:{kind}:{id}"))
        }
        _ => None,
    }
}

fn linkedin(_url: &Url, segments: &[&str]) -> Option<String> {
    match segments {
        ["in", id] if is_handle(id) => Some(format!("linkedin://in/{id}")),
        ["company", id] if is_handle(id) => Some(format!("linkedin://company/{id}")),
        _ => None,
    }
}

fn facebook(url: &Url, segments: &[&str]) -> Option<String> {
    // Vanity paths are indistinguishable from pages like /groups or /events.
    match segments {
        ["profile.php"] => query_param(url, "id")
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
            .map(|id| format!("fb://profile/{id}")),
        _ => None,
    }
}

fn tiktok(_url: &Url, segments: &[&str]) -> Option<String> {
    match segments {
        [user, "video", id] if user.starts_with('@') && id.chars().all(|c| c.is_ascii_digit()) => {
            Some(format!("tiktok://video/{id}"))
        }
        [user] if user.starts_with('@') && is_handle(&user[1..]) => {
            Some(format!("tiktok://user?username={}", encode(&user[1..])))
        }
        _ => None,
    }
}

fn whatsapp(url: &Url, segments: &[&str]) -> Option<String> {
    let phone = match segments {
        [phone] => phone.trim_start_matches('+'),
        _ => return None,
    };
    if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut target = format!("whatsapp://send?phone={phone}");
    if let Some(text) = query_param(url, "text") {
        target.push_str("&text=");
        target.push_str(&encode(&text));
    }
    Some(target)
}

fn amazon(url: &Url, segments: &[&str]) -> Option<String> {
    let asin = match segments {
        [.., "dp", asin] | [.., "dp", asin, _] => *asin,
        ["gp", "product", asin, ..] => *asin,
        _ => return None,
    };
    if asin.len() != 10 || !asin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let host = url.host_str()?;
    Some(format!("com.amazon.mobile.shopping://{host}/dp/{asin}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ios(url: &str) -> Option<String> {
        translate(url, Platform::Ios)
    }

    fn android(url: &str) -> Option<String> {
        translate(url, Platform::Android)
    }

    #[test]
    fn test_youtube_variants() {
        assert_eq!(
            ios("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("youtube://watch?v=dQw4w9WgXcQ")
        );
        assert_eq!(
            ios("https://m.youtube.com/watch?v=abc123&t=10").as_deref(),
            Some("youtube://watch?v=abc123")
        );
        assert_eq!(
            ios("https://www.youtube.com/shorts/xyz").as_deref(),
            Some("youtube://shorts/xyz")
        );
        assert_eq!(
            ios("https://www.youtube.com/@creator").as_deref(),
            Some("youtube://www.youtube.com/@creator")
        );
        assert_eq!(ios("https://www.youtube.com/feed/trending"), None);
    }

    #[test]
    fn test_android_produces_intent_uri() {
        assert_eq!(
            android("https://www.youtube.com/watch?v=abc123").as_deref(),
            Some(
                "intent://www.youtube.com/watch?v=abc123#Intent;scheme=https;package=com.google.android.youtube;end"
            )
        );
        assert_eq!(
            android("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some(
                "intent://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC#Intent;scheme=https;package=com.spotify.music;end"
            )
        );
    }

    #[test]
    fn test_desktop_gets_no_deep_link() {
        assert_eq!(
            translate("https://youtu.be/dQw4w9WgXcQ", Platform::Other),
            None
        );
    }

    #[test]
    fn test_reserved_and_vanity_paths_are_not_translated() {
        assert_eq!(ios("https://www.instagram.com/explore"), None);
        assert_eq!(ios("https://x.com/home"), None);
        assert_eq!(ios("https://twitter.com/i/flow/login"), None);
        assert_eq!(ios("https://www.facebook.com/somebrand"), None);
        assert_eq!(android("https://www.facebook.com/somebrand"), None);
    }

    #[test]
    fn test_social_profiles() {
        assert_eq!(
            ios("https://www.instagram.com/natgeo/").as_deref(),
            Some("instagram://user?username=natgeo")
        );
        assert_eq!(
            ios("https://x.com/rustlang").as_deref(),
            Some("twitter://user?screen_name=rustlang")
        );
        assert_eq!(
            ios("https://twitter.com/rustlang/status/1234567890").as_deref(),
            Some("twitter://status?id=1234567890")
        );
        assert_eq!(
            ios("https://www.linkedin.com/in/jane-doe").as_deref(),
            Some("linkedin://in/jane-doe")
        );
        assert_eq!(
            ios("https://www.facebook.com/profile.php?id=100012345").as_deref(),
            Some("fb://profile/100012345")
        );
        assert_eq!(
            ios("https://www.tiktok.com/@dancer").as_deref(),
            Some("tiktok://user?username=dancer")
        );
        assert_eq!(
            ios("https://www.tiktok.com/@dancer/video/7234567890123").as_deref(),
            Some("tiktok://video/7234567890123")
        );
    }

    #[test]
    fn test_spotify_localised_url() {
        assert_eq!(
            ios("https://open.spotify.com/intl-de/album/1DFixLWuPkv3KT3TnV35m3").as_deref(),
            Some("spotify:album:1DFixLWuPkv3KT3TnV35m3")
        );
        assert_eq!(ios("https://open.spotify.com/search/jazz"), None);
    }

    #[test]
    fn test_whatsapp_and_amazon() {
        assert_eq!(
            ios("https://wa.me/15551234567?text=hello%20there").as_deref(),
            Some("whatsapp://send?phone=15551234567&text=hello+there")
        );
        assert_eq!(ios("https://wa.me/not-a-number"), None);

        assert_eq!(
            ios("https://www.amazon.de/Some-Product/dp/B08N5WRWNW/ref=sr_1_1").as_deref(),
            Some("com.amazon.mobile.shopping://www.amazon.de/dp/B08N5WRWNW")
        );
        assert_eq!(ios("https://www.amazon.com/gp/cart"), None);
    }

    #[test]
    fn test_unknown_host_and_non_web_scheme() {
        assert_eq!(ios("https://example.com/watch?v=1"), None);
        assert_eq!(ios("ftp://youtube.com/watch?v=1"), None);
        assert_eq!(ios("not a url"), None);
        assert_eq!(app_name("https://youtu.be/x"), Some("youtube"));
    }
}
