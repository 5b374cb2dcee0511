//! Coarse user-agent classification.
//!
//! Only what the engine needs: the app ecosystem (for smart redirects and deep
//! links) and the device / OS / browser labels stored with click events.

use regex::Regex;
use std::sync::LazyLock;

static IOS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iphone|ipad|ipod").unwrap());
static TABLET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ipad|tablet|kindle|silk|playbook").unwrap());
static OTHER_MOBILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mobile|opera mini|iemobile|blackberry|windows phone|webos").unwrap()
});
static BOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bot\b|crawler|spider|slurp|facebookexternalhit|embedly|preview").unwrap()
});

/// App ecosystem of the visiting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Other,
}

/// Form factor stored with click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Bot => "bot",
        }
    }
}

/// Parsed view of a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub platform: Platform,
    pub device: DeviceType,
    pub os: &'static str,
    pub browser: &'static str,
}

impl UserAgentInfo {
    /// Classifies a user agent; a missing header is an unknown desktop client.
    pub fn parse(user_agent: Option<&str>) -> Self {
        let ua = user_agent.unwrap_or_default();

        let platform = if IOS_REGEX.is_match(ua) {
            Platform::Ios
        } else if ua.to_ascii_lowercase().contains("android") {
            Platform::Android
        } else {
            Platform::Other
        };

        let device = if BOT_REGEX.is_match(ua) {
            DeviceType::Bot
        } else if TABLET_REGEX.is_match(ua)
            || (platform == Platform::Android && !ua.contains("Mobile"))
        {
            DeviceType::Tablet
        } else if platform != Platform::Other || OTHER_MOBILE_REGEX.is_match(ua) {
            DeviceType::Mobile
        } else {
            DeviceType::Desktop
        };

        Self {
            platform,
            device,
            os: detect_os(ua, platform),
            browser: detect_browser(ua),
        }
    }

    /// Phones and tablets of any ecosystem.
    pub fn is_mobile(&self) -> bool {
        matches!(self.device, DeviceType::Mobile | DeviceType::Tablet)
    }
}

fn detect_os(ua: &str, platform: Platform) -> &'static str {
    match platform {
        Platform::Ios => "iOS",
        Platform::Android => "Android",
        Platform::Other => {
            if ua.contains("Windows") {
                "Windows"
            } else if ua.contains("CrOS") {
                "ChromeOS"
            } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
                "macOS"
            } else if ua.contains("Linux") {
                "Linux"
            } else {
                "Unknown"
            }
        }
    }
}

fn detect_browser(ua: &str) -> &'static str {
    // Order matters: most Chromium derivatives also advertise Chrome and Safari.
    if ua.contains("Instagram") {
        "Instagram"
    } else if ua.contains("FBAN") || ua.contains("FBAV") {
        "Facebook"
    } else if ua.contains("Edg/") || ua.contains("EdgA/") || ua.contains("EdgiOS/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("SamsungBrowser") {
        "Samsung Internet"
    } else if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        "Firefox"
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        "Unknown"
    }
}
