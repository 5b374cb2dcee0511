//! Visitor facts read from request headers.
//!
//! Proxy headers are only trusted when the service runs behind a reverse
//! proxy (`BEHIND_PROXY=true`); otherwise the socket peer address is used.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

use crate::domain::geo::normalize_country;

/// Country headers set by common edge networks, in priority order.
const COUNTRY_HEADERS: &[&str] = &["cf-ipcountry", "x-vercel-ip-country", "x-country-code"];

/// Values edges use for "unknown" or Tor exits.
const UNKNOWN_COUNTRIES: &[&str] = &["XX", "T1"];

/// Resolves the client IP.
///
/// Behind a proxy the order is `CF-Connecting-IP`, the first `X-Forwarded-For`
/// entry, then `X-Real-IP`, falling back to the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, behind_proxy: bool) -> Option<String> {
    if behind_proxy {
        let from_headers = header_ip(headers, "cf-connecting-ip")
            .or_else(|| {
                header_str(headers, "x-forwarded-for")
                    .and_then(|v| v.split(',').next())
                    .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
            })
            .or_else(|| header_ip(headers, "x-real-ip"));

        if let Some(ip) = from_headers {
            return Some(ip.to_string());
        }
    }

    peer.map(|ip| ip.to_string())
}

/// Country supplied by an edge network, upper-case.
pub fn edge_country(headers: &HeaderMap) -> Option<String> {
    COUNTRY_HEADERS
        .iter()
        .filter_map(|name| header_str(headers, name))
        .filter_map(normalize_country)
        .find(|code| !UNKNOWN_COUNTRIES.contains(&code.as_str()))
}

/// First language tag of `Accept-Language`, without its quality value.
pub fn primary_language(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::ACCEPT_LANGUAGE.as_str())?
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::USER_AGENT.as_str()).map(str::to_string)
}

pub fn referrer(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::REFERER.as_str()).map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    header_str(headers, name).and_then(|v| v.parse().ok())
}
