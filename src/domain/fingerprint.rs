//! Daily-rotating visitor fingerprint.
//!
//! The fingerprint is `sha256(user_agent | ip | yyyy-mm-dd | salt)` rendered
//! as lowercase hex. The calendar date is part of the input so the same
//! visitor hashes differently every UTC day, and the raw IP never leaves
//! this function.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Computes the visitor id for one click.
pub fn visitor_id(user_agent: &str, ip: &str, at: DateTime<Utc>, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(at.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
