//! Binding between a customer-owned hostname and its owner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a custom domain; only `Active` bindings affect routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingStatus {
    Active,
    Pending,
    Disabled,
}

impl BindingStatus {
    /// Parses the stored status; unknown values are treated as disabled.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "pending" => Self::Pending,
            _ => Self::Disabled,
        }
    }
}

/// What the root path of a custom domain should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Links,
    Storefront,
    BioPage,
}

impl TargetType {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "storefront" | "store" => Self::Storefront,
            "bio_page" | "bio" => Self::BioPage,
            _ => Self::Links,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Links => "links",
            Self::Storefront => "storefront",
            Self::BioPage => "bio_page",
        };
        f.write_str(s)
    }
}

/// A customer domain pointed at the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBinding {
    pub domain: String,
    pub owner_id: i64,
    pub status: BindingStatus,
    pub target_type: TargetType,
}

impl DomainBinding {
    pub fn is_active(&self) -> bool {
        self.status == BindingStatus::Active
    }
}
