//! Visitor-facing HTML pages.
//!
//! Uses Askama templates (`templates/`) for server-side rendering of the
//! password challenge, the open-in-app interstitial and resolution errors.

pub mod pages;
