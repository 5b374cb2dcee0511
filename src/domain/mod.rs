//! Domain layer containing business entities and logic.
//!
//! Everything here is independent of HTTP, SQL and Redis. The decision
//! pipeline is a chain of pure functions over a [`entities::Link`]:
//!
//! 1. [`policy::evaluate`] - lifecycle, click limit, widget and password checks
//! 2. [`variant::select_destination`] - A/B, device and geo overrides
//! 3. [`deep_link::translate`] - native-app URI for the chosen destination
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`user_agent`] - Platform and device classification
//! - [`fingerprint`] - Daily-rotating visitor id
//! - [`geo`] - IP geolocation seam
//! - [`click_job`] - Queued unit of click recording work
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. The redirect orchestrator builds a [`click_job::ClickJob`]
//! 2. The job is pushed to a bounded channel (non-blocking)
//! 3. [`click_worker::run_click_worker`] hands it to a [`click_worker::ClickHandler`]
//! 4. The handler walks the recording fallback chain

pub mod click_job;
pub mod click_worker;
pub mod deep_link;
pub mod entities;
pub mod fingerprint;
pub mod geo;
pub mod policy;
pub mod repositories;
pub mod user_agent;
pub mod variant;
