//! HTTP request handlers.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod redirect;
pub mod track_click;

pub use health::health_handler;
pub use redirect::{redirect_handler, redirect_password_handler};
pub use track_click::track_click_handler;
