//! Click recording channels, in fallback order.
//!
//! - [`HttpTrackingChannel`] - POST to the tracking API (primary)
//! - [`StoreChannel`] - direct append to the click store (secondary)
//! - [`MinimalStoreChannel`] - last-resort minimal append (tertiary)

mod http_channel;
mod store_channel;

pub use http_channel::{HttpTrackingChannel, TRACKING_API_CHANNEL};
pub use store_channel::{MinimalStoreChannel, StoreChannel};
