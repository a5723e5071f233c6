//! Live lead events.
//!
//! - [`LeadEventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LeadEvent`]: the envelope pushed to clients watching a lead's
//!   channel (`lead_{id}`).

pub mod bus;

pub use bus::{channel_name, event_types, LeadEvent, LeadEventBus, LeadSubscription};
