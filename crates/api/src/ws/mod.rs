//! Live per-lead event stream over WebSocket.
//!
//! Clients connect to `/api/v1/leads/{id}/live?token=<jwt>` and receive every
//! [`LeadEvent`](leadflow_events::LeadEvent) published for that lead as a
//! JSON text frame.

mod live;

pub use live::{live_handler, LiveQuery};
