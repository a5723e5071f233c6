//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Every event belongs to one lead. Clients watch a single lead through
//! [`LeadEventBus::subscribe_lead`], which filters the shared stream down to
//! that lead's channel.

use chrono::{DateTime, Utc};
use leadflow_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Event names published on the bus.
pub mod event_types {
    pub const LEAD_ASSIGNED: &str = "lead.assigned";
    pub const LEAD_UNASSIGNED: &str = "lead.unassigned";
    pub const REASSIGN_REQUESTED: &str = "lead.reassign_requested";
    pub const REASSIGN_DECIDED: &str = "lead.reassign_decided";
}

/// Name of the per-lead channel clients join.
pub fn channel_name(lead_id: DbId) -> String {
    format!("lead_{lead_id}")
}

// ---------------------------------------------------------------------------
// LeadEvent
// ---------------------------------------------------------------------------

/// Something that happened to a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadEvent {
    pub lead_id: DbId,

    /// Dot-separated event name, one of [`event_types`].
    pub event_type: String,

    pub actor_user_id: Option<DbId>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(lead_id: DbId, event_type: impl Into<String>) -> Self {
        Self {
            lead_id,
            event_type: event_type.into(),
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn channel(&self) -> String {
        channel_name(self.lead_id)
    }
}

// ---------------------------------------------------------------------------
// LeadEventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus, shared via `Arc<LeadEventBus>`.
pub struct LeadEventBus {
    sender: broadcast::Sender<LeadEvent>,
}

impl LeadEventBus {
    /// When the buffer is full the oldest events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody
    /// is listening.
    pub fn publish(&self, event: LeadEvent) {
        tracing::debug!(
            channel = %event.channel(),
            event_type = %event.event_type,
            "Publishing lead event",
        );
        let _ = self.sender.send(event);
    }

    /// Every event, for every lead.
    pub fn subscribe(&self) -> broadcast::Receiver<LeadEvent> {
        self.sender.subscribe()
    }

    /// Only events for `lead_id`.
    pub fn subscribe_lead(&self, lead_id: DbId) -> LeadSubscription {
        LeadSubscription {
            lead_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for LeadEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiver filtered to one lead's channel.
pub struct LeadSubscription {
    lead_id: DbId,
    receiver: broadcast::Receiver<LeadEvent>,
}

impl LeadSubscription {
    pub fn lead_id(&self) -> DbId {
        self.lead_id
    }

    /// Next event for this lead, or `None` once the bus is gone.
    ///
    /// Lagged receivers skip what they missed and keep going.
    pub async fn recv(&mut self) -> Option<LeadEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.lead_id == self.lead_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(lead_id = self.lead_id, skipped, "Lead subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lead_subscription_filters_other_leads() {
        let bus = LeadEventBus::default();
        let mut sub = bus.subscribe_lead(2);

        bus.publish(LeadEvent::new(1, event_types::LEAD_ASSIGNED));
        bus.publish(
            LeadEvent::new(2, event_types::REASSIGN_DECIDED)
                .with_actor(7)
                .with_payload(serde_json::json!({"status": "ACCEPTED"})),
        );

        let event = sub.recv().await.expect("should receive lead 2 event");
        assert_eq!(event.lead_id, 2);
        assert_eq!(event.event_type, "lead.reassign_decided");
        assert_eq!(event.actor_user_id, Some(7));
        assert_eq!(event.payload["status"], "ACCEPTED");
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = LeadEventBus::default();
        let mut all = bus.subscribe();
        let mut one = bus.subscribe_lead(5);

        bus.publish(LeadEvent::new(5, event_types::LEAD_UNASSIGNED));

        assert_eq!(all.recv().await.unwrap().lead_id, 5);
        assert_eq!(one.recv().await.unwrap().event_type, "lead.unassigned");
    }

    #[tokio::test]
    async fn subscription_ends_when_bus_drops() {
        let bus = LeadEventBus::default();
        let mut sub = bus.subscribe_lead(1);
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        LeadEventBus::default().publish(LeadEvent::new(1, event_types::LEAD_ASSIGNED));
    }

    #[test]
    fn channel_names_follow_lead_prefix() {
        assert_eq!(channel_name(42), "lead_42");
        assert_eq!(LeadEvent::new(3, "x").channel(), "lead_3");
    }
}
