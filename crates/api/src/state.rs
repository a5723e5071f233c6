use std::sync::Arc;
use std::time::Duration;

use leadflow_db::store::LeadStore;
use leadflow_events::LeadEventBus;

use crate::config::ServerConfig;
use crate::engine::{
    ActivityLogger, AssignmentEngine, LeadService, NotificationDispatcher, ReassignmentWorkflow,
};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (every field is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Record store (PostgreSQL in production, in-memory in tests).
    pub store: Arc<dyn LeadStore>,
    pub config: Arc<ServerConfig>,
    /// Lead-scoped event bus feeding the live WebSocket channel.
    pub event_bus: Arc<LeadEventBus>,
    pub activity: ActivityLogger,
    pub assignments: Arc<AssignmentEngine>,
    pub reassignments: Arc<ReassignmentWorkflow>,
    pub notifications: Arc<NotificationDispatcher>,
    pub leads: Arc<LeadService>,
}

impl AppState {
    /// Wire every engine component to the same store and event bus.
    pub fn new(
        store: Arc<dyn LeadStore>,
        config: Arc<ServerConfig>,
        event_bus: Arc<LeadEventBus>,
    ) -> Self {
        let timeout = Duration::from_secs(config.store_timeout_secs);
        let activity = ActivityLogger::new(Arc::clone(&store), timeout);

        let assignments = Arc::new(AssignmentEngine::new(
            Arc::clone(&store),
            activity.clone(),
            Arc::clone(&event_bus),
            timeout,
            config.bulk_policy,
        ));
        let reassignments = Arc::new(ReassignmentWorkflow::new(
            Arc::clone(&store),
            Arc::clone(&event_bus),
            timeout,
        ));
        let notifications = Arc::new(NotificationDispatcher::new(Arc::clone(&store), timeout));
        let leads = Arc::new(LeadService::new(Arc::clone(&store), activity.clone(), timeout));

        Self {
            store,
            config,
            event_bus,
            activity,
            assignments,
            reassignments,
            notifications,
            leads,
        }
    }
}
