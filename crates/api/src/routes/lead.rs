//! Route definitions for the `/leads` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::lead;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/leads`.
///
/// ```text
/// GET    /               -> list_leads
/// POST   /               -> create_lead
/// GET    /{id}           -> get_lead
/// PUT    /{id}           -> update_lead
/// DELETE /{id}           -> delete_lead
/// PATCH  /{id}/status    -> update_status
/// GET    /{id}/live      -> WebSocket upgrade
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(lead::list_leads).post(lead::create_lead))
        .route(
            "/{id}",
            get(lead::get_lead)
                .put(lead::update_lead)
                .delete(lead::delete_lead),
        )
        .route("/{id}/status", patch(lead::update_status))
        .route("/{id}/live", get(ws::live_handler))
}
