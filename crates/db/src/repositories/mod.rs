//! Repository layer: one zero-sized struct per table.
//!
//! Every function takes `&mut PgConnection` so the same query runs inside a
//! transaction (`&mut *tx`) or on a plain pooled connection.

pub mod activity_repo;
pub mod assignment_repo;
pub mod lead_repo;
pub mod notification_repo;
pub mod reassign_permission_repo;
pub mod user_repo;

pub use activity_repo::ActivityRepo;
pub use assignment_repo::AssignmentRepo;
pub use lead_repo::LeadRepo;
pub use notification_repo::NotificationRepo;
pub use reassign_permission_repo::ReassignPermissionRepo;
pub use user_repo::UserRepo;
