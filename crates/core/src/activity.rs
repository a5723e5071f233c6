//! Activity-log action names and detail text.
//!
//! Entries are append-only. The lead title is captured as a snapshot at the
//! time of the action so history survives later edits or deletion.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::DbId;

pub const ACTION_CREATED: &str = "CREATED";
pub const ACTION_UPDATED: &str = "UPDATED";
pub const ACTION_CLOSED: &str = "CLOSED";
pub const ACTION_DELETED: &str = "DELETED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Created,
    Updated,
    Closed,
    Deleted,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Created => ACTION_CREATED,
            ActivityAction::Updated => ACTION_UPDATED,
            ActivityAction::Closed => ACTION_CLOSED,
            ActivityAction::Deleted => ACTION_DELETED,
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ACTION_CREATED => Ok(ActivityAction::Created),
            ACTION_UPDATED => Ok(ActivityAction::Updated),
            ACTION_CLOSED => Ok(ActivityAction::Closed),
            ACTION_DELETED => Ok(ActivityAction::Deleted),
            other => Err(CoreError::Validation(format!("Unknown activity action '{other}'"))),
        }
    }
}

/// Fallback display name when a user row cannot be resolved.
pub fn unknown_user_label(user_id: DbId) -> String {
    format!("user #{user_id}")
}

/// `"Lead assigned to Alice, Bob"`
pub fn assigned_details(assignee_names: &[String]) -> String {
    format!("Lead assigned to {}", assignee_names.join(", "))
}

/// `"Lead bulk assigned to Alice, Bob"`
pub fn bulk_assigned_details(assignee_names: &[String]) -> String {
    format!("Lead bulk assigned to {}", assignee_names.join(", "))
}

pub fn unassigned_details(user_name: &str) -> String {
    format!("Removed {user_name} from lead")
}

pub fn status_changed_details(from: &str, to: &str) -> String {
    format!("Status changed from {from} to {to}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip_through_parse() {
        for action in [
            ActivityAction::Created,
            ActivityAction::Updated,
            ActivityAction::Closed,
            ActivityAction::Deleted,
        ] {
            assert_eq!(action.as_str().parse::<ActivityAction>().unwrap(), action);
        }
        assert!("created".parse::<ActivityAction>().is_err());
    }

    #[test]
    fn assignment_details_list_names_in_order() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        assert_eq!(assigned_details(&names), "Lead assigned to Alice, Bob");
        assert_eq!(bulk_assigned_details(&names), "Lead bulk assigned to Alice, Bob");
    }

    #[test]
    fn unknown_user_label_names_the_id() {
        assert_eq!(unknown_user_label(42), "user #42");
        assert_eq!(unassigned_details("user #42"), "Removed user #42 from lead");
    }
}
