//! Lead status and priority values, and the closure-stamp rule.
//!
//! Status and priority are stored as their display strings (`"In Progress"`,
//! `"High"`) but accepted case-insensitively from clients.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

pub const STATUS_NEW: &str = "New";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_CLOSED: &str = "Closed";

pub const PRIORITY_HIGH: &str = "High";
pub const PRIORITY_MEDIUM: &str = "Medium";
pub const PRIORITY_LOW: &str = "Low";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadStatus {
    New,
    InProgress,
    Closed,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => STATUS_NEW,
            LeadStatus::InProgress => STATUS_IN_PROGRESS,
            LeadStatus::Closed => STATUS_CLOSED,
        }
    }

    pub fn is_closed(self) -> bool {
        self == LeadStatus::Closed
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "in progress" => Ok(LeadStatus::InProgress),
            "closed" => Ok(LeadStatus::Closed),
            _ => Err(CoreError::Validation(format!(
                "Invalid status '{s}'. Must be one of: {STATUS_NEW}, {STATUS_IN_PROGRESS}, {STATUS_CLOSED}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl LeadPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadPriority::High => PRIORITY_HIGH,
            LeadPriority::Medium => PRIORITY_MEDIUM,
            LeadPriority::Low => PRIORITY_LOW,
        }
    }
}

impl FromStr for LeadPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(LeadPriority::High),
            "medium" => Ok(LeadPriority::Medium),
            "low" => Ok(LeadPriority::Low),
            _ => Err(CoreError::Validation(format!(
                "Invalid priority '{s}'. Must be one of: {PRIORITY_HIGH}, {PRIORITY_MEDIUM}, {PRIORITY_LOW}"
            ))),
        }
    }
}

/// Who closed a lead and when. Both halves are set together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureStamp {
    pub closed_by: Option<DbId>,
    pub closed_at: Option<Timestamp>,
}

impl ClosureStamp {
    pub const OPEN: ClosureStamp = ClosureStamp {
        closed_by: None,
        closed_at: None,
    };

    /// Compute the stamp after a status change.
    ///
    /// - entering `Closed` stamps `actor` and `now`
    /// - staying `Closed` keeps `previous` (re-stamping only if it was incomplete)
    /// - any other status clears the stamp
    pub fn after_transition(
        previous_status: LeadStatus,
        next_status: LeadStatus,
        previous: ClosureStamp,
        actor: DbId,
        now: Timestamp,
    ) -> ClosureStamp {
        if !next_status.is_closed() {
            return ClosureStamp::OPEN;
        }
        if previous_status.is_closed() && previous.is_complete() {
            return previous;
        }
        ClosureStamp {
            closed_by: Some(actor),
            closed_at: Some(now),
        }
    }

    fn is_complete(&self) -> bool {
        self.closed_by.is_some() && self.closed_at.is_some()
    }
}

/// Whether a lead row satisfies the closure invariant.
pub fn closure_is_consistent(status: LeadStatus, stamp: &ClosureStamp) -> bool {
    match (stamp.closed_by, stamp.closed_at) {
        (Some(_), Some(_)) => status.is_closed(),
        (None, None) => !status.is_closed(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("closed".parse::<LeadStatus>().unwrap(), LeadStatus::Closed);
        assert_eq!("IN PROGRESS".parse::<LeadStatus>().unwrap(), LeadStatus::InProgress);
        assert_eq!(" New ".parse::<LeadStatus>().unwrap(), LeadStatus::New);
        assert!("archived".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn priority_parsing_is_case_insensitive() {
        assert_eq!("hIgH".parse::<LeadPriority>().unwrap(), LeadPriority::High);
        assert_eq!("low".parse::<LeadPriority>().unwrap(), LeadPriority::Low);
        assert!("urgent".parse::<LeadPriority>().is_err());
        assert_eq!(LeadPriority::default(), LeadPriority::Medium);
    }

    #[test]
    fn entering_closed_stamps_actor_and_time() {
        let now = Utc::now();
        let stamp = ClosureStamp::after_transition(
            LeadStatus::InProgress,
            LeadStatus::Closed,
            ClosureStamp::OPEN,
            7,
            now,
        );
        assert_eq!(stamp.closed_by, Some(7));
        assert_eq!(stamp.closed_at, Some(now));
        assert!(closure_is_consistent(LeadStatus::Closed, &stamp));
    }

    #[test]
    fn staying_closed_keeps_original_stamp() {
        let earlier = Utc::now() - Duration::days(2);
        let previous = ClosureStamp {
            closed_by: Some(3),
            closed_at: Some(earlier),
        };
        let stamp = ClosureStamp::after_transition(
            LeadStatus::Closed,
            LeadStatus::Closed,
            previous,
            9,
            Utc::now(),
        );
        assert_eq!(stamp, previous);
    }

    #[test]
    fn reopening_clears_the_stamp() {
        let previous = ClosureStamp {
            closed_by: Some(3),
            closed_at: Some(Utc::now()),
        };
        let stamp = ClosureStamp::after_transition(
            LeadStatus::Closed,
            LeadStatus::New,
            previous,
            3,
            Utc::now(),
        );
        assert_eq!(stamp, ClosureStamp::OPEN);
        assert!(closure_is_consistent(LeadStatus::New, &stamp));
    }

    #[test]
    fn half_set_stamp_is_inconsistent() {
        let stamp = ClosureStamp {
            closed_by: Some(1),
            closed_at: None,
        };
        assert!(!closure_is_consistent(LeadStatus::Closed, &stamp));
        assert!(!closure_is_consistent(LeadStatus::New, &stamp));
    }
}
