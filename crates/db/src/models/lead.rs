//! Lead entity model and DTOs.

use leadflow_core::error::CoreError;
use leadflow_core::lead::{ClosureStamp, LeadPriority, LeadStatus};
use leadflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: DbId,
    pub title: String,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: DbId,
    pub closed_by: Option<DbId>,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Lead {
    pub fn status(&self) -> Result<LeadStatus, CoreError> {
        self.status.parse()
    }

    pub fn closure(&self) -> ClosureStamp {
        ClosureStamp {
            closed_by: self.closed_by,
            closed_at: self.closed_at,
        }
    }
}

/// Validated values for a new lead. Status always starts at `New`.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub title: String,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: LeadPriority,
    pub notes: Option<String>,
    pub created_by: DbId,
}

/// Client DTO for creating a lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
    pub title: String,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

/// Client DTO for updating a lead. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLead {
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub due_date: Option<Timestamp>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}
