//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert DTOs the store accepts. Enum-like
//! columns are kept as their stored strings and parsed through
//! `leadflow_core` where a rule needs the typed value.

pub mod activity;
pub mod assignment;
pub mod lead;
pub mod notification;
pub mod reassign_permission;
pub mod user;
