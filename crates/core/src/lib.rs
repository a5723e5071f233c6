//! Domain rules for the lead management backend.
//!
//! This crate has no I/O and no internal dependencies so the rules it holds
//! (role ordering, the override gate, the reassignment state machine, the
//! closure-stamp rule) can be used by the storage layer, the HTTP layer and
//! tests alike.

pub mod activity;
pub mod assignment;
pub mod error;
pub mod lead;
pub mod reassignment;
pub mod roles;
pub mod types;
