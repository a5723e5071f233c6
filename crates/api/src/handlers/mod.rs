pub mod activity;
pub mod assign;
pub mod lead;
pub mod notification;
