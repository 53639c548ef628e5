//! Pure client-domain logic.
//!
//! Payload validation and child-collection reconciliation live here, free of
//! I/O, so the write paths of every storage backend share one set of rules.

pub mod contacts;
pub mod membership;
pub mod payload;
pub mod reminders;
