//! Transactional client-aggregate engine for a practice backoffice.
//!
//! A client is stored as one root row plus three owned child collections
//! (contact methods, reminder preferences, group membership) that are always
//! written together in a single transaction and always read back fully
//! joined. The HTTP surface is a single `/client` resource carrying create,
//! read, update, and deactivate.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod settings;
