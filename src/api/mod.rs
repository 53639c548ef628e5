//! HTTP surface: the axum server, bearer auth, and the `/client` handlers.

pub mod auth;
pub mod clients;
pub mod server;
pub mod types;
