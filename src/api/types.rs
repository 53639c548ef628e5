//! Request and response shapes for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::ClientRecord;

/// Body of `POST /client`: the shared group id plus client entries keyed
/// `client1`, `client2`, ... Entries stay raw JSON here; the payload
/// normalizer decides which of them survive.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientsRequest {
    #[serde(default)]
    pub client_group_id: Option<String>,
    #[serde(flatten)]
    pub entries: Map<String, Value>,
}

/// Query string of `GET /client` and `DELETE /client`.
#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Body of a successful `DELETE /client`.
#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub message: &'static str,
    pub client: ClientRecord,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}
