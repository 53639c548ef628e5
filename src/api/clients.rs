//! `/client` handlers: create, read, update, deactivate.
//!
//! Handlers own the error mapping: payload rejections are 400, lookup misses
//! are 404, referential conflicts are 409, everything else is a logged 500
//! with a generic body.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::server::AppState;
use crate::api::types::{ClientQuery, CreateClientsRequest, DeactivateResponse, ErrorResponse};
use crate::clients::payload::{PayloadError, UpdateClientPayload, normalize_create, normalize_update};
use crate::db::ClientAggregate;
use crate::error::DatabaseError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payload_error(err: PayloadError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&err.to_string())))
}

fn db_error(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::Conflict(detail) => (StatusCode::CONFLICT, Json(ErrorResponse { error: detail })),
        other => {
            tracing::error!("database error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal server error")),
            )
        }
    }
}

fn client_not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Client not found")),
    )
}

fn parse_query_id(query: &ClientQuery) -> Result<Option<Uuid>, ApiError> {
    match query.id.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(&format!("invalid client id '{}'", raw))),
            )
        }),
    }
}

/// `POST /client`: create every valid `clientN` entry in one transaction.
pub async fn create_clients_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateClientsRequest>,
) -> Result<(StatusCode, Json<Vec<ClientAggregate>>), ApiError> {
    let batch = normalize_create(request.client_group_id.as_deref(), &request.entries)
        .map_err(payload_error)?;
    let created = state.db.create_clients(&batch).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /client`: one joined client when `id` is supplied, otherwise all of
/// them.
pub async fn get_clients_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientQuery>,
) -> Result<Response, ApiError> {
    match parse_query_id(&query)? {
        Some(client_id) => {
            let aggregate = state
                .db
                .get_client(client_id)
                .await
                .map_err(db_error)?
                .ok_or_else(client_not_found)?;
            Ok(Json(aggregate).into_response())
        }
        None => {
            let clients = state.db.list_clients().await.map_err(db_error)?;
            Ok(Json(clients).into_response())
        }
    }
}

/// `PUT /client`: update scalars and replace whichever collections the body
/// carries, in one transaction.
pub async fn update_client_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<Json<ClientAggregate>, ApiError> {
    let (client_id, params) = normalize_update(payload).map_err(payload_error)?;
    let updated = state
        .db
        .update_client(client_id, &params)
        .await
        .map_err(db_error)?
        .ok_or_else(client_not_found)?;
    Ok(Json(updated))
}

/// `DELETE /client?id=`: soft delete, repeatable.
pub async fn deactivate_client_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    let Some(client_id) = parse_query_id(&query)? else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("'id' is required")),
        ));
    };
    let client = state
        .db
        .deactivate_client(client_id)
        .await
        .map_err(db_error)?
        .ok_or_else(client_not_found)?;
    Ok(Json(DeactivateResponse {
        message: "Client deactivated successfully",
        client,
    }))
}
