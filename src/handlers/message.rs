//! Message CRUD handlers.
//!
//! Every handler performs at most two store calls: one against the
//! key-value store (the source of truth) and one against the object store
//! (the blob mirror). Dual-write policy:
//!
//! - create: KV put, then mirror put; a failed mirror write rolls back the
//!   fresh KV record and fails the request
//! - update: conditional KV update, then mirror overwrite; a failed mirror
//!   write fails the request (the update is idempotent, retries converge)
//! - delete: conditional KV delete, then best-effort mirror delete

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::kv::store::MessageRecord;
use crate::metrics::{MESSAGES_CREATED_TOTAL, MESSAGES_DELETED_TOTAL};
use crate::AppState;

/// Placeholder body used when a create request omits the `message` field.
pub const DEFAULT_MESSAGE: &str = "Say Hi to Isha!";

/// Object-store key for a message id.
fn object_key(id: &str) -> String {
    format!("{id}.txt")
}

// -- Payloads ------------------------------------------------------------------

/// JSON body accepted by create and update requests.
#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    /// Message text. Optional on create (falls back to the placeholder),
    /// required on update.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response to a successful create.
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    /// Echo of the submitted text.
    pub response: String,
    /// The server-generated id of the new message.
    pub id: String,
}

/// Response to a successful update or delete.
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub response: String,
}

// -- Handlers ------------------------------------------------------------------

/// ListMessages -- `GET /get` with no parameters.
///
/// Unbounded scan of every stored record, arbitrary order.
#[utoipa::path(
    get,
    path = "/get",
    tag = "Message",
    operation_id = "ListMessages",
    responses(
        (status = 200, description = "Array of all stored messages"),
        (status = 400, description = "Unknown query parameter")
    )
)]
pub async fn list_messages(state: Arc<AppState>) -> Result<Response, ApiError> {
    let records = state.kv.list_messages().await?;
    Ok((StatusCode::OK, Json(records)).into_response())
}

/// GetMessage -- `GET /get/{id}` or `GET /get?id={id}`.
#[utoipa::path(
    get,
    path = "/get/{id}",
    tag = "Message",
    operation_id = "GetMessage",
    responses(
        (status = 200, description = "The message with the given id"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn get_message(state: Arc<AppState>, id: &str) -> Result<Response, ApiError> {
    match state.kv.get_message(id).await? {
        Some(record) => Ok((StatusCode::OK, Json(record)).into_response()),
        None => Err(ApiError::NotFound),
    }
}

/// CreateMessage -- `POST /post`.
///
/// Generates a fresh id on every call; a caller-supplied `id` field is
/// ignored, so duplicate ids cannot occur.
#[utoipa::path(
    post,
    path = "/post",
    tag = "Message",
    operation_id = "CreateMessage",
    responses(
        (status = 200, description = "Echo of the message plus the generated id"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn create_message(
    state: Arc<AppState>,
    payload: MessagePayload,
) -> Result<Response, ApiError> {
    let message = payload
        .message
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
    let id = Uuid::new_v4().to_string();

    state
        .kv
        .put_message(MessageRecord {
            id: id.clone(),
            message: message.clone(),
        })
        .await?;

    if let Err(e) = state
        .objects
        .put(&object_key(&id), Bytes::from(message.clone().into_bytes()))
        .await
    {
        // Mirror write failed: roll back the fresh record.
        if let Err(cleanup) = state.kv.delete_message(&id).await {
            warn!("rollback of record {id} failed: {cleanup}");
        }
        return Err(ApiError::Internal(e));
    }

    info!("created message {id}");
    metrics::counter!(MESSAGES_CREATED_TOTAL).increment(1);

    Ok((
        StatusCode::OK,
        Json(CreateResponse {
            response: format!("You sent: {message}"),
            id,
        }),
    )
        .into_response())
}

/// UpdateMessage -- `PUT /put/{id}`.
///
/// The target id must already exist; the KV update is conditional.
#[utoipa::path(
    put,
    path = "/put/{id}",
    tag = "Message",
    operation_id = "UpdateMessage",
    responses(
        (status = 200, description = "Update confirmation"),
        (status = 400, description = "Missing message field"),
        (status = 404, description = "Message not found"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn update_message(
    state: Arc<AppState>,
    id: &str,
    payload: MessagePayload,
) -> Result<Response, ApiError> {
    let message = payload.message.ok_or(ApiError::MissingMessage)?;

    let updated = state.kv.update_message(id, &message).await?;
    if !updated {
        return Err(ApiError::NotFound);
    }

    state
        .objects
        .put(&object_key(id), Bytes::from(message.into_bytes()))
        .await?;

    info!("updated message {id}");

    Ok((
        StatusCode::OK,
        Json(ConfirmationResponse {
            response: "Yayy! Updated!".to_string(),
        }),
    )
        .into_response())
}

/// DeleteMessage -- `DELETE /delete/{id}` or `DELETE /delete?id={id}`.
///
/// The KV delete is conditional; the mirror delete is best-effort and a
/// missing blob never fails the request.
#[utoipa::path(
    delete,
    path = "/delete/{id}",
    tag = "Message",
    operation_id = "DeleteMessage",
    responses(
        (status = 200, description = "Delete confirmation"),
        (status = 404, description = "Message not found"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn delete_message(state: Arc<AppState>, id: &str) -> Result<Response, ApiError> {
    let deleted = state.kv.delete_message(id).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }

    if let Err(e) = state.objects.delete(&object_key(id)).await {
        warn!("mirror delete of {} failed: {e}", object_key(id));
    }

    info!("deleted message {id}");
    metrics::counter!(MESSAGES_DELETED_TOTAL).increment(1);

    Ok((
        StatusCode::OK,
        Json(ConfirmationResponse {
            response: "Yayy! Message deleted!".to_string(),
        }),
    )
        .into_response())
}

// -- Tests -----------------------------------------------------------------------
