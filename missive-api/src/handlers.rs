//! Request handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use missive_common::{incoming, internal};
use missive_delivery::{NotificationError, NotificationService, NotificationStatus, SendRequest};
use missive_store::NotificationId;
use serde::Deserialize;
use serde_json::json;

pub type ServiceState = State<Arc<NotificationService>>;

/// A request that could not be served, rendered as JSON
#[derive(Debug)]
pub enum Failure {
    BadRequest(String),
    NotFound,
    Service(NotificationError),
}

impl From<NotificationError> for Failure {
    fn from(error: NotificationError) -> Self {
        Self::Service(error)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": error })),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "Notification not found" })),
            )
                .into_response(),
            Self::Service(NotificationError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "errors": errors })),
            )
                .into_response(),
            Self::Service(error) => {
                internal!(level = ERROR, "Request failed: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": error.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    status: Option<String>,
}

impl ListParams {
    /// An empty `status` means no filter
    fn status(&self) -> Result<Option<NotificationStatus>, Failure> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(status) => status.parse().map(Some).map_err(Failure::BadRequest),
        }
    }
}

fn parse_id(id: &str) -> Result<NotificationId, Failure> {
    id.parse().map_err(|_| Failure::NotFound)
}

pub async fn list(
    State(service): ServiceState,
    Query(params): Query<ListParams>,
) -> Result<Response, Failure> {
    let status = params.status()?;
    incoming!(level = DEBUG, "List notifications (status: {status:?})");

    let records = service.list(status).await?;
    Ok(Json(records).into_response())
}

pub async fn detail(
    State(service): ServiceState,
    Path(id): Path<String>,
) -> Result<Response, Failure> {
    let id = parse_id(&id)?;
    incoming!(level = DEBUG, "Get notification {id}");

    let record = service.get(&id).await?.ok_or(Failure::NotFound)?;
    Ok(Json(record).into_response())
}

pub async fn delete(
    State(service): ServiceState,
    Path(id): Path<String>,
) -> Result<Response, Failure> {
    let id = parse_id(&id)?;
    incoming!(level = DEBUG, "Delete notification {id}");

    if service.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(Failure::NotFound)
    }
}

pub async fn send(
    State(service): ServiceState,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Response, Failure> {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "errors": { "non_field_errors": [rejection.body_text()] },
                })),
            )
                .into_response());
        }
    };

    incoming!(level = DEBUG, "Send notification request");

    let outcome = service.send_request(&request).await?;

    Ok(if outcome.success {
        (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Notification sent successfully",
                "notification": outcome.record,
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to send notification",
                "error": outcome.error,
                "notification": outcome.record,
            })),
        )
            .into_response()
    })
}

pub async fn statistics(State(service): ServiceState) -> Result<Response, Failure> {
    incoming!(level = DEBUG, "Notification statistics");

    let stats = service.statistics().await?;
    Ok(Json(stats).into_response())
}

pub async fn liveness() -> Response {
    (StatusCode::OK, "OK").into_response()
}
