//! HTTP surface for the conversation webhook.
//!
//! The platform POSTs one Dialogflow request per turn; the handler checks the
//! optional bearer token, runs the turn through [`Fulfillment`] and maps any
//! failure onto a JSON error body carrying the turn's correlation id.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bookcart_actions::{WebhookRequest, WebhookResponse};
use bookcart_core::{ApplicationError, InterfaceError};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::warn;

use crate::bootstrap::SharedFulfillment;

#[derive(Clone)]
pub struct WebhookState {
    fulfillment: SharedFulfillment,
    auth_token: Option<Arc<SecretString>>,
}

impl WebhookState {
    pub fn new(fulfillment: SharedFulfillment, auth_token: Option<SecretString>) -> Self {
        Self { fulfillment, auth_token: auth_token.map(Arc::new) }
    }
}

pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new().route(path, post(fulfill)).with_state(state)
}

async fn fulfill(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, WebhookError> {
    authorize(&headers, state.auth_token.as_deref())?;

    let Json(mut request) = payload.map_err(|rejection| {
        WebhookError::from(
            ApplicationError::MalformedRequest(rejection.body_text())
                .into_interface(uuid::Uuid::new_v4().to_string()),
        )
    })?;

    if request.response_id.trim().is_empty() {
        request.response_id = uuid::Uuid::new_v4().to_string();
    }
    let correlation_id = request.response_id.clone();

    let response = state
        .fulfillment
        .fulfill(request, Utc::now())
        .await
        .map_err(|error| ApplicationError::from(error).into_interface(correlation_id))?;

    Ok(Json(response))
}

fn authorize(headers: &HeaderMap, expected: Option<&SecretString>) -> Result<(), WebhookError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.expose_secret().as_bytes()) => {
            Ok(())
        }
        Some(_) => Err(unauthorized("invalid webhook token")),
        None => Err(unauthorized("missing bearer token")),
    }
}

fn unauthorized(message: &str) -> WebhookError {
    WebhookError(InterfaceError::Unauthorized {
        message: message.to_owned(),
        correlation_id: uuid::Uuid::new_v4().to_string(),
    })
}

/// Length leaks, content does not.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug)]
pub struct WebhookError(InterfaceError);

impl From<InterfaceError> for WebhookError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    correlation_id: &'a str,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "unauthorized"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        warn!(
            event_name = "server.webhook.rejected",
            correlation_id = %self.0.correlation_id(),
            status = status.as_u16(),
            error = %self.0,
            "webhook turn rejected"
        );

        // Server-side failure details stay in the logs.
        let message =
            if status.is_server_error() { self.0.user_message() } else { self.0.message() };

        let body = ErrorBody { error: code, message, correlation_id: self.0.correlation_id() };
        (status, Json(body)).into_response()
    }
}
