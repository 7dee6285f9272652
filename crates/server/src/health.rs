use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bookcart_actions::SessionStore;
use bookcart_core::i18n::SUPPORTED_LOCALES;
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::SharedFulfillment;

#[derive(Clone)]
pub struct HealthState {
    fulfillment: SharedFulfillment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalogs: HealthCheck,
    pub locales: Vec<&'static str>,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(fulfillment: SharedFulfillment) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { fulfillment })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalogs = catalog_check(&state.fulfillment);
    let ready = catalogs.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "bookcart-server runtime initialized".to_string(),
        },
        catalogs,
        locales: state
            .fulfillment
            .catalogs()
            .loaded_locales()
            .into_iter()
            .map(|locale| locale.as_str())
            .collect(),
        active_sessions: state.fulfillment.sessions().len().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(fulfillment: &SharedFulfillment) -> HealthCheck {
    let catalogs = fulfillment.catalogs();
    let empty: Vec<&str> = SUPPORTED_LOCALES
        .iter()
        .filter(|locale| catalogs.catalog(**locale).is_empty())
        .map(|locale| locale.as_str())
        .collect();

    if empty.is_empty() {
        HealthCheck {
            status: "ready",
            detail: format!("{} locale catalogs loaded", SUPPORTED_LOCALES.len()),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("no strings loaded for {}", empty.join(", ")),
        }
    }
}
