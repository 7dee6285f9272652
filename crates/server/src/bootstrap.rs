use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bookcart_actions::{default_dispatcher, Fulfillment, InMemorySessionStore};
use bookcart_core::config::AppConfig;
use bookcart_core::i18n::{CatalogError, Catalogs};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{health, webhook};

pub type SharedFulfillment = Arc<Fulfillment<InMemorySessionStore>>;

pub struct Application {
    pub config: AppConfig,
    pub fulfillment: SharedFulfillment,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("locale catalogs failed to load: {0}")]
    Catalogs(#[from] CatalogError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        default_locale = %config.locale.default,
        "starting application bootstrap"
    );

    let catalogs = Arc::new(Catalogs::embedded(config.locale.default)?);
    info!(
        event_name = "system.bootstrap.catalogs_loaded",
        correlation_id = "bootstrap",
        locales = catalogs.loaded_locales().len(),
        "locale catalogs loaded"
    );

    let dispatcher = default_dispatcher();
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "intent handlers registered"
    );

    let fulfillment = Arc::new(Fulfillment::new(
        dispatcher,
        catalogs,
        config.transactions.clone(),
        InMemorySessionStore::with_idle_timeout(Duration::from_secs(
            config.server.session_idle_secs,
        )),
    ));

    Ok(Application { config, fulfillment })
}

impl Application {
    pub fn router(&self) -> Router {
        let webhook_state = webhook::WebhookState::new(
            Arc::clone(&self.fulfillment),
            self.config.webhook.auth_token.clone(),
        );

        Router::new()
            .merge(webhook::router(&self.config.webhook.path, webhook_state))
            .merge(health::router(Arc::clone(&self.fulfillment)))
            .layer(TraceLayer::new_for_http())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use bookcart_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use bookcart_core::Locale;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap_with_config;

    fn app(auth_token: Option<&str>) -> Router {
        let mut config = AppConfig::default();
        config.webhook.auth_token = auth_token.map(|token| token.to_owned().into());
        bootstrap_with_config(config).expect("bootstrap should succeed").router()
    }

    fn turn(intent: &str) -> String {
        json!({
            "responseId": "resp-1",
            "session": "projects/bookcart/agent/sessions/router",
            "queryResult": {"intent": {"displayName": intent}, "languageCode": "ja-JP"},
            "originalDetectIntentRequest": {"payload": {"user": {"locale": "ja-JP"}}}
        })
        .to_string()
    }

    fn post(body: impl Into<Body>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/transactions")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(body.into()).expect("request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn webhook_round_trip_returns_localized_system_intent() {
        let response = app(None)
            .oneshot(post(turn("delivery_address"), None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let google = &body["payload"]["google"];
        assert_eq!(google["systemIntent"]["intent"], "actions.intent.DELIVERY_ADDRESS");
        let speech = &google["richResponse"]["items"][0]["simpleResponse"]["textToSpeech"];
        assert_eq!(speech, "PLACEHOLDER");
    }

    #[tokio::test]
    async fn unknown_intent_is_a_bad_request_with_correlation_id() {
        let response = app(None)
            .oneshot(post(turn("nonexistent_intent"), None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["correlation_id"], "resp-1");
        assert!(body["message"].as_str().unwrap_or_default().contains("nonexistent_intent"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = app(None).oneshot(post("{not json", None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }

    #[tokio::test]
    async fn configured_token_is_enforced() {
        let missing = app(Some("s3cret"))
            .oneshot(post(turn("delivery_address"), None))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app(Some("s3cret"))
            .oneshot(post(turn("delivery_address"), Some("nope")))
            .await
            .expect("response");
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong).await["error"], "unauthorized");

        let accepted = app(Some("s3cret"))
            .oneshot(post(turn("delivery_address"), Some("s3cret")))
            .await
            .expect("response");
        assert_eq!(accepted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_route_is_mounted_next_to_the_webhook() {
        let response = app(None)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ready");
    }

    #[test]
    fn bootstrap_uses_configured_default_locale() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                default_locale: Some("ja-JP".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");
        let app = bootstrap_with_config(config).expect("bootstrap should succeed");

        assert_eq!(app.config.locale.default, Locale::JaJp);
        assert_eq!(app.fulfillment.catalogs().default_locale(), Locale::JaJp);
        assert_eq!(app.fulfillment.catalogs().loaded_locales().len(), 2);
    }
}
