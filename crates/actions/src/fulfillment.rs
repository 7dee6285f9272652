use std::sync::Arc;

use bookcart_core::config::TransactionConfig;
use bookcart_core::{ApplicationError, Catalogs};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    dispatch::{ConversationRequest, DispatchError, HandlerError, IntentDispatcher, TurnContext},
    responses::ConversationResponse,
    session::{ConversationData, SessionError, SessionLocks, SessionStore},
    webhook::{WebhookDecodeError, WebhookRequest, WebhookResponse},
};

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error(transparent)]
    Decode(#[from] WebhookDecodeError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("could not encode webhook response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<FulfillmentError> for ApplicationError {
    fn from(value: FulfillmentError) -> Self {
        match value {
            FulfillmentError::Decode(error) => Self::MalformedRequest(error.to_string()),
            FulfillmentError::Dispatch(DispatchError::UnhandledIntent(intent)) => {
                Self::UnhandledIntent(intent)
            }
            FulfillmentError::Dispatch(DispatchError::Handler {
                source: HandlerError::Order(error),
                ..
            }) => Self::Domain(error),
            FulfillmentError::Session(error) => Self::Session(error.to_string()),
            FulfillmentError::Encode(error) => Self::Encoding(error.to_string()),
        }
    }
}

/// A fulfilled turn: what to say and the session data after the handler ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: ConversationResponse,
    pub data: ConversationData,
}

/// Runs one webhook turn end to end: decode, load session, dispatch, persist, encode.
pub struct Fulfillment<S> {
    dispatcher: IntentDispatcher,
    catalogs: Arc<Catalogs>,
    settings: TransactionConfig,
    sessions: S,
    turn_locks: SessionLocks,
}

impl<S> Fulfillment<S>
where
    S: SessionStore,
{
    pub fn new(
        dispatcher: IntentDispatcher,
        catalogs: Arc<Catalogs>,
        settings: TransactionConfig,
        sessions: S,
    ) -> Self {
        Self { dispatcher, catalogs, settings, sessions, turn_locks: SessionLocks::default() }
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub async fn fulfill(
        &self,
        request: WebhookRequest,
        received_at: DateTime<Utc>,
    ) -> Result<WebhookResponse, FulfillmentError> {
        let turn = request.decode()?;
        let outcome = self.respond(&turn.request, turn.carried_data, received_at).await?;

        let carried = outcome.response.expects_user_response().then_some(&outcome.data);
        Ok(WebhookResponse::encode(&outcome.response, &turn.request.session_id, carried)?)
    }

    /// The store is authoritative; `carried` (the platform's echo of the data)
    /// is only used when the store has no entry for the session.
    ///
    /// Turns of one session run one at a time from load to save.
    pub async fn respond(
        &self,
        request: &ConversationRequest,
        carried: Option<ConversationData>,
        received_at: DateTime<Utc>,
    ) -> Result<TurnOutcome, FulfillmentError> {
        let _turn = self.turn_locks.lock(&request.session_id).await;

        let mut data = match self.sessions.load(&request.session_id).await? {
            Some(stored) => stored,
            None => carried.unwrap_or_default(),
        };

        let response = {
            let ctx = TurnContext {
                localizer: self.catalogs.localizer(&request.locale_tag),
                settings: &self.settings,
                received_at,
            };
            self.dispatcher.dispatch(request, &mut data, &ctx)?
        };

        if !response.expects_user_response() {
            self.sessions.clear(&request.session_id).await?;
            tracing::debug!(
                event_name = "actions.session.closed",
                correlation_id = %request.correlation_id,
                session_id = %request.session_id,
                "conversation closed, session data cleared"
            );
        } else if data == ConversationData::default() {
            self.sessions.clear(&request.session_id).await?;
        } else {
            self.sessions.save(&request.session_id, data.clone()).await?;
        }

        Ok(TurnOutcome { response, data })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bookcart_core::config::TransactionConfig;
    use bookcart_core::{ApplicationError, Catalogs, Locale, Location, PostalAddress};
    use chrono::Utc;

    use super::{Fulfillment, FulfillmentError};
    use crate::arguments::{DeliveryAddressOutcome, TurnArguments};
    use crate::dispatch::{default_dispatcher, ConversationRequest};
    use crate::session::{ConversationData, InMemorySessionStore, SessionId, SessionStore};

    fn fulfillment() -> Fulfillment<InMemorySessionStore> {
        Fulfillment::new(
            default_dispatcher(),
            Arc::new(Catalogs::embedded(Locale::EnUs).expect("catalogs")),
            TransactionConfig::default(),
            InMemorySessionStore::new(),
        )
    }

    fn request(intent: &str, arguments: TurnArguments) -> ConversationRequest {
        ConversationRequest {
            intent_name: intent.to_owned(),
            locale_tag: "en-US".to_owned(),
            session_id: SessionId("projects/p/agent/sessions/s1".to_owned()),
            correlation_id: "req-1".to_owned(),
            arguments,
        }
    }

    fn address(line: &str) -> Location {
        Location {
            postal_address: PostalAddress {
                address_lines: vec![line.to_owned()],
                ..PostalAddress::default()
            },
            ..Location::default()
        }
    }

    #[tokio::test]
    async fn store_wins_over_carried_data() {
        let fulfillment = fulfillment();
        let session = SessionId("projects/p/agent/sessions/s1".to_owned());
        let stored = ConversationData { delivery_address: Some(address("1 Stored St")) };
        fulfillment.sessions().save(&session, stored.clone()).await.expect("seed store");

        let carried = ConversationData { delivery_address: Some(address("2 Carried Ave")) };
        let outcome = fulfillment
            .respond(
                &request("transaction_decision_action", TurnArguments::default()),
                Some(carried),
                Utc::now(),
            )
            .await
            .expect("outcome");

        assert_eq!(outcome.data, stored);
    }

    #[tokio::test]
    async fn carried_data_hydrates_empty_store() {
        let fulfillment = fulfillment();
        let carried = ConversationData { delivery_address: Some(address("2 Carried Ave")) };

        let outcome = fulfillment
            .respond(
                &request("transaction_decision_action", TurnArguments::default()),
                Some(carried.clone()),
                Utc::now(),
            )
            .await
            .expect("outcome");

        assert_eq!(outcome.data, carried);
        assert_eq!(fulfillment.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn closing_turn_clears_session() {
        let fulfillment = fulfillment();
        let accepted = TurnArguments {
            delivery_address: Some(DeliveryAddressOutcome::Accepted(address("3 Kept Rd"))),
            ..TurnArguments::default()
        };
        fulfillment
            .respond(&request("delivery_address_complete", accepted), None, Utc::now())
            .await
            .expect("accepted");
        assert_eq!(fulfillment.sessions().len().await, 1);

        let rejected = request("transaction_decision_complete", TurnArguments::default());
        fulfillment.respond(&rejected, None, Utc::now()).await.expect("closing turn");
        assert_eq!(fulfillment.sessions().len().await, 0);
    }

    #[tokio::test]
    async fn turns_without_conversation_data_are_not_stored() {
        let fulfillment = fulfillment();

        for index in 0..500 {
            let mut request = request("transaction_check_nopayment", TurnArguments::default());
            request.session_id = SessionId(format!("projects/p/agent/sessions/open-{index}"));
            let outcome =
                fulfillment.respond(&request, None, Utc::now()).await.expect("asking turn");
            assert!(outcome.response.expects_user_response());
        }

        assert_eq!(fulfillment.sessions().len().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_of_one_session_keep_the_stored_address() {
        let fulfillment = Arc::new(fulfillment());
        let accepted = TurnArguments {
            delivery_address: Some(DeliveryAddressOutcome::Accepted(address("4 Shared Court"))),
            ..TurnArguments::default()
        };

        let mut tasks = Vec::new();
        for index in 0..32 {
            let fulfillment = Arc::clone(&fulfillment);
            let turn = if index == 7 {
                request("delivery_address_complete", accepted.clone())
            } else {
                request("transaction_check_action", TurnArguments::default())
            };
            tasks.push(tokio::spawn(async move {
                fulfillment.respond(&turn, None, Utc::now()).await.map(|_| ())
            }));
        }
        for task in tasks {
            task.await.expect("task joins").expect("turn succeeds");
        }

        let stored = fulfillment
            .sessions()
            .load(&SessionId("projects/p/agent/sessions/s1".to_owned()))
            .await
            .expect("load");
        assert_eq!(stored.and_then(|data| data.delivery_address), Some(address("4 Shared Court")));
    }

    #[tokio::test]
    async fn unhandled_intent_maps_to_application_error() {
        let fulfillment = fulfillment();
        let error = fulfillment
            .respond(&request("nonexistent_intent", TurnArguments::default()), None, Utc::now())
            .await
            .expect_err("unknown intent");

        assert!(matches!(error, FulfillmentError::Dispatch(_)));
        assert_eq!(
            ApplicationError::from(error),
            ApplicationError::UnhandledIntent("nonexistent_intent".to_owned())
        );
        assert_eq!(fulfillment.sessions().len().await, 0);
    }
}
