//! Conversation handling for the bookcart transaction sample.
//!
//! A webhook turn is decoded into a [`ConversationRequest`], routed by the
//! [`IntentDispatcher`] to one handler per [`Intent`], and answered with a
//! [`ConversationResponse`] that the [`webhook`] module encodes back into the
//! platform's envelope. [`Fulfillment`] runs that loop against a
//! [`SessionStore`].

pub mod arguments;
pub mod cart;
pub mod dispatch;
pub mod fulfillment;
pub mod intents;
pub mod responses;
pub mod session;
pub mod webhook;

pub use arguments::{
    DeliveryAddressOutcome, RequirementsCheckOutcome, TransactionDecisionOutcome, TurnArguments,
};
pub use dispatch::{
    default_dispatcher, ConversationRequest, DispatchError, HandlerError, IntentDispatcher,
    IntentHandler, TurnContext,
};
pub use fulfillment::{Fulfillment, FulfillmentError, TurnOutcome};
pub use intents::{Intent, UnknownIntent};
pub use responses::{ConversationResponse, ResponseAction, ResponseBuilder, SystemIntent};
pub use session::{ConversationData, InMemorySessionStore, SessionError, SessionId, SessionStore};
pub use webhook::{WebhookDecodeError, WebhookRequest, WebhookResponse};
