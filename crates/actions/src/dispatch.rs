use std::{collections::HashMap, sync::Arc};

use bookcart_core::config::TransactionConfig;
use bookcart_core::{DomainError, Localizer, Order};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    arguments::{
        DeliveryAddressOutcome, RequirementsCheckOutcome, TransactionDecisionOutcome,
        TurnArguments,
    },
    cart::sample_order,
    intents::{Intent, UnknownIntent},
    responses::{
        AddressOptions, ConversationResponse, DeliveryAddressSpec, OrderManagementAction,
        OrderOptions, OrderState, OrderStateKind, OrderUpdate, PaymentOptions, Receipt,
        ResponseBuilder, TransactionDecisionSpec, TransactionRequirementsSpec, UserNotification,
    },
    session::{ConversationData, SessionId},
};

/// One decoded conversation turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRequest {
    pub intent_name: String,
    pub locale_tag: String,
    pub session_id: SessionId,
    pub correlation_id: String,
    pub arguments: TurnArguments,
}

impl ConversationRequest {
    pub fn intent(&self) -> Result<Intent, UnknownIntent> {
        self.intent_name.parse()
    }
}

/// Read-only inputs a handler may consult besides the request itself.
#[derive(Clone, Copy, Debug)]
pub struct TurnContext<'a> {
    pub localizer: Localizer<'a>,
    pub settings: &'a TransactionConfig,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error(transparent)]
    Order(#[from] DomainError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unhandled intent `{0}`")]
    UnhandledIntent(String),
    #[error("{intent} handler failed: {source}")]
    Handler {
        intent: Intent,
        #[source]
        source: HandlerError,
    },
}

pub trait IntentHandler: Send + Sync {
    fn intent(&self) -> Intent;
    fn handle(
        &self,
        request: &ConversationRequest,
        data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError>;
}

#[derive(Default)]
pub struct IntentDispatcher {
    handlers: HashMap<Intent, Arc<dyn IntentHandler>>,
}

impl IntentDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: IntentHandler + 'static,
    {
        self.handlers.insert(handler.intent(), Arc::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &ConversationRequest,
        data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, DispatchError> {
        let unhandled = || DispatchError::UnhandledIntent(request.intent_name.clone());
        let intent = request.intent().map_err(|_| unhandled())?;
        let Some(handler) = self.handlers.get(&intent) else {
            return Err(unhandled());
        };

        tracing::debug!(
            event_name = "actions.dispatch",
            correlation_id = %request.correlation_id,
            session_id = %request.session_id,
            intent = %intent,
            locale = %ctx.localizer.locale(),
            "dispatching intent"
        );

        handler
            .handle(request, data, ctx)
            .map_err(|source| DispatchError::Handler { intent, source })
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Registers a handler for every [`Intent`].
pub fn default_dispatcher() -> IntentDispatcher {
    let mut dispatcher = IntentDispatcher::new();
    for intent in Intent::ALL {
        match intent {
            Intent::TransactionCheckNoPayment => dispatcher.register(TransactionCheckNoPayment),
            Intent::TransactionCheckAction => dispatcher.register(TransactionCheckAction),
            Intent::TransactionCheckGoogle => dispatcher.register(TransactionCheckGoogle),
            Intent::TransactionCheckComplete => dispatcher.register(TransactionCheckComplete),
            Intent::DeliveryAddress => dispatcher.register(DeliveryAddress),
            Intent::DeliveryAddressComplete => dispatcher.register(DeliveryAddressComplete),
            Intent::TransactionDecisionAction => dispatcher.register(TransactionDecisionAction),
            Intent::TransactionDecisionGoogle => dispatcher.register(TransactionDecisionGoogle),
            Intent::TransactionDecisionComplete => {
                dispatcher.register(TransactionDecisionComplete)
            }
        }
    }
    dispatcher
}

fn delivery_address_request(reason: String) -> DeliveryAddressSpec {
    DeliveryAddressSpec { address_options: AddressOptions { reason } }
}

pub struct TransactionCheckNoPayment;

impl IntentHandler for TransactionCheckNoPayment {
    fn intent(&self) -> Intent {
        Intent::TransactionCheckNoPayment
    }

    fn handle(
        &self,
        _request: &ConversationRequest,
        _data: &mut ConversationData,
        _ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let spec = TransactionRequirementsSpec::default();
        Ok(ResponseBuilder::ask().requirements_check(spec).build())
    }
}

pub struct TransactionCheckAction;

impl IntentHandler for TransactionCheckAction {
    fn intent(&self) -> Intent {
        Intent::TransactionCheckAction
    }

    fn handle(
        &self,
        _request: &ConversationRequest,
        _data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let spec = TransactionRequirementsSpec {
            order_options: Some(OrderOptions { request_delivery_address: false }),
            payment_options: Some(PaymentOptions::action_provided_card(
                ctx.settings.payment_display_name.clone(),
            )),
        };
        Ok(ResponseBuilder::ask().requirements_check(spec).build())
    }
}

pub struct TransactionCheckGoogle;

impl IntentHandler for TransactionCheckGoogle {
    fn intent(&self) -> Intent {
        Intent::TransactionCheckGoogle
    }

    fn handle(
        &self,
        _request: &ConversationRequest,
        _data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let spec = TransactionRequirementsSpec {
            order_options: Some(OrderOptions { request_delivery_address: false }),
            payment_options: Some(PaymentOptions::google_provided(
                &ctx.settings.supported_card_networks,
            )),
        };
        Ok(ResponseBuilder::ask().requirements_check(spec).build())
    }
}

pub struct TransactionCheckComplete;

impl IntentHandler for TransactionCheckComplete {
    fn intent(&self) -> Intent {
        Intent::TransactionCheckComplete
    }

    fn handle(
        &self,
        request: &ConversationRequest,
        _data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let l10n = &ctx.localizer;
        let response = match request.arguments.requirements_check {
            Some(RequirementsCheckOutcome::Ok) => {
                ResponseBuilder::ask().prompt(l10n.t("transaction_check_complete"))
            }
            outcome => {
                tracing::info!(
                    event_name = "actions.requirements_check.failed",
                    correlation_id = %request.correlation_id,
                    outcome = ?outcome,
                    "user cannot transact"
                );
                ResponseBuilder::close().prompt(l10n.t("transaction_check_complete_failed"))
            }
        };
        Ok(response.build())
    }
}

pub struct DeliveryAddress;

impl IntentHandler for DeliveryAddress {
    fn intent(&self) -> Intent {
        Intent::DeliveryAddress
    }

    fn handle(
        &self,
        _request: &ConversationRequest,
        _data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let spec = delivery_address_request(ctx.localizer.t("delivery_address"));
        Ok(ResponseBuilder::ask().delivery_address(spec).build())
    }
}

pub struct DeliveryAddressComplete;

impl IntentHandler for DeliveryAddressComplete {
    fn intent(&self) -> Intent {
        Intent::DeliveryAddressComplete
    }

    fn handle(
        &self,
        request: &ConversationRequest,
        data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let l10n = &ctx.localizer;
        let Some(DeliveryAddressOutcome::Accepted(location)) = &request.arguments.delivery_address
        else {
            return Ok(ResponseBuilder::close()
                .prompt(l10n.t("delivery_address_complete_failed"))
                .build());
        };

        tracing::info!(
            event_name = "actions.delivery_address.accepted",
            correlation_id = %request.correlation_id,
            session_id = %request.session_id,
            address_line = location.postal_address.first_line().unwrap_or_default(),
            "delivery address received"
        );
        data.delivery_address = Some(location.clone());

        Ok(ResponseBuilder::ask().prompt(l10n.t("delivery_address_complete")).build())
    }
}

fn proposed_order(
    request: &ConversationRequest,
    data: &ConversationData,
    ctx: &TurnContext<'_>,
) -> Result<Order, HandlerError> {
    let order = sample_order(&ctx.localizer, ctx.settings, data.delivery_address.as_ref())?;
    tracing::debug!(
        event_name = "actions.transaction_decision.proposed",
        correlation_id = %request.correlation_id,
        session_id = %request.session_id,
        total = %order.total_price.amount.amount,
        delivery_line = order
            .delivery_location()
            .and_then(|location| location.postal_address.first_line())
            .unwrap_or("none"),
        "proposing order"
    );
    Ok(order)
}

pub struct TransactionDecisionAction;

impl IntentHandler for TransactionDecisionAction {
    fn intent(&self) -> Intent {
        Intent::TransactionDecisionAction
    }

    fn handle(
        &self,
        request: &ConversationRequest,
        data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let order = proposed_order(request, data, ctx)?;
        let spec = TransactionDecisionSpec {
            order_options: OrderOptions { request_delivery_address: true },
            payment_options: PaymentOptions::action_provided_card(
                ctx.settings.payment_display_name.clone(),
            ),
            proposed_order: order,
        };
        Ok(ResponseBuilder::ask().transaction_decision(spec).build())
    }
}

pub struct TransactionDecisionGoogle;

impl IntentHandler for TransactionDecisionGoogle {
    fn intent(&self) -> Intent {
        Intent::TransactionDecisionGoogle
    }

    fn handle(
        &self,
        request: &ConversationRequest,
        data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let order = proposed_order(request, data, ctx)?;
        let spec = TransactionDecisionSpec {
            order_options: OrderOptions { request_delivery_address: false },
            payment_options: PaymentOptions::google_provided(
                &ctx.settings.supported_card_networks,
            ),
            proposed_order: order,
        };
        Ok(ResponseBuilder::ask().transaction_decision(spec).build())
    }
}

pub struct TransactionDecisionComplete;

impl TransactionDecisionComplete {
    fn order_update(final_order_id: &str, ctx: &TurnContext<'_>) -> OrderUpdate {
        let l10n = &ctx.localizer;
        OrderUpdate {
            action_order_id: final_order_id.to_owned(),
            order_state: OrderState {
                state: OrderStateKind::Created,
                label: l10n.t("transaction_decision_complete.orderState.label"),
            },
            line_item_updates: Default::default(),
            update_time: ctx.received_at,
            receipt: Receipt { confirmed_action_order_id: ctx.settings.order_id.clone() },
            order_management_actions: vec![OrderManagementAction::customer_service(
                l10n.t("transaction_decision_complete.orderManagementActions.button.title"),
                ctx.settings.customer_service_url.clone(),
            )],
            user_notification: UserNotification {
                text: l10n.t("transaction_decision_complete.userNotification.text"),
                title: l10n.t("transaction_decision_complete.userNotification.title"),
            },
        }
    }
}

impl IntentHandler for TransactionDecisionComplete {
    fn intent(&self) -> Intent {
        Intent::TransactionDecisionComplete
    }

    fn handle(
        &self,
        request: &ConversationRequest,
        _data: &mut ConversationData,
        ctx: &TurnContext<'_>,
    ) -> Result<ConversationResponse, HandlerError> {
        let l10n = &ctx.localizer;
        let decision = request.arguments.transaction_decision.as_ref();
        tracing::info!(
            event_name = "actions.transaction_decision.complete",
            correlation_id = %request.correlation_id,
            session_id = %request.session_id,
            decision = ?decision,
            "transaction decision complete"
        );

        let response = match decision {
            Some(TransactionDecisionOutcome::OrderAccepted { final_order_id }) => {
                ResponseBuilder::ask()
                    .order_update(Self::order_update(final_order_id, ctx))
                    .prompt(l10n.t("transaction_decision_complete"))
            }
            Some(TransactionDecisionOutcome::DeliveryAddressUpdated) => {
                ResponseBuilder::ask().delivery_address(delivery_address_request(
                    l10n.t("transaction_decision_complete.addressOptions.reason"),
                ))
            }
            _ => ResponseBuilder::close().prompt(l10n.t("transaction_decision_complete_failed")),
        };
        Ok(response.build())
    }
}
