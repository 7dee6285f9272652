use std::collections::BTreeMap;

use bookcart_core::Order;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

pub const REQUIREMENTS_CHECK_INTENT: &str = "actions.intent.TRANSACTION_REQUIREMENTS_CHECK";
pub const DELIVERY_ADDRESS_INTENT: &str = "actions.intent.DELIVERY_ADDRESS";
pub const TRANSACTION_DECISION_INTENT: &str = "actions.intent.TRANSACTION_DECISION";

const REQUIREMENTS_CHECK_SPEC_TYPE: &str =
    "type.googleapis.com/google.actions.v2.TransactionRequirementsCheckSpec";
const DELIVERY_ADDRESS_SPEC_TYPE: &str =
    "type.googleapis.com/google.actions.v2.DeliveryAddressValueSpec";
const TRANSACTION_DECISION_SPEC_TYPE: &str =
    "type.googleapis.com/google.actions.v2.TransactionDecisionValueSpec";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOptions {
    pub request_delivery_address: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    PaymentCard,
    Bank,
    LoyaltyProgram,
    OnFulfillment,
    GiftCard,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProvidedPaymentOptions {
    pub payment_type: PaymentType,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProvidedPaymentOptions {
    pub prepaid_card_disallowed: bool,
    pub supported_card_networks: Vec<String>,
    pub tokenization_parameters: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PaymentOptions {
    #[serde(rename = "actionProvidedOptions")]
    ActionProvided(ActionProvidedPaymentOptions),
    #[serde(rename = "googleProvidedOptions")]
    GoogleProvided(GoogleProvidedPaymentOptions),
}

impl PaymentOptions {
    /// A card the action itself charges, shown to the user by display name.
    pub fn action_provided_card(display_name: impl Into<String>) -> Self {
        Self::ActionProvided(ActionProvidedPaymentOptions {
            payment_type: PaymentType::PaymentCard,
            display_name: display_name.into(),
        })
    }

    /// A platform-held instrument. Tokenization parameters come from the payment processor
    /// and are left empty here.
    pub fn google_provided(supported_card_networks: &[String]) -> Self {
        Self::GoogleProvided(GoogleProvidedPaymentOptions {
            prepaid_card_disallowed: false,
            supported_card_networks: supported_card_networks.to_vec(),
            tokenization_parameters: BTreeMap::new(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequirementsSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_options: Option<OrderOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_options: Option<PaymentOptions>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddressOptions {
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddressSpec {
    pub address_options: AddressOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDecisionSpec {
    pub order_options: OrderOptions,
    pub payment_options: PaymentOptions,
    pub proposed_order: Order,
}

/// Platform helper the response hands the turn to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemIntent {
    RequirementsCheck(TransactionRequirementsSpec),
    DeliveryAddress(DeliveryAddressSpec),
    TransactionDecision(Box<TransactionDecisionSpec>),
}

impl SystemIntent {
    pub fn intent_name(&self) -> &'static str {
        match self {
            Self::RequirementsCheck(_) => REQUIREMENTS_CHECK_INTENT,
            Self::DeliveryAddress(_) => DELIVERY_ADDRESS_INTENT,
            Self::TransactionDecision(_) => TRANSACTION_DECISION_INTENT,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            Self::RequirementsCheck(_) => REQUIREMENTS_CHECK_SPEC_TYPE,
            Self::DeliveryAddress(_) => DELIVERY_ADDRESS_SPEC_TYPE,
            Self::TransactionDecision(_) => TRANSACTION_DECISION_SPEC_TYPE,
        }
    }

    /// The value-spec object with its `@type` discriminator, as the platform expects it.
    pub fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        let spec = match self {
            Self::RequirementsCheck(spec) => serde_json::to_value(spec)?,
            Self::DeliveryAddress(spec) => serde_json::to_value(spec)?,
            Self::TransactionDecision(spec) => serde_json::to_value(spec)?,
        };

        let mut data = serde_json::Map::new();
        data.insert("@type".to_owned(), serde_json::Value::String(self.type_url().to_owned()));
        if let serde_json::Value::Object(fields) = spec {
            data.extend(fields);
        }
        Ok(serde_json::Value::Object(data))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStateKind {
    Created,
    Confirmed,
    Rejected,
    InTransit,
    Fulfilled,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderState {
    pub state: OrderStateKind,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub confirmed_action_order_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OpenUrlAction {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub open_url_action: OpenUrlAction,
    pub title: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderActionType {
    CustomerService,
    ViewDetails,
    Modify,
    Cancel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderManagementAction {
    pub button: Button,
    #[serde(rename = "type")]
    pub action_type: OrderActionType,
}

impl OrderManagementAction {
    pub fn customer_service(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            button: Button {
                open_url_action: OpenUrlAction { url: url.into() },
                title: title.into(),
            },
            action_type: OrderActionType::CustomerService,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserNotification {
    pub text: String,
    pub title: String,
}

/// Post-purchase status update for a confirmed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub action_order_id: String,
    pub order_state: OrderState,
    pub line_item_updates: BTreeMap<String, serde_json::Value>,
    #[serde(serialize_with = "rfc3339_millis")]
    pub update_time: DateTime<Utc>,
    pub receipt: Receipt,
    pub order_management_actions: Vec<OrderManagementAction>,
    pub user_notification: UserNotification,
}

fn rfc3339_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseAction {
    /// Keep the microphone open for the next turn.
    Ask,
    /// End the conversation after this response.
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseItem {
    Prompt(String),
    OrderUpdate(Box<OrderUpdate>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationResponse {
    pub action: ResponseAction,
    pub items: Vec<ResponseItem>,
    pub system_intent: Option<SystemIntent>,
}

impl ConversationResponse {
    pub fn expects_user_response(&self) -> bool {
        self.action == ResponseAction::Ask
    }

    pub fn prompts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            ResponseItem::Prompt(text) => Some(text.as_str()),
            ResponseItem::OrderUpdate(_) => None,
        })
    }

    pub fn order_update(&self) -> Option<&OrderUpdate> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::OrderUpdate(update) => Some(update.as_ref()),
            ResponseItem::Prompt(_) => None,
        })
    }
}

pub struct ResponseBuilder {
    action: ResponseAction,
    items: Vec<ResponseItem>,
    system_intent: Option<SystemIntent>,
}

impl ResponseBuilder {
    pub fn new(action: ResponseAction) -> Self {
        Self { action, items: Vec::new(), system_intent: None }
    }

    pub fn ask() -> Self {
        Self::new(ResponseAction::Ask)
    }

    pub fn close() -> Self {
        Self::new(ResponseAction::Close)
    }

    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.items.push(ResponseItem::Prompt(text.into()));
        self
    }

    pub fn order_update(mut self, update: OrderUpdate) -> Self {
        self.items.push(ResponseItem::OrderUpdate(Box::new(update)));
        self
    }

    /// Hands the turn to a platform helper. A response carries at most one;
    /// a later call replaces an earlier one.
    pub fn system_intent(mut self, intent: SystemIntent) -> Self {
        self.system_intent = Some(intent);
        self
    }

    pub fn requirements_check(self, spec: TransactionRequirementsSpec) -> Self {
        self.system_intent(SystemIntent::RequirementsCheck(spec))
    }

    pub fn delivery_address(self, spec: DeliveryAddressSpec) -> Self {
        self.system_intent(SystemIntent::DeliveryAddress(spec))
    }

    pub fn transaction_decision(self, spec: TransactionDecisionSpec) -> Self {
        self.system_intent(SystemIntent::TransactionDecision(Box::new(spec)))
    }

    pub fn build(self) -> ConversationResponse {
        ConversationResponse {
            action: self.action,
            items: self.items,
            system_intent: self.system_intent,
        }
    }
}
