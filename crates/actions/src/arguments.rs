use bookcart_core::Location;
use serde::Deserialize;
use serde_json::Value;

pub const REQUIREMENTS_CHECK_ARGUMENT: &str = "TRANSACTION_REQUIREMENTS_CHECK_RESULT";
pub const DELIVERY_ADDRESS_ARGUMENT: &str = "DELIVERY_ADDRESS_VALUE";
pub const TRANSACTION_DECISION_ARGUMENT: &str = "TRANSACTION_DECISION_VALUE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementsCheckOutcome {
    Ok,
    UserActionRequired,
    AssistantSurfaceNotSupported,
    RegionNotSupported,
    Unspecified,
}

impl RequirementsCheckOutcome {
    pub fn from_result_type(value: &str) -> Self {
        match value {
            "OK" => Self::Ok,
            "USER_ACTION_REQUIRED" => Self::UserActionRequired,
            "ASSISTANT_SURFACE_NOT_SUPPORTED" => Self::AssistantSurfaceNotSupported,
            "REGION_NOT_SUPPORTED" => Self::RegionNotSupported,
            _ => Self::Unspecified,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryAddressOutcome {
    Accepted(Location),
    Rejected,
    Undecided,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionDecisionOutcome {
    OrderAccepted { final_order_id: String },
    Rejected,
    DeliveryAddressUpdated,
    CartChangeRequested,
    UserCannotTransact,
    Unspecified,
}

/// Typed view of the platform's per-turn arguments.
///
/// Each field is `None` when its argument was absent or could not be decoded;
/// handlers treat both the same way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnArguments {
    pub requirements_check: Option<RequirementsCheckOutcome>,
    pub delivery_address: Option<DeliveryAddressOutcome>,
    pub transaction_decision: Option<TransactionDecisionOutcome>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequirementsCheckExtension {
    result_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryAddressExtension {
    user_decision: Option<String>,
    location: Option<Location>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDecisionExtension {
    user_decision: Option<String>,
    order: Option<DecisionOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionOrder {
    final_order: Option<FinalOrder>,
}

#[derive(Deserialize)]
struct FinalOrder {
    id: Option<String>,
}

impl TurnArguments {
    /// Decodes `(name, extension)` pairs. Unknown names are ignored and the
    /// first occurrence of a known name wins.
    pub fn decode<'a, I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut arguments = Self::default();
        for (name, extension) in raw {
            match name {
                REQUIREMENTS_CHECK_ARGUMENT if arguments.requirements_check.is_none() => {
                    arguments.requirements_check = decode_requirements_check(extension);
                }
                DELIVERY_ADDRESS_ARGUMENT if arguments.delivery_address.is_none() => {
                    arguments.delivery_address = decode_delivery_address(extension);
                }
                TRANSACTION_DECISION_ARGUMENT if arguments.transaction_decision.is_none() => {
                    arguments.transaction_decision = decode_transaction_decision(extension);
                }
                _ => {}
            }
        }
        arguments
    }
}

fn extension<T>(name: &str, value: &Value) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            tracing::debug!(
                event_name = "actions.argument.undecodable",
                argument = name,
                error = %error,
                "ignoring argument extension"
            );
            None
        }
    }
}

fn decode_requirements_check(value: &Value) -> Option<RequirementsCheckOutcome> {
    let decoded: RequirementsCheckExtension = extension(REQUIREMENTS_CHECK_ARGUMENT, value)?;
    let result_type = decoded.result_type?;
    Some(RequirementsCheckOutcome::from_result_type(&result_type))
}

fn decode_delivery_address(value: &Value) -> Option<DeliveryAddressOutcome> {
    let decoded: DeliveryAddressExtension = extension(DELIVERY_ADDRESS_ARGUMENT, value)?;
    let outcome = match (decoded.user_decision.as_deref()?, decoded.location) {
        ("ACCEPTED", Some(location)) => DeliveryAddressOutcome::Accepted(location),
        ("REJECTED", _) => DeliveryAddressOutcome::Rejected,
        _ => DeliveryAddressOutcome::Undecided,
    };
    Some(outcome)
}

fn decode_transaction_decision(value: &Value) -> Option<TransactionDecisionOutcome> {
    let decoded: TransactionDecisionExtension = extension(TRANSACTION_DECISION_ARGUMENT, value)?;
    let final_order_id = decoded
        .order
        .and_then(|order| order.final_order)
        .and_then(|final_order| final_order.id)
        .filter(|id| !id.trim().is_empty());

    let outcome = match (decoded.user_decision.as_deref()?, final_order_id) {
        ("ORDER_ACCEPTED", Some(final_order_id)) => {
            TransactionDecisionOutcome::OrderAccepted { final_order_id }
        }
        ("ORDER_REJECTED", _) => TransactionDecisionOutcome::Rejected,
        ("DELIVERY_ADDRESS_UPDATED", _) => TransactionDecisionOutcome::DeliveryAddressUpdated,
        ("CART_CHANGE_REQUESTED", _) => TransactionDecisionOutcome::CartChangeRequested,
        ("USER_CANNOT_TRANSACT", _) => TransactionDecisionOutcome::UserCannotTransact,
        _ => TransactionDecisionOutcome::Unspecified,
    };
    Some(outcome)
}
