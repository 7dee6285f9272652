use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Every intent the transaction sample fulfills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    TransactionCheckNoPayment,
    TransactionCheckAction,
    TransactionCheckGoogle,
    TransactionCheckComplete,
    DeliveryAddress,
    DeliveryAddressComplete,
    TransactionDecisionAction,
    TransactionDecisionGoogle,
    TransactionDecisionComplete,
}

impl Intent {
    pub const ALL: [Intent; 9] = [
        Self::TransactionCheckNoPayment,
        Self::TransactionCheckAction,
        Self::TransactionCheckGoogle,
        Self::TransactionCheckComplete,
        Self::DeliveryAddress,
        Self::DeliveryAddressComplete,
        Self::TransactionDecisionAction,
        Self::TransactionDecisionGoogle,
        Self::TransactionDecisionComplete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransactionCheckNoPayment => "transaction_check_nopayment",
            Self::TransactionCheckAction => "transaction_check_action",
            Self::TransactionCheckGoogle => "transaction_check_google",
            Self::TransactionCheckComplete => "transaction_check_complete",
            Self::DeliveryAddress => "delivery_address",
            Self::DeliveryAddressComplete => "delivery_address_complete",
            Self::TransactionDecisionAction => "transaction_decision_action",
            Self::TransactionDecisionGoogle => "transaction_decision_google",
            Self::TransactionDecisionComplete => "transaction_decision_complete",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown intent `{0}`")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == name)
            .ok_or_else(|| UnknownIntent(value.to_owned()))
    }
}
