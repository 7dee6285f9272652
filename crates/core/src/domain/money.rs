use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

const NANOS_PER_UNIT: i64 = 1_000_000_000;

/// Exact monetary amount in a single currency.
///
/// On the wire this is the platform's `{currencyCode, units, nanos}` triple;
/// internally the amount is a [`Decimal`] so sums never drift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Money {
    pub currency_code: String,
    pub amount: Decimal,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, amount: Decimal) -> Self {
        Self { currency_code: currency_code.into(), amount }
    }

    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new(currency_code, Decimal::ZERO)
    }

    pub fn from_units_nanos(currency_code: impl Into<String>, units: i64, nanos: i32) -> Self {
        let amount = Decimal::from(units) + Decimal::new(i64::from(nanos), 9);
        Self::new(currency_code, amount.normalize())
    }

    /// Splits the amount into whole units and nanos, both carrying the sign.
    pub fn units_nanos(&self) -> Option<(i64, i32)> {
        let whole = self.amount.trunc();
        let units = whole.to_i64()?;
        let nanos = ((self.amount - whole) * Decimal::from(NANOS_PER_UNIT)).round().to_i32()?;
        Some((units, nanos))
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency_code != other.currency_code {
            return Err(DomainError::CurrencyMismatch {
                left: self.currency_code.clone(),
                right: other.currency_code.clone(),
            });
        }
        Ok(Self::new(self.currency_code.clone(), self.amount + other.amount))
    }

    pub fn times(&self, quantity: u32) -> Money {
        Self::new(self.currency_code.clone(), self.amount * Decimal::from(quantity))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyWire {
    currency_code: String,
    #[serde(default)]
    units: i64,
    #[serde(default)]
    nanos: i32,
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (units, nanos) = self.units_nanos().ok_or_else(|| {
            ser::Error::custom(format!("amount {} does not fit units/nanos", self.amount))
        })?;
        MoneyWire { currency_code: self.currency_code.clone(), units, nanos }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = MoneyWire::deserialize(deserializer)?;
        if wire.nanos.unsigned_abs() >= NANOS_PER_UNIT as u32 {
            return Err(de::Error::custom("nanos must be within -999,999,999..=999,999,999"));
        }
        Ok(Money::from_units_nanos(wire.currency_code, wire.units, wire.nanos))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceType {
    Actual,
    Estimate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Money,
    #[serde(rename = "type")]
    pub price_type: PriceType,
}

impl Price {
    pub fn actual(amount: Money) -> Self {
        Self { amount, price_type: PriceType::Actual }
    }

    pub fn estimate(amount: Money) -> Self {
        Self { amount, price_type: PriceType::Estimate }
    }
}
