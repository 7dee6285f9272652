use serde::{Deserialize, Serialize};

use crate::domain::address::Location;
use crate::domain::money::{Money, Price};
use crate::errors::DomainError;

pub const GENERIC_EXTENSION_TYPE: &str =
    "type.googleapis.com/google.actions.v2.orders.GenericExtension";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemType {
    Regular,
    Subtotal,
    Tax,
    Discount,
    Delivery,
    Fee,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub id: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_lines: Vec<SubLine>,
    #[serde(rename = "type")]
    pub item_type: LineItemType,
}

impl LineItem {
    pub fn regular(id: impl Into<String>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            price: Price::actual(unit_price),
            quantity: Some(1),
            sub_lines: Vec::new(),
            item_type: LineItemType::Regular,
        }
    }

    pub fn aggregate(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        item_type: LineItemType,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            price: Price::estimate(amount),
            quantity: None,
            sub_lines: Vec::new(),
            item_type,
        }
    }

    pub fn sub_line(mut self, sub_line: SubLine) -> Self {
        self.sub_lines.push(sub_line);
        self
    }

    /// Price times quantity. Nested sub-line items are already included in the parent price.
    pub fn extended_price(&self) -> Money {
        self.price.amount.times(self.quantity.unwrap_or(1))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubLine {
    Note {
        note: String,
    },
    LineItem {
        #[serde(rename = "lineItem")]
        line_item: Box<LineItem>,
    },
}

impl SubLine {
    pub fn note(note: impl Into<String>) -> Self {
        Self::Note { note: note.into() }
    }

    pub fn line_item(line_item: LineItem) -> Self {
        Self::LineItem { line_item: Box::new(line_item) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub merchant: Merchant,
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub other_items: Vec<LineItem>,
}

impl Cart {
    pub fn line_items_total(&self, currency_code: &str) -> Result<Money, DomainError> {
        self.line_items.iter().try_fold(Money::zero(currency_code), |total, item| {
            total.checked_add(&item.extended_price())
        })
    }

    pub fn other_item(&self, item_type: LineItemType) -> Option<&LineItem> {
        self.other_items.iter().find(|item| item.item_type == item_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderLocationType {
    Delivery,
    Pickup,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLocation {
    #[serde(rename = "type")]
    pub location_type: OrderLocationType,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExtension {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub locations: Vec<OrderLocation>,
}

impl OrderExtension {
    /// Generic extension carrying only the postal part of the stored location.
    pub fn delivery(location: &Location) -> Self {
        Self {
            type_url: GENERIC_EXTENSION_TYPE.to_owned(),
            locations: vec![OrderLocation {
                location_type: OrderLocationType::Delivery,
                location: Location {
                    postal_address: location.postal_address.clone(),
                    ..Location::default()
                },
            }],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub cart: Cart,
    #[serde(default)]
    pub other_items: Vec<LineItem>,
    pub total_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<OrderExtension>,
}

impl Order {
    /// Prices a cart: appends the subtotal and tax aggregates and derives the total from them.
    pub fn assemble(
        id: impl Into<String>,
        mut cart: Cart,
        subtotal_name: impl Into<String>,
        tax: LineItem,
    ) -> Result<Self, DomainError> {
        let currency_code = tax.price.amount.currency_code.clone();
        let subtotal = cart.line_items_total(&currency_code)?;
        let total = subtotal.checked_add(&tax.price.amount)?;

        cart.other_items = vec![
            LineItem::aggregate("subtotal", subtotal_name, subtotal, LineItemType::Subtotal),
            tax,
        ];

        Ok(Self {
            id: id.into(),
            cart,
            other_items: Vec::new(),
            total_price: Price::estimate(total),
            extension: None,
        })
    }

    pub fn with_delivery_location(mut self, location: &Location) -> Self {
        self.extension = Some(OrderExtension::delivery(location));
        self
    }

    pub fn delivery_location(&self) -> Option<&Location> {
        self.extension
            .as_ref()?
            .locations
            .iter()
            .find(|entry| entry.location_type == OrderLocationType::Delivery)
            .map(|entry| &entry.location)
    }

    /// The total must equal the line items plus every non-subtotal aggregate, and a
    /// subtotal aggregate, when present, must equal the line items.
    pub fn verify_totals(&self) -> Result<(), DomainError> {
        let currency_code = self.total_price.amount.currency_code.as_str();
        let line_total = self.cart.line_items_total(currency_code)?;

        if let Some(subtotal) = self.cart.other_item(LineItemType::Subtotal) {
            if subtotal.price.amount != line_total {
                return Err(DomainError::InvariantViolation(format!(
                    "order `{}` subtotal {} does not match line items {}",
                    self.id, subtotal.price.amount.amount, line_total.amount
                )));
            }
        }

        let expected = self
            .cart
            .other_items
            .iter()
            .chain(self.other_items.iter())
            .filter(|item| item.item_type != LineItemType::Subtotal)
            .try_fold(line_total, |total, item| total.checked_add(&item.extended_price()))?;

        if expected != self.total_price.amount {
            return Err(DomainError::InvariantViolation(format!(
                "order `{}` total {} does not match computed {}",
                self.id, self.total_price.amount.amount, expected.amount
            )));
        }

        Ok(())
    }
}
