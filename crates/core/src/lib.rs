pub mod config;
pub mod domain;
pub mod errors;
pub mod i18n;

pub use domain::address::{Location, PostalAddress};
pub use domain::money::{Money, Price, PriceType};
pub use domain::order::{
    Cart, LineItem, LineItemType, Merchant, Order, OrderExtension, OrderLocation, SubLine,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use i18n::{Catalogs, Locale, Localizer};
