use bookcart_core::config::TransactionConfig;
use bookcart_core::{
    Cart, DomainError, LineItem, LineItemType, Localizer, Location, Merchant, Money, Order,
    SubLine,
};
use rust_decimal::Decimal;

fn price(settings: &TransactionConfig, cents: i64) -> Money {
    Money::new(settings.currency.clone(), Decimal::new(cents, 2))
}

/// The fixed memoir cart offered by the sample store, localized for the turn.
pub fn sample_cart(l10n: &Localizer<'_>, settings: &TransactionConfig) -> Cart {
    Cart {
        merchant: Merchant {
            id: settings.merchant_id.clone(),
            name: l10n.t("order.cart.merchant.name"),
        },
        line_items: vec![
            LineItem::regular("memoirs_1", "My Memoirs", price(settings, 399))
                .sub_line(SubLine::note(l10n.t("order.cart.lineItems1.subLines.note"))),
            LineItem::regular("memoirs_2", "Memoirs of a person", price(settings, 599))
                .sub_line(SubLine::note(l10n.t("order.cart.lineItems2.subLines.note"))),
            LineItem::regular("memoirs_3", "Their memoirs", price(settings, 1575)).sub_line(
                SubLine::line_item(LineItem::regular(
                    "memoirs_epilogue",
                    "Special memoir epilogue",
                    price(settings, 399),
                )),
            ),
            LineItem::regular("memoirs_4", "Our memoirs", price(settings, 649))
                .sub_line(SubLine::note(l10n.t("order.cart.lineItems4.subLines.note"))),
        ],
        notes: Some(l10n.t("order.cart.notes")),
        other_items: Vec::new(),
    }
}

/// Prices the sample cart and attaches the stored delivery address, if any.
pub fn sample_order(
    l10n: &Localizer<'_>,
    settings: &TransactionConfig,
    delivery_address: Option<&Location>,
) -> Result<Order, DomainError> {
    let tax = LineItem::aggregate(
        "tax",
        l10n.t("order.cart.otherItems2.name"),
        price(settings, 278),
        LineItemType::Tax,
    );

    let order = Order::assemble(
        settings.order_id.clone(),
        sample_cart(l10n, settings),
        l10n.t("order.cart.otherItems1.name"),
        tax,
    )?;
    order.verify_totals()?;

    Ok(match delivery_address {
        Some(location) => order.with_delivery_location(location),
        None => order,
    })
}
