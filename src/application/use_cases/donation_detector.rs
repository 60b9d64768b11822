use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    application::helpers::{
        global_id::{normalize_raw_id, parse_global_id},
        metafield_codec::DecodedMetafields,
    },
    domain::entities::{
        metafield::{
            CART_ENABLED_KEY, DONATION_AMOUNT_KEY, DONATION_ENABLED_KEY, DONATION_PRODUCT_ID_KEY,
            DONATION_VARIANT_ID_KEY, LEGACY_PRODUCT_ID_KEY,
        },
        order::{LineItem, OrderPayload},
    },
};

/// Line item property the storefront widget attaches to donation items.
pub const DONATION_PROPERTY: &str = "_tree_donation";

pub const DEFAULT_DONATION_AMOUNT: &str = "5.00";

/// Donation configuration as the merchant saved it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationSettings {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub donation_amount: String,
    pub donation_enabled: bool,
    pub cart_enabled: bool,
}

impl DonationSettings {
    /// Every key `from_fields` reads.
    pub const KEYS: &'static [&'static str] = &[
        DONATION_PRODUCT_ID_KEY,
        LEGACY_PRODUCT_ID_KEY,
        DONATION_VARIANT_ID_KEY,
        DONATION_AMOUNT_KEY,
        DONATION_ENABLED_KEY,
        CART_ENABLED_KEY,
    ];

    pub fn from_fields(fields: &DecodedMetafields) -> Self {
        let id = |key: &str| {
            fields
                .get(key)
                .and_then(|v| v.as_id())
                .and_then(|raw| parse_global_id(&raw))
        };
        let flag = |key: &str| fields.get(key).and_then(|v| v.as_bool()).unwrap_or(false);

        let donation_amount = fields
            .get(DONATION_AMOUNT_KEY)
            .and_then(|v| match v.as_str() {
                Some(s) => Some(s.trim().to_string()),
                None => v.as_f64().map(|n| format!("{:.2}", n)),
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DONATION_AMOUNT.to_string());

        Self {
            product_id: id(DONATION_PRODUCT_ID_KEY).or_else(|| id(LEGACY_PRODUCT_ID_KEY)),
            variant_id: id(DONATION_VARIANT_ID_KEY),
            donation_amount,
            donation_enabled: flag(DONATION_ENABLED_KEY),
            cart_enabled: flag(CART_ENABLED_KEY),
        }
    }

    pub fn product_ref(&self) -> DonationProductRef {
        DonationProductRef {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }
}

/// Normalized identifiers of the donation product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationProductRef {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
}

impl DonationProductRef {
    /// Id matching needs both identifiers.
    pub fn is_configured(&self) -> bool {
        self.product_id.is_some() && self.variant_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    VariantId,
    ProductId,
    DonationProperty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLineItem {
    pub index: usize,
    pub reason: MatchReason,
    pub quantity: i64,
    pub unit_price: f64,
    pub name: Option<String>,
}

/// Donation found in an order, summed over every matching line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationMatch {
    pub quantity: i64,
    /// Price of the first matching item.
    pub unit_price: f64,
    pub amount: f64,
    pub matched_line_items: Vec<MatchedLineItem>,
}

/// Find donation line items in `order`.
pub fn detect(order: &OrderPayload, product: &DonationProductRef) -> Option<DonationMatch> {
    let matched: Vec<MatchedLineItem> = order
        .line_items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let reason = match_reason(item, product)?;
            Some(MatchedLineItem {
                index,
                reason,
                quantity: item.quantity.filter(|q| *q > 0).unwrap_or(1),
                unit_price: unit_price(item),
                name: item.name.clone(),
            })
        })
        .collect();

    let quantity: i64 = matched.iter().map(|m| m.quantity).sum();
    if quantity == 0 {
        return None;
    }

    let amount = matched
        .iter()
        .map(|m| m.unit_price * m.quantity as f64)
        .sum::<f64>();

    Some(DonationMatch {
        quantity,
        unit_price: matched[0].unit_price,
        amount: round_cents(amount),
        matched_line_items: matched,
    })
}

fn match_reason(item: &LineItem, product: &DonationProductRef) -> Option<MatchReason> {
    if let (Some(product_id), Some(variant_id)) = (&product.product_id, &product.variant_id) {
        let item_variant = item.variant_id.as_ref().and_then(normalize_raw_id);
        if item_variant.as_deref() == Some(variant_id.as_str()) {
            return Some(MatchReason::VariantId);
        }

        let item_product = item.product_id.as_ref().and_then(normalize_raw_id);
        if item_product.as_deref() == Some(product_id.as_str()) {
            return Some(MatchReason::ProductId);
        }
    }

    has_donation_property(item).then_some(MatchReason::DonationProperty)
}

fn has_donation_property(item: &LineItem) -> bool {
    item.properties.iter().flatten().any(|prop| {
        prop.name == DONATION_PROPERTY
            && match &prop.value {
                JsonValue::Bool(b) => *b,
                JsonValue::String(s) => s == "true" || s == "1",
                JsonValue::Number(n) => n.as_i64() == Some(1),
                _ => false,
            }
    })
}

fn unit_price(item: &LineItem) -> f64 {
    let shop_money = item
        .price_set
        .as_ref()
        .and_then(|set| set.shop_money.as_ref())
        .and_then(|money| money.amount.as_ref());

    item.price
        .as_ref()
        .and_then(parse_amount)
        .or_else(|| shop_money.and_then(parse_amount))
        .unwrap_or(0.0)
}

fn parse_amount(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
