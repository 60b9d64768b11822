//! Test data factories.
//!
//! Each factory returns a valid fixture; the closure adjusts fields per test.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

use crate::{
    application::{jwt::SessionTokenClaims, ports::usage_backend::StoreInfo},
    domain::entities::{
        order::{LineItem, Money, OrderCustomer, OrderPayload, PriceSet, RawId},
        pricing_plan::PricingPlan,
        subscription::{
            ActiveSubscription, MoneyV2, PricingDetails, SubscriptionLineItem,
            SubscriptionLineItemPlan,
        },
    },
    test_utils::{TEST_SHOPIFY_API_KEY, TEST_SHOPIFY_API_SECRET},
};

/// Donation line item for product `111` / variant `222` at 5.00.
pub fn create_test_line_item(overrides: impl FnOnce(&mut LineItem)) -> LineItem {
    let mut item = LineItem {
        product_id: Some(RawId::Number(111)),
        variant_id: Some(RawId::Number(222)),
        quantity: Some(1),
        price: Some(json!("5.00")),
        price_set: Some(PriceSet {
            shop_money: Some(Money {
                amount: Some(json!("5.00")),
                currency_code: Some("USD".to_string()),
            }),
        }),
        properties: None,
        name: Some("Plant a tree".to_string()),
    };
    overrides(&mut item);
    item
}

pub fn create_test_order(overrides: impl FnOnce(&mut OrderPayload)) -> OrderPayload {
    let mut order = OrderPayload {
        id: Some(RawId::Number(820_982_911_946_154_508)),
        name: Some("#9999".to_string()),
        line_items: vec![create_test_line_item(|_| {})],
        currency: Some("USD".to_string()),
        customer: Some(OrderCustomer {
            email: Some("buyer@example.com".to_string()),
        }),
    };
    overrides(&mut order);
    order
}

/// Active recurring subscription for a paid `plan`.
pub fn create_test_subscription(
    plan: PricingPlan,
    overrides: impl FnOnce(&mut ActiveSubscription),
) -> ActiveSubscription {
    let definition = plan
        .definition()
        .expect("test subscriptions need a paid plan");

    let mut subscription = ActiveSubscription {
        id: format!("gid://shopify/AppSubscription/{}", plan.as_ref()),
        name: definition.name,
        status: "ACTIVE".to_string(),
        test: true,
        line_items: vec![SubscriptionLineItem {
            id: Some(format!("gid://shopify/AppSubscriptionLineItem/{}-recurring", plan.as_ref())),
            plan: Some(SubscriptionLineItemPlan {
                pricing_details: Some(PricingDetails::AppRecurringPricing {
                    interval: Some(definition.interval),
                    price: MoneyV2 {
                        amount: definition.price,
                        currency_code: definition.currency,
                    },
                }),
            }),
        }],
    };
    overrides(&mut subscription);
    subscription
}

/// Add a usage-priced line item with id `line_item_id`.
pub fn with_usage_line_item(
    mut subscription: ActiveSubscription,
    line_item_id: &str,
) -> ActiveSubscription {
    subscription.line_items.push(SubscriptionLineItem {
        id: Some(line_item_id.to_string()),
        plan: Some(SubscriptionLineItemPlan {
            pricing_details: Some(PricingDetails::AppUsagePricing {
                terms: Some("Per planted tree".to_string()),
                balance_used: Some(MoneyV2 {
                    amount: "0.0".to_string(),
                    currency_code: "USD".to_string(),
                }),
                capped_amount: Some(MoneyV2 {
                    amount: "500.0".to_string(),
                    currency_code: "USD".to_string(),
                }),
            }),
        }),
    });
    subscription
}

pub fn create_test_store_info(overrides: impl FnOnce(&mut StoreInfo)) -> StoreInfo {
    let mut info = StoreInfo {
        shop_domain: "green-goods.myshopify.com".to_string(),
        name: Some("Green Goods".to_string()),
        email: Some("owner@green-goods.example".to_string()),
        country: Some("DE".to_string()),
        currency: Some("EUR".to_string()),
        plan_name: Some("basic".to_string()),
    };
    overrides(&mut info);
    info
}

/// Session token for `shop`, valid for a minute, signed with the test app secret.
pub fn create_test_session_token(
    shop: &str,
    overrides: impl FnOnce(&mut SessionTokenClaims),
) -> String {
    let now = Utc::now().timestamp();
    let mut claims = SessionTokenClaims {
        iss: format!("https://{}/admin", shop),
        dest: format!("https://{}", shop),
        aud: TEST_SHOPIFY_API_KEY.to_string(),
        sub: Some("42".to_string()),
        exp: now + 60,
        nbf: now,
        iat: now,
        jti: Some("00000000-0000-4000-8000-000000000000".to_string()),
        sid: None,
    };
    overrides(&mut claims);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SHOPIFY_API_SECRET.as_bytes()),
    )
    .unwrap()
}
