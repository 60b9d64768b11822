//! Shopify Admin GraphQL client bound to one shop.
//!
//! Implements both the metafield store (app-installation metafields) and the
//! billing provider (app subscriptions and usage records).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value as JsonValue, json};
use tokio::sync::OnceCell;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            billing_provider::{BillingProviderPort, SubscriptionCreated, UsageCharge},
            metafield_store::MetafieldStoreTrait,
        },
        use_cases::shop_services::{ShopClients, ShopConnectorTrait},
    },
    domain::entities::{
        metafield::{MetafieldRecord, MetafieldType},
        pricing_plan::PlanDefinition,
        subscription::ActiveSubscription,
    },
    infra::session_store::ShopSessionStoreTrait,
};

/// Largest page the Admin API serves for a metafields connection.
const METAFIELDS_PAGE_SIZE: usize = 250;

// ============================================================================
// GraphQL documents
// ============================================================================

const INSTALLATION_ID_QUERY: &str = r#"
query AppInstallationId {
  currentAppInstallation { id }
}"#;

const METAFIELD_QUERY: &str = r#"
query AppMetafield($namespace: String!, $key: String!) {
  currentAppInstallation {
    metafield(namespace: $namespace, key: $key) { namespace key value type }
  }
}"#;

const METAFIELDS_QUERY: &str = r#"
query AppMetafields($namespace: String!, $first: Int!, $after: String) {
  currentAppInstallation {
    metafields(namespace: $namespace, first: $first, after: $after) {
      nodes { namespace key value type }
      pageInfo { hasNextPage endCursor }
    }
  }
}"#;

const METAFIELDS_BY_KEY_QUERY: &str = r#"
query AppMetafieldsByKey($keys: [String!]!, $first: Int!) {
  currentAppInstallation {
    metafields(keys: $keys, first: $first) {
      nodes { namespace key value type }
      pageInfo { hasNextPage endCursor }
    }
  }
}"#;

const METAFIELDS_SET_MUTATION: &str = r#"
mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { key }
    userErrors { field message }
  }
}"#;

const METAFIELDS_DELETE_MUTATION: &str = r#"
mutation MetafieldsDelete($metafields: [MetafieldIdentifierInput!]!) {
  metafieldsDelete(metafields: $metafields) {
    deletedMetafields { key }
    userErrors { field message }
  }
}"#;

const ACTIVE_SUBSCRIPTIONS_QUERY: &str = r#"
query ActiveSubscriptions {
  currentAppInstallation {
    activeSubscriptions {
      id
      name
      status
      test
      lineItems {
        id
        plan {
          pricingDetails {
            __typename
            ... on AppRecurringPricing {
              interval
              price { amount currencyCode }
            }
            ... on AppUsagePricing {
              terms
              balanceUsed { amount currencyCode }
              cappedAmount { amount currencyCode }
            }
          }
        }
      }
    }
  }
}"#;

const SUBSCRIPTION_CREATE_MUTATION: &str = r#"
mutation AppSubscriptionCreate(
  $name: String!
  $returnUrl: URL!
  $test: Boolean
  $lineItems: [AppSubscriptionLineItemInput!]!
) {
  appSubscriptionCreate(name: $name, returnUrl: $returnUrl, test: $test, lineItems: $lineItems) {
    appSubscription { id }
    confirmationUrl
    userErrors { field message }
  }
}"#;

const SUBSCRIPTION_CANCEL_MUTATION: &str = r#"
mutation AppSubscriptionCancel($id: ID!) {
  appSubscriptionCancel(id: $id) {
    appSubscription { id status }
    userErrors { field message }
  }
}"#;

const USAGE_RECORD_CREATE_MUTATION: &str = r#"
mutation AppUsageRecordCreate(
  $subscriptionLineItemId: ID!
  $price: MoneyInput!
  $description: String!
  $idempotencyKey: String
) {
  appUsageRecordCreate(
    subscriptionLineItemId: $subscriptionLineItemId
    price: $price
    description: $description
    idempotencyKey: $idempotencyKey
  ) {
    appUsageRecord { id }
    userErrors { field message }
  }
}"#;

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallationData<T> {
    current_app_installation: T,
}

#[derive(Debug, Deserialize)]
struct InstallationId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SingleMetafield {
    metafield: Option<MetafieldRecord>,
}

#[derive(Debug, Deserialize)]
struct MetafieldConnection {
    metafields: Page<MetafieldRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    nodes: Vec<T>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveSubscriptions {
    active_subscriptions: Vec<ActiveSubscription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetData {
    metafields_set: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsDeleteData {
    metafields_delete: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionCancelData {
    app_subscription_cancel: MutationPayload,
}

/// Mutation payload where only `userErrors` matters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionCreateData {
    app_subscription_create: SubscriptionCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionCreatePayload {
    app_subscription: Option<IdOnly>,
    confirmation_url: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageRecordCreateData {
    app_usage_record_create: UsageRecordCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageRecordCreatePayload {
    app_usage_record: Option<IdOnly>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

fn check_user_errors(operation: &str, errors: &[UserError]) -> AppResult<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let messages: Vec<String> = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect();

    Err(AppError::Shopify(format!(
        "{} failed: {}",
        operation,
        messages.join("; ")
    )))
}

fn graphql_url(shop: &str, api_version: &str) -> String {
    format!("https://{}/admin/api/{}/graphql.json", shop, api_version)
}

/// `namespace.key` identifiers accepted by the `keys` metafields filter.
fn qualified_keys(namespace: &str, keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| format!("{}.{}", namespace, key)).collect()
}

/// Decimal string accepted by `MoneyInput.amount`.
fn money_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

// ============================================================================
// ShopifyAdminClient
// ============================================================================

pub struct ShopifyAdminClient {
    client: Client,
    shop: String,
    endpoint: String,
    access_token: SecretString,
    installation_id: OnceCell<String>,
}

impl ShopifyAdminClient {
    pub fn new(client: Client, shop: &str, api_version: &str, access_token: SecretString) -> Self {
        Self {
            client,
            shop: shop.to_string(),
            endpoint: graphql_url(shop, api_version),
            access_token,
            installation_id: OnceCell::new(),
        }
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: JsonValue) -> AppResult<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| AppError::Shopify(format!("Admin API request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Shopify(format!("Failed to read response: {}", e)))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(shop = %self.shop, status = %status, "Admin API rejected access token");
            return Err(AppError::SessionNotFound);
        }

        if !status.is_success() {
            tracing::error!(shop = %self.shop, status = %status, body = %body, "Admin API error");
            return Err(AppError::Shopify(format!("Admin API error: {} - {}", status, body)));
        }

        let parsed: GraphQlResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Admin API response");
            AppError::Shopify(format!("Failed to parse Admin API response: {}", e))
        })?;

        if !parsed.errors.is_empty() {
            let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(AppError::Shopify(messages.join("; ")));
        }

        parsed
            .data
            .ok_or_else(|| AppError::Shopify("Admin API response without data".into()))
    }

    /// Owner id for installation metafields, fetched once per client.
    async fn installation_id(&self) -> AppResult<&str> {
        self.installation_id
            .get_or_try_init(|| async {
                let data: InstallationData<InstallationId> =
                    self.execute(INSTALLATION_ID_QUERY, json!({})).await?;
                Ok::<_, AppError>(data.current_app_installation.id)
            })
            .await
            .map(String::as_str)
    }
}

// ============================================================================
// Metafields
// ============================================================================

#[async_trait]
impl MetafieldStoreTrait for ShopifyAdminClient {
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<MetafieldRecord>> {
        let data: InstallationData<SingleMetafield> = self
            .execute(METAFIELD_QUERY, json!({ "namespace": namespace, "key": key }))
            .await?;
        Ok(data.current_app_installation.metafield)
    }

    async fn get_many(&self, namespace: &str, keys: &[&str]) -> AppResult<Vec<MetafieldRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(METAFIELDS_PAGE_SIZE) {
            let data: InstallationData<MetafieldConnection> = self
                .execute(
                    METAFIELDS_BY_KEY_QUERY,
                    json!({ "keys": qualified_keys(namespace, chunk), "first": chunk.len() }),
                )
                .await?;
            records.extend(data.current_app_installation.metafields.nodes);
        }
        Ok(records)
    }

    async fn get_all(&self, namespace: &str) -> AppResult<Vec<MetafieldRecord>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: InstallationData<MetafieldConnection> = self
                .execute(
                    METAFIELDS_QUERY,
                    json!({
                        "namespace": namespace,
                        "first": METAFIELDS_PAGE_SIZE,
                        "after": after,
                    }),
                )
                .await?;
            let page = data.current_app_installation.metafields;
            records.extend(page.nodes);

            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value_type: MetafieldType,
        value: &str,
    ) -> AppResult<()> {
        let owner_id = self.installation_id().await?;
        let data: MetafieldsSetData = self
            .execute(
                METAFIELDS_SET_MUTATION,
                json!({
                    "metafields": [{
                        "ownerId": owner_id,
                        "namespace": namespace,
                        "key": key,
                        "type": value_type.as_ref(),
                        "value": value,
                    }]
                }),
            )
            .await?;
        check_user_errors("metafieldsSet", &data.metafields_set.user_errors)
    }

    async fn delete(&self, namespace: &str, key: &str) -> AppResult<()> {
        let owner_id = self.installation_id().await?;
        let data: MetafieldsDeleteData = self
            .execute(
                METAFIELDS_DELETE_MUTATION,
                json!({
                    "metafields": [{ "ownerId": owner_id, "namespace": namespace, "key": key }]
                }),
            )
            .await?;
        check_user_errors("metafieldsDelete", &data.metafields_delete.user_errors)
    }
}

// ============================================================================
// Billing
// ============================================================================

#[async_trait]
impl BillingProviderPort for ShopifyAdminClient {
    async fn list_active_subscriptions(&self) -> AppResult<Vec<ActiveSubscription>> {
        let data: InstallationData<ActiveSubscriptions> =
            self.execute(ACTIVE_SUBSCRIPTIONS_QUERY, json!({})).await?;
        Ok(data.current_app_installation.active_subscriptions)
    }

    async fn create_subscription(
        &self,
        plan: &PlanDefinition,
        return_url: &str,
        test: bool,
    ) -> AppResult<SubscriptionCreated> {
        let data: SubscriptionCreateData = self
            .execute(
                SUBSCRIPTION_CREATE_MUTATION,
                json!({
                    "name": plan.name,
                    "returnUrl": return_url,
                    "test": test,
                    "lineItems": [{
                        "plan": {
                            "appRecurringPricingDetails": {
                                "price": { "amount": plan.price, "currencyCode": plan.currency },
                                "interval": plan.interval,
                            }
                        }
                    }]
                }),
            )
            .await?;

        let payload = data.app_subscription_create;
        check_user_errors("appSubscriptionCreate", &payload.user_errors)?;

        match (payload.app_subscription, payload.confirmation_url) {
            (Some(subscription), Some(confirmation_url)) => Ok(SubscriptionCreated {
                subscription_id: subscription.id,
                confirmation_url,
            }),
            _ => Err(AppError::Shopify(
                "appSubscriptionCreate returned no confirmation URL".into(),
            )),
        }
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let data: SubscriptionCancelData = self
            .execute(SUBSCRIPTION_CANCEL_MUTATION, json!({ "id": subscription_id }))
            .await?;
        check_user_errors("appSubscriptionCancel", &data.app_subscription_cancel.user_errors)
    }

    async fn record_usage_charge(&self, charge: &UsageCharge) -> AppResult<String> {
        let data: UsageRecordCreateData = self
            .execute(
                USAGE_RECORD_CREATE_MUTATION,
                json!({
                    "subscriptionLineItemId": charge.line_item_id,
                    "price": {
                        "amount": money_amount(charge.amount),
                        "currencyCode": charge.currency,
                    },
                    "description": charge.description,
                    "idempotencyKey": charge.idempotency_key,
                }),
            )
            .await?;

        let payload = data.app_usage_record_create;
        check_user_errors("appUsageRecordCreate", &payload.user_errors)?;
        payload
            .app_usage_record
            .map(|record| record.id)
            .ok_or_else(|| AppError::Shopify("appUsageRecordCreate returned no record".into()))
    }
}

// ============================================================================
// ShopifyConnector
// ============================================================================

/// Builds `ShopifyAdminClient`s from stored offline sessions.
pub struct ShopifyConnector {
    client: Client,
    sessions: Arc<dyn ShopSessionStoreTrait>,
    api_version: String,
}

impl ShopifyConnector {
    pub fn new(
        client: Client,
        sessions: Arc<dyn ShopSessionStoreTrait>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            sessions,
            api_version: api_version.into(),
        }
    }
}

#[async_trait]
impl ShopConnectorTrait for ShopifyConnector {
    async fn connect(&self, shop: &str) -> AppResult<ShopClients> {
        let token = self
            .sessions
            .access_token(shop)
            .await?
            .ok_or(AppError::SessionNotFound)?;

        let admin = Arc::new(ShopifyAdminClient::new(
            self.client.clone(),
            shop,
            &self.api_version,
            token,
        ));

        Ok(ShopClients {
            store: admin.clone(),
            billing: admin,
        })
    }
}
