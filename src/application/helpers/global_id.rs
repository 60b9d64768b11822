//! Normalization of Shopify resource identifiers.
//!
//! Webhook payloads carry numeric REST ids (`7890`) while the Admin GraphQL API
//! and stored settings use global ids (`gid://shopify/ProductVariant/7890`).
//! Both are reduced to their trailing local id before comparison.

use crate::domain::entities::order::RawId;

const GID_SCHEME: &str = "gid://";

/// Reduce a raw identifier to its local id.
///
/// Returns `None` for empty input and for global ids without a resource segment.
pub fn parse_global_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(rest) = trimmed.strip_prefix(GID_SCHEME) else {
        return Some(trimmed.to_string());
    };

    // gid://shopify/Order/123?key=value
    let path = rest.split('?').next().unwrap_or(rest);
    let mut segments = path.split('/');
    let _app = segments.next()?;
    let _resource = segments.next().filter(|s| !s.is_empty())?;
    let local = segments.last().filter(|s| !s.is_empty())?;

    Some(local.to_string())
}

/// Normalize an id taken from a webhook payload.
pub fn normalize_raw_id(id: &RawId) -> Option<String> {
    match id {
        RawId::Number(n) => Some(n.to_string()),
        RawId::Text(s) => parse_global_id(s),
    }
}
