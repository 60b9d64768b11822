/// Validates a `*.myshopify.com` shop domain.
/// Rules:
/// - Lowercase ASCII letters, digits and hyphens before the suffix
/// - The store handle starts with a letter or digit
/// - Ends with `.myshopify.com`
pub fn is_valid_shop_domain(shop: &str) -> bool {
    let Some(handle) = shop.strip_suffix(".myshopify.com") else {
        return false;
    };

    if handle.is_empty() || handle.len() > 60 {
        return false;
    }

    let Some(first) = handle.chars().next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_shop_domains() {
        assert!(is_valid_shop_domain("green-goods.myshopify.com"));
        assert!(is_valid_shop_domain("shop123.myshopify.com"));
        assert!(is_valid_shop_domain("1st-store.myshopify.com"));
    }

    #[test]
    fn test_invalid_shop_domains() {
        assert!(!is_valid_shop_domain(""));
        assert!(!is_valid_shop_domain(".myshopify.com"));
        assert!(!is_valid_shop_domain("green-goods.com"));
        assert!(!is_valid_shop_domain("Green-Goods.myshopify.com"));
        assert!(!is_valid_shop_domain("-shop.myshopify.com"));
        assert!(!is_valid_shop_domain("evil.com/x.myshopify.com"));
        assert!(!is_valid_shop_domain("a.b.myshopify.com"));
        assert!(!is_valid_shop_domain(&format!("{}.myshopify.com", "a".repeat(61))));
    }
}
