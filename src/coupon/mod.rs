//! Correlation-id derivation and coupon extraction.

use serde_json::{Map, Value};

/// Keys the webhook may use for the coupon, highest priority first.
pub const COUPON_KEYS: [&str; 3] = ["Coupon", "coupon", "CouponCode"];

/// Derives the correlation id from a `_ga` cookie value.
///
/// `GA1.2.1234567890.1764436606` yields `1234567890.1764436606`. Values with
/// fewer than four dot-separated segments are returned unchanged; a missing
/// or empty cookie yields `None`.
pub fn correlation_id(ga_cookie: Option<&str>) -> Option<String> {
    let value = ga_cookie.filter(|value| !value.is_empty())?;
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() >= 4 {
        Some(format!("{}.{}", parts[2], parts[3]))
    } else {
        Some(value.to_string())
    }
}

/// Returns the first usable coupon under [`COUPON_KEYS`].
pub fn extract_coupon(reply: &Map<String, Value>) -> Option<String> {
    COUPON_KEYS
        .iter()
        .find_map(|key| reply.get(*key).and_then(coupon_text))
}

fn coupon_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

/// Renders key names the way the console report shows them: `['a', 'b']`.
pub fn format_keys(reply: &Map<String, Value>) -> String {
    let keys: Vec<String> = reply.keys().map(|key| format!("'{key}'")).collect();
    format!("[{}]", keys.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn four_segments_keep_the_last_two() {
        assert_eq!(
            correlation_id(Some("GA1.2.1234567890.1764436606")).as_deref(),
            Some("1234567890.1764436606")
        );
    }

    #[test]
    fn more_than_four_segments_use_segments_two_and_three() {
        assert_eq!(correlation_id(Some("a.b.c.d.e")).as_deref(), Some("c.d"));
    }

    #[test]
    fn short_values_pass_through() {
        assert_eq!(correlation_id(Some("GA1.2.123")).as_deref(), Some("GA1.2.123"));
        assert_eq!(correlation_id(Some("plain")).as_deref(), Some("plain"));
    }

    #[test]
    fn absent_cookie_has_no_id() {
        assert_eq!(correlation_id(None), None);
        assert_eq!(correlation_id(Some("")), None);
    }

    #[test]
    fn coupon_keys_follow_priority() {
        let reply = object(json!({"CouponCode": "C", "coupon": "B", "Coupon": "A"}));
        assert_eq!(extract_coupon(&reply).as_deref(), Some("A"));

        let reply = object(json!({"CouponCode": "C", "coupon": "B"}));
        assert_eq!(extract_coupon(&reply).as_deref(), Some("B"));
        assert_eq!(extract_coupon(&reply), extract_coupon(&reply));
    }

    #[test]
    fn empty_values_fall_through_to_next_key() {
        let reply = object(json!({"Coupon": "", "coupon": null, "CouponCode": "Z1"}));
        assert_eq!(extract_coupon(&reply).as_deref(), Some("Z1"));
    }

    #[test]
    fn numeric_coupon_is_rendered_as_text() {
        let reply = object(json!({"coupon": 4242}));
        assert_eq!(extract_coupon(&reply).as_deref(), Some("4242"));
    }

    #[test]
    fn missing_keys_yield_none() {
        let reply = object(json!({"status": "ok"}));
        assert_eq!(extract_coupon(&reply), None);
        assert_eq!(format_keys(&reply), "['status']");
        assert_eq!(format_keys(&Map::new()), "[]");
    }
}
