//! Request bodies for the Klaviyo bulk subscription jobs.
//!
//! The primary shapes put the list in `relationships`; the fallback shapes
//! use the legacy form with `list_id` inside `attributes`.

use serde_json::{json, Map, Value};

pub const SUBSCRIBE_JOB_TYPE: &str = "profile-subscription-bulk-create-job";
pub const UNSUBSCRIBE_JOB_TYPE: &str = "profile-subscription-bulk-delete-job";

fn list_relationship(list_id: &str) -> Value {
    json!({"list": {"data": {"type": "list", "id": list_id}}})
}

fn profile(email: &str, phone: Option<&str>, consent: &str) -> Value {
    let mut subscriptions = Map::new();
    subscriptions.insert(
        "email".to_string(),
        json!({"marketing": {"consent": consent}}),
    );

    let mut attributes = Map::new();
    attributes.insert("email".to_string(), json!(email));
    if let Some(phone) = phone {
        attributes.insert("phone_number".to_string(), json!(phone));
        subscriptions.insert("sms".to_string(), json!({"marketing": {"consent": consent}}));
    }
    attributes.insert("subscriptions".to_string(), Value::Object(subscriptions));

    json!({"type": "profile", "attributes": attributes})
}

pub fn subscribe_primary(
    list_id: &str,
    email: &str,
    phone: Option<&str>,
    custom_source: Option<&str>,
) -> Value {
    let mut attributes = Map::new();
    if let Some(source) = custom_source {
        attributes.insert("custom_source".to_string(), json!(source));
    }
    attributes.insert(
        "profiles".to_string(),
        json!({"data": [profile(email, phone, "SUBSCRIBED")]}),
    );

    json!({
        "data": {
            "type": SUBSCRIBE_JOB_TYPE,
            "attributes": attributes,
            "relationships": list_relationship(list_id),
        }
    })
}

pub fn subscribe_fallback(
    list_id: &str,
    email: &str,
    phone: Option<&str>,
    custom_source: Option<&str>,
) -> Value {
    let mut channels = Map::new();
    channels.insert("email".to_string(), json!(["MARKETING"]));

    let mut subscription = Map::new();
    subscription.insert("email".to_string(), json!(email));
    if let Some(phone) = phone {
        subscription.insert("phone_number".to_string(), json!(phone));
        channels.insert("sms".to_string(), json!(["MARKETING"]));
    }
    subscription.insert("channels".to_string(), Value::Object(channels));

    let mut attributes = Map::new();
    attributes.insert("list_id".to_string(), json!(list_id));
    if let Some(source) = custom_source {
        attributes.insert("custom_source".to_string(), json!(source));
    }
    attributes.insert("subscriptions".to_string(), json!([subscription]));

    json!({"data": {"type": SUBSCRIBE_JOB_TYPE, "attributes": attributes}})
}

pub fn unsubscribe_primary(list_id: &str, email: &str) -> Value {
    json!({
        "data": {
            "type": UNSUBSCRIBE_JOB_TYPE,
            "attributes": {
                "profiles": {"data": [profile(email, None, "UNSUBSCRIBED")]}
            },
            "relationships": list_relationship(list_id),
        }
    })
}

pub fn unsubscribe_fallback(list_id: &str, email: &str) -> Value {
    json!({
        "data": {
            "type": UNSUBSCRIBE_JOB_TYPE,
            "attributes": {"list_id": list_id, "emails": [email]}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_subscribe_puts_list_in_relationships() {
        let body = subscribe_primary("L1", "ana@example.com", Some("+5511987654321"), Some("guru"));

        assert_eq!(body["data"]["type"], SUBSCRIBE_JOB_TYPE);
        assert_eq!(body["data"]["relationships"]["list"]["data"]["id"], "L1");
        assert_eq!(body["data"]["attributes"]["custom_source"], "guru");

        let profile = &body["data"]["attributes"]["profiles"]["data"][0]["attributes"];
        assert_eq!(profile["email"], "ana@example.com");
        assert_eq!(profile["phone_number"], "+5511987654321");
        assert_eq!(profile["subscriptions"]["email"]["marketing"]["consent"], "SUBSCRIBED");
        assert_eq!(profile["subscriptions"]["sms"]["marketing"]["consent"], "SUBSCRIBED");
    }

    #[test]
    fn primary_subscribe_without_phone_has_email_channel_only() {
        let body = subscribe_primary("L1", "ana@example.com", None, None);
        let profile = &body["data"]["attributes"]["profiles"]["data"][0]["attributes"];

        assert!(profile.get("phone_number").is_none());
        assert!(profile["subscriptions"].get("sms").is_none());
        assert!(body["data"]["attributes"].get("custom_source").is_none());
    }

    #[test]
    fn fallback_subscribe_carries_list_id_in_attributes() {
        let body = subscribe_fallback("L1", "ana@example.com", None, None);

        assert!(body["data"].get("relationships").is_none());
        assert_eq!(body["data"]["attributes"]["list_id"], "L1");
        assert_eq!(
            body["data"]["attributes"]["subscriptions"][0]["channels"]["email"][0],
            "MARKETING"
        );
    }

    #[test]
    fn unsubscribe_shapes_differ_by_list_placement() {
        let primary = unsubscribe_primary("L1", "ana@example.com");
        let fallback = unsubscribe_fallback("L1", "ana@example.com");

        assert_eq!(primary["data"]["type"], UNSUBSCRIBE_JOB_TYPE);
        assert_eq!(primary["data"]["relationships"]["list"]["data"]["id"], "L1");
        assert_eq!(fallback["data"]["attributes"]["list_id"], "L1");
        assert_eq!(fallback["data"]["attributes"]["emails"][0], "ana@example.com");
    }
}
