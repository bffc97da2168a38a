//! Cross-stage metadata
//!
//! Every batch travels with a free-form string-keyed map. Stages copy what they
//! receive, stamp their own `source`/`timestamp`, and pass the union on.
//! Unknown keys are always preserved.

use crate::{Address, CorrelationId};
use chrono::Utc;
use serde_json::Value;

/// String-keyed metadata map
pub type Metadata = serde_json::Map<String, Value>;

/// Well-known metadata keys
pub mod keys {
    pub const SOURCE: &str = "source";
    pub const TIMESTAMP: &str = "timestamp";
    pub const SALES_SPEC: &str = "sales_spec";
    pub const COMPANY_NAME: &str = "company_name";
    pub const BOUNTY_AMOUNT: &str = "bounty_amount";
    pub const REQUEST_ID: &str = "request_id";
    pub const REQUESTER: &str = "requester";
    pub const ORIGINAL_LEAD_COUNT: &str = "original_lead_count";
    pub const FILTERED_LEAD_COUNT: &str = "filtered_lead_count";
    pub const LEAD_COUNT: &str = "lead_count";
    pub const COUNT: &str = "count";
    pub const AGENT_ADDRESS: &str = "agent_address";
}

/// Copy `incoming` and stamp it with the producing stage
pub fn stamp(incoming: &Metadata, source: &str) -> Metadata {
    let mut metadata = incoming.clone();
    metadata.insert(keys::SOURCE.to_string(), Value::from(source));
    metadata.insert(keys::TIMESTAMP.to_string(), Value::from(Utc::now().to_rfc3339()));
    metadata
}

pub fn get_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

/// Correlation id carried under `request_id`, if present and well formed
pub fn request_id(metadata: &Metadata) -> Option<CorrelationId> {
    get_str(metadata, keys::REQUEST_ID).and_then(|raw| raw.parse().ok())
}

/// Reply-to address carried under `requester`, if present and well formed
pub fn requester(metadata: &Metadata) -> Option<Address> {
    get_str(metadata, keys::REQUESTER).and_then(|raw| raw.parse().ok())
}

/// Record the correlation id and reply-to address of a bridge submission
pub fn tag_request(metadata: &mut Metadata, id: CorrelationId, requester: &Address) {
    metadata.insert(keys::REQUEST_ID.to_string(), Value::from(id.to_string()));
    metadata.insert(keys::REQUESTER.to_string(), Value::from(requester.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamp_preserves_unknown_keys() {
        let mut incoming = Metadata::new();
        incoming.insert("sales_spec".into(), json!("fintech b2b"));
        incoming.insert("x-future-field".into(), json!({"nested": true}));
        incoming.insert(keys::SOURCE.into(), json!("scraper_agent"));

        let stamped = stamp(&incoming, "alignment_agent");

        assert_eq!(stamped["x-future-field"], json!({"nested": true}));
        assert_eq!(stamped["sales_spec"], json!("fintech b2b"));
        assert_eq!(stamped[keys::SOURCE], json!("alignment_agent"));
        assert!(stamped.contains_key(keys::TIMESTAMP));
        // the input is untouched
        assert_eq!(incoming[keys::SOURCE], json!("scraper_agent"));
    }

    #[test]
    fn test_request_tagging_round_trip() {
        let id = CorrelationId::new();
        let bridge = Address::from_seed("cli_agent_seed");
        let mut metadata = Metadata::new();

        tag_request(&mut metadata, id, &bridge);

        assert_eq!(request_id(&metadata), Some(id));
        assert_eq!(requester(&metadata), Some(bridge));
    }

    #[test]
    fn test_malformed_request_fields_are_ignored() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::REQUEST_ID.into(), json!("not-a-uuid"));
        metadata.insert(keys::REQUESTER.into(), json!(42));

        assert_eq!(request_id(&metadata), None);
        assert_eq!(requester(&metadata), None);
    }
}
