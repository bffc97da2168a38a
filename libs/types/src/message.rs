//! Typed messages
//!
//! A [`Message`] wraps exactly one [`Payload`] variant. The [`MessageType`] tag
//! is derived from the variant, never stored separately, so a tag cannot
//! disagree with the schema it announces. Messages are immutable once built:
//! the payload sits behind an `Arc` and no accessor hands out `&mut`.

use crate::lead::{Alignment, Lead, LeadSummary, Scoring};
use crate::{CorrelationId, Metadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable type tag, one per payload schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SalesSpec,
    LeadBatch,
    FilteredLeadBatch,
    ScoredLeadBatch,
    SummaryRequest,
    SummaryResponse,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::SalesSpec => "sales_spec",
            MessageType::LeadBatch => "lead_batch",
            MessageType::FilteredLeadBatch => "filtered_lead_batch",
            MessageType::ScoredLeadBatch => "scored_lead_batch",
            MessageType::SummaryRequest => "summary_request",
            MessageType::SummaryResponse => "summary_response",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a buying company wants, plus the bounty it offers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSpec {
    pub company_name: String,
    pub spec: String,
    pub bounty_amount: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Raw leads produced by the intake stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadBatch {
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Leads that passed the alignment filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredLeadBatch {
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Alignment for every lead examined, keyed by company name
    pub alignment_results: BTreeMap<String, Alignment>,
}

/// Scored leads, highest score first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLeadBatch {
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub metadata: Metadata,
    pub alignment_results: BTreeMap<String, Alignment>,
    pub scoring_results: BTreeMap<String, Scoring>,
}

/// Ask the summary stage for whatever it has stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub request_id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summaries: Vec<LeadSummary>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One variant per [`MessageType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Payload {
    SalesSpec(SalesSpec),
    LeadBatch(LeadBatch),
    FilteredLeadBatch(FilteredLeadBatch),
    ScoredLeadBatch(ScoredLeadBatch),
    SummaryRequest(SummaryRequest),
    SummaryResponse(SummaryResponse),
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::SalesSpec(_) => MessageType::SalesSpec,
            Payload::LeadBatch(_) => MessageType::LeadBatch,
            Payload::FilteredLeadBatch(_) => MessageType::FilteredLeadBatch,
            Payload::ScoredLeadBatch(_) => MessageType::ScoredLeadBatch,
            Payload::SummaryRequest(_) => MessageType::SummaryRequest,
            Payload::SummaryResponse(_) => MessageType::SummaryResponse,
        }
    }

    /// Metadata map carried by the payload
    pub fn metadata(&self) -> &Metadata {
        match self {
            Payload::SalesSpec(body) => &body.metadata,
            Payload::LeadBatch(body) => &body.metadata,
            Payload::FilteredLeadBatch(body) => &body.metadata,
            Payload::ScoredLeadBatch(body) => &body.metadata,
            Payload::SummaryRequest(body) => &body.metadata,
            Payload::SummaryResponse(body) => &body.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Payload::SalesSpec(body) => &mut body.metadata,
            Payload::LeadBatch(body) => &mut body.metadata,
            Payload::FilteredLeadBatch(body) => &mut body.metadata,
            Payload::ScoredLeadBatch(body) => &mut body.metadata,
            Payload::SummaryRequest(body) => &mut body.metadata,
            Payload::SummaryResponse(body) => &mut body.metadata,
        }
    }
}

/// A payload schema bound to its type tag
pub trait MessageBody: Clone + Send + Sync + 'static {
    const TYPE: MessageType;

    fn into_payload(self) -> Payload;

    fn from_payload(payload: &Payload) -> Option<&Self>;
}

macro_rules! message_body {
    ($($variant:ident),* $(,)?) => {
        $(
            impl MessageBody for $variant {
                const TYPE: MessageType = MessageType::$variant;

                fn into_payload(self) -> Payload {
                    Payload::$variant(self)
                }

                fn from_payload(payload: &Payload) -> Option<&Self> {
                    match payload {
                        Payload::$variant(body) => Some(body),
                        _ => None,
                    }
                }
            }
        )*
    };
}

message_body!(
    SalesSpec,
    LeadBatch,
    FilteredLeadBatch,
    ScoredLeadBatch,
    SummaryRequest,
    SummaryResponse,
);

/// Immutable message handed between actors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    created_at: DateTime<Utc>,
    payload: Arc<Payload>,
}

impl Message {
    pub fn new<B: MessageBody>(body: B) -> Self {
        Self::from_payload(body.into_payload())
    }

    pub fn from_payload(payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: None,
            created_at: Utc::now(),
            payload: Arc::new(payload),
        }
    }

    /// Same message carrying a correlation id
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Typed view of the payload, `None` if the tag does not match
    pub fn body<B: MessageBody>(&self) -> Option<&B> {
        B::from_payload(&self.payload)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_spec() -> SalesSpec {
        SalesSpec {
            company_name: "Acme".to_string(),
            spec: "B2B fintech".to_string(),
            bounty_amount: 100.0,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_tag_follows_payload() {
        let msg = Message::new(sales_spec());
        assert_eq!(msg.message_type(), MessageType::SalesSpec);
        assert!(msg.body::<SalesSpec>().is_some());
        assert!(msg.body::<LeadBatch>().is_none());
    }

    #[test]
    fn test_correlation_id_is_attached() {
        let id = CorrelationId::new();
        let msg = Message::new(sales_spec()).with_correlation_id(id);
        assert_eq!(msg.correlation_id(), Some(id));
    }

    #[test]
    fn test_clones_share_payload() {
        let msg = Message::new(sales_spec());
        let copy = msg.clone();
        assert!(std::ptr::eq(msg.payload(), copy.payload()));
        assert_eq!(msg.id(), copy.id());
    }

    #[test]
    fn test_json_crosses_boundary() {
        let id = CorrelationId::new();
        let msg = Message::new(SummaryRequest {
            request_id: id.to_string(),
            metadata: Metadata::new(),
        })
        .with_correlation_id(id);

        let raw = msg.to_json().unwrap();
        assert!(raw.contains("\"summary_request\""));

        let back = Message::from_json(&raw).unwrap();
        assert_eq!(back.message_type(), MessageType::SummaryRequest);
        assert_eq!(back.correlation_id(), Some(id));
        assert_eq!(back.body::<SummaryRequest>().unwrap().request_id, id.to_string());
    }

    #[test]
    fn test_payload_metadata_accessor() {
        let mut spec = sales_spec();
        spec.metadata.insert("k".into(), serde_json::json!("v"));
        let payload = spec.into_payload();
        assert_eq!(payload.metadata()["k"], serde_json::json!("v"));
    }
}
