//! # Lead Pipeline Types
//!
//! Shared vocabulary for the lead pipeline actors:
//!
//! - [`Address`] / [`Role`]: who a message goes to
//! - [`Message`] / [`Payload`] / [`MessageType`]: what travels between actors
//! - [`Lead`] and its enrichment records: what the stages work on
//! - [`Metadata`]: the string-keyed context map every batch carries
//! - [`RoutingTable`]: fixed role → address map injected into every actor
//!
//! ```rust
//! use types::{Message, MessageType, SalesSpec, Metadata};
//!
//! let msg = Message::new(SalesSpec {
//!     company_name: "TechCorp".to_string(),
//!     spec: "B2B SaaS companies in fintech".to_string(),
//!     bounty_amount: 100.0,
//!     metadata: Metadata::new(),
//! });
//! assert_eq!(msg.message_type(), MessageType::SalesSpec);
//! ```

pub mod address;
pub mod lead;
pub mod message;
pub mod metadata;
pub mod routing;

pub use address::{Address, AddressError, CorrelationId, Role, ADDRESS_PREFIX};
pub use lead::{Alignment, EncryptedContact, Lead, LeadSummary, Scoring};
pub use message::{
    FilteredLeadBatch, LeadBatch, Message, MessageBody, MessageType, Payload, SalesSpec,
    ScoredLeadBatch, SummaryRequest, SummaryResponse,
};
pub use metadata::Metadata;
pub use routing::{RoutingError, RoutingTable};
