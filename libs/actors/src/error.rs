//! Actor runtime errors
//!
//! Nothing here is fatal to the process. Handler faults are logged at the
//! dispatch boundary, delivery faults are dropped or retried by the caller,
//! and configuration faults surface when an actor is spawned.

use thiserror::Error;
use types::{Address, MessageType, RoutingError};

#[derive(Error, Debug)]
pub enum ActorError {
    /// No mailbox is registered for the destination
    #[error("Destination unreachable: {address}")]
    Unreachable { address: Address },

    /// The destination mailbox exists but its receiver is gone
    #[error("Mailbox closed: {address}")]
    MailboxClosed { address: Address },

    /// The destination mailbox is at capacity
    #[error("Mailbox full: {address}")]
    MailboxFull { address: Address },

    /// A handler got a payload it cannot use
    #[error("Unexpected payload: expected {expected}, got {actual}")]
    UnexpectedPayload {
        expected: MessageType,
        actual: MessageType,
    },

    /// Handler-level failure
    #[error("Handler error: {message}")]
    Handler {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// State value could not be (de)serialized
    #[error("State error for key '{key}': {message}")]
    State { key: String, message: String },

    /// The discovery service refused or lost a registration
    #[error("Discovery error for {address}: {message}")]
    Discovery { address: Address, message: String },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    pub fn unreachable(address: &Address) -> Self {
        Self::Unreachable {
            address: address.clone(),
        }
    }

    pub fn mailbox_closed(address: &Address) -> Self {
        Self::MailboxClosed {
            address: address.clone(),
        }
    }

    pub fn mailbox_full(address: &Address) -> Self {
        Self::MailboxFull {
            address: address.clone(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            source: None,
        }
    }

    pub fn handler_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Handler {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn state(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::State {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn discovery(address: &Address, message: impl Into<String>) -> Self {
        Self::Discovery {
            address: address.clone(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// Delivery faults are the only ones worth retrying
    pub fn is_delivery_fault(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::MailboxClosed { .. } | Self::MailboxFull { .. }
        )
    }

    /// Short label used as a structured log field
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } | Self::MailboxClosed { .. } | Self::MailboxFull { .. } => {
                "delivery"
            }
            Self::UnexpectedPayload { .. } => "schema",
            Self::Handler { .. } => "handler",
            Self::State { .. } => "state",
            Self::Discovery { .. } => "discovery",
            Self::Configuration { .. } | Self::Routing(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_fault_classification() {
        let address = Address::random();
        assert!(ActorError::unreachable(&address).is_delivery_fault());
        assert!(ActorError::mailbox_closed(&address).is_delivery_fault());
        assert!(ActorError::mailbox_full(&address).is_delivery_fault());
        assert!(!ActorError::handler("boom").is_delivery_fault());
        assert_eq!(ActorError::handler("boom").category(), "handler");
    }

    #[test]
    fn test_error_messages_name_the_address() {
        let address = Address::from_seed("x");
        let rendered = ActorError::unreachable(&address).to_string();
        assert!(rendered.contains(address.as_str()));
    }
}
