//! Bridge errors

use thiserror::Error;
use types::RoutingError;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Destination role has no address in the routing table
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("Invalid bridge option '{field}': {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn invalid_option(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            message: message.into(),
        }
    }
}
