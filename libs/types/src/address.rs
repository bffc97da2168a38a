//! Actor addressing
//!
//! Opaque mailbox addresses, the logical roles a routing table maps onto them,
//! and the correlation tokens that tie a bridge submission to its reply.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Prefix carried by every rendered address
pub const ADDRESS_PREFIX: &str = "agent1q";

/// Number of digest bytes kept when deriving an address from a seed
const SEED_DIGEST_BYTES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address '{0}' does not start with 'agent1q'")]
    MissingPrefix(String),

    #[error("address '{0}' has an empty or non-alphanumeric body")]
    InvalidBody(String),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// Globally unique identifier for an actor's mailbox.
///
/// Assigned once when the actor is created and never changed; doubles as the
/// reply-to identity of anything the actor sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Fresh random address
    pub fn random() -> Self {
        Self(format!("{}{}", ADDRESS_PREFIX, Uuid::new_v4().simple()))
    }

    /// Deterministic address derived from a seed phrase.
    ///
    /// Lets a routing table name every peer before any actor exists.
    pub fn from_seed(seed: &str) -> Self {
        let digest = Sha3_256::digest(seed.as_bytes());
        Self(format!(
            "{}{}",
            ADDRESS_PREFIX,
            hex::encode(&digest[..SEED_DIGEST_BYTES])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;

        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AddressError::InvalidBody(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Logical roles in the pipeline.
///
/// Intake runs as `Scraper`, Filter as `Alignment`, Scorer as `Scoring` and
/// Summarizer as `Summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Scraper,
    Alignment,
    Scoring,
    Summary,
    Bridge,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Scraper,
        Role::Alignment,
        Role::Scoring,
        Role::Summary,
        Role::Bridge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Scraper => "scraper",
            Role::Alignment => "alignment",
            Role::Scoring => "scoring",
            Role::Summary => "summary",
            Role::Bridge => "bridge",
        }
    }

    /// Stage that receives this role's output, if any
    pub fn downstream(&self) -> Option<Role> {
        match self {
            Role::Scraper => Some(Role::Alignment),
            Role::Alignment => Some(Role::Scoring),
            Role::Scoring => Some(Role::Summary),
            Role::Summary | Role::Bridge => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AddressError::UnknownRole(s.to_string()))
    }
}

/// Token linking a bridge submission to its eventual reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
