//! Mailbox Registry
//!
//! Address → mailbox lookup used by the local transport.

use crate::messages::Envelope;
use crate::{ActorError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use types::Address;

/// Sending half of an actor's mailbox
pub type MailboxSender = mpsc::Sender<Envelope>;

/// Registry of live mailboxes, keyed by actor address
#[derive(Debug, Default)]
pub struct MailboxRegistry {
    mailboxes: Arc<RwLock<HashMap<Address, MailboxSender>>>,
}

impl MailboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mailbox; an address can only be registered once
    pub async fn register(&self, address: Address, sender: MailboxSender) -> Result<()> {
        let mut mailboxes = self.mailboxes.write().await;
        if mailboxes.contains_key(&address) {
            return Err(ActorError::configuration(
                format!("Address {} already has a mailbox", address),
                Some("address"),
            ));
        }
        tracing::debug!(address = %address, "Registering mailbox");
        mailboxes.insert(address, sender);
        Ok(())
    }

    pub async fn unregister(&self, address: &Address) -> Result<()> {
        tracing::debug!(address = %address, "Unregistering mailbox");
        if self.mailboxes.write().await.remove(address).is_some() {
            return Ok(());
        }

        tracing::warn!(address = %address, "Attempted to unregister unknown mailbox");
        Err(ActorError::unreachable(address))
    }

    pub async fn lookup(&self, address: &Address) -> Option<MailboxSender> {
        self.mailboxes.read().await.get(address).cloned()
    }

    pub async fn contains(&self, address: &Address) -> bool {
        self.mailboxes.read().await.contains_key(address)
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.mailboxes.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.mailboxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mailboxes.read().await.is_empty()
    }
}
