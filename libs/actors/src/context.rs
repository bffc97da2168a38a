//! Handle passed to every hook, handler and interval task

use crate::messages::{correlation_label, Envelope};
use crate::state::ActorState;
use crate::transport::Transport;
use crate::Result;
use std::sync::Arc;
use tracing::warn;
use types::{Address, Message, Role, RoutingTable};

/// An actor's view of itself and of the rest of the system
#[derive(Clone)]
pub struct ActorContext {
    address: Address,
    name: Arc<str>,
    state: ActorState,
    routing: Arc<RoutingTable>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorContext")
            .field("address", &self.address)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ActorContext {
    pub fn new(
        address: Address,
        name: impl Into<Arc<str>>,
        state: ActorState,
        routing: Arc<RoutingTable>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            state,
            routing,
            transport,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &ActorState {
        &self.state
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Deliver and report the outcome
    pub async fn try_send(&self, to: &Address, message: Message) -> Result<()> {
        self.transport
            .deliver(Envelope::new(self.address.clone(), to.clone(), message))
            .await
    }

    /// Fire and forget. A failed delivery is logged and the message dropped.
    pub async fn send(&self, to: &Address, message: Message) {
        let message_type = message.message_type();
        let correlation_id = correlation_label(message.correlation_id());
        if let Err(e) = self.try_send(to, message).await {
            warn!(
                actor = %self.name,
                to = %to,
                message_type = %message_type,
                correlation_id = %correlation_id,
                error = %e,
                "Dropping undeliverable message"
            );
        }
    }

    /// Send to whichever address the routing table holds for `role`.
    ///
    /// A role missing from the table is a configuration error and is returned;
    /// delivery itself stays fire and forget.
    pub async fn send_to_role(&self, role: Role, message: Message) -> Result<()> {
        let to = self.routing.address(role)?.clone();
        self.send(&to, message).await;
        Ok(())
    }

    /// Answer the sender of a received message
    pub async fn reply(&self, sender: &Address, message: Message) {
        self.send(sender, message).await;
    }
}
