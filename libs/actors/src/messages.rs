//! Envelopes and handler dispatch table

use crate::context::ActorContext;
use crate::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use types::{metadata, Address, CorrelationId, Message, MessageBody, MessageType};

/// A message in flight, with its sender and destination
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: Address,
    pub to: Address,
    pub message: Message,
}

impl Envelope {
    pub fn new(from: Address, to: Address, message: Message) -> Self {
        Self { from, to, message }
    }

    /// Correlation id of the message, falling back to `request_id` in metadata
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.message
            .correlation_id()
            .or_else(|| metadata::request_id(self.message.payload().metadata()))
    }
}

/// Typed view handed to handlers registered with `on_message::<T>`
#[derive(Debug, Clone)]
pub struct Inbound<T> {
    pub from: Address,
    pub message: Message,
    pub body: T,
}

impl<T> Inbound<T> {
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.message
            .correlation_id()
            .or_else(|| metadata::request_id(self.message.payload().metadata()))
    }
}

impl<T: MessageBody> Inbound<T> {
    /// Decode an envelope, `None` when the payload is not a `T`
    pub fn from_envelope(envelope: Envelope) -> Option<Self> {
        let body = envelope.message.body::<T>()?.clone();
        Some(Self {
            from: envelope.from,
            message: envelope.message,
            body,
        })
    }
}

/// Log-friendly rendering of an optional correlation id
pub(crate) fn correlation_label(id: Option<CorrelationId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Type-erased message handler
pub type Handler = Arc<dyn Fn(ActorContext, Envelope) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Startup hook or interval task
pub type Hook = Arc<dyn Fn(ActorContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One handler per message type
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<MessageType, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `message_type`. Returns the handler it replaced.
    pub fn insert(&mut self, message_type: MessageType, handler: Handler) -> Option<Handler> {
        let previous = self.handlers.insert(message_type, handler);
        if previous.is_some() {
            tracing::debug!(
                message_type = %message_type,
                "Replacing previously registered handler"
            );
        }
        previous
    }

    pub fn get(&self, message_type: MessageType) -> Option<&Handler> {
        self.handlers.get(&message_type)
    }

    pub fn contains(&self, message_type: MessageType) -> bool {
        self.handlers.contains_key(&message_type)
    }

    pub fn message_types(&self) -> Vec<MessageType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("message_types", &self.message_types())
            .finish()
    }
}
