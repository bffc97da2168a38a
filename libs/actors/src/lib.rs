//! Mailbox-Driven Actor Runtime
//!
//! Each actor owns an [`Address`](types::Address), a mailbox, a private
//! [`ActorState`] and a table of typed handlers. Messages travel between
//! mailboxes as [`Envelope`]s through a [`Transport`]; in one process that is
//! the [`LocalTransport`], which shares the message payload `Arc` instead of
//! serializing it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌───────────────────────┐
//! │       ActorSystem        │      │       Transport       │
//! │                          │      │                       │
//! │  startup ─► interval(s)  │      │  MailboxRegistry      │
//! │             dispatch ◄───┼──────┼─ Address → mpsc tx    │
//! │  one task per message    │      │  best effort, no ack  │
//! └──────────────────────────┘      └───────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use messaging_actors::{ActorBuilder, ActorSystem, Inbound};
//! use std::sync::Arc;
//! use types::{Address, RoutingTable, SalesSpec};
//!
//! # async fn demo() -> messaging_actors::Result<()> {
//! let system = ActorSystem::new(Arc::new(RoutingTable::random()));
//!
//! let actor = ActorBuilder::new("echo", Address::random())
//!     .on_startup(|ctx| async move {
//!         tracing::info!(address = %ctx.address(), "ready");
//!         Ok(())
//!     })
//!     .on_message(|_ctx, msg: Inbound<SalesSpec>| async move {
//!         tracing::info!(company = %msg.body.company_name, "received");
//!         Ok(())
//!     });
//!
//! system.spawn(actor).await?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod discovery;
pub mod error;
pub mod messages;
pub mod registry;
pub mod state;
pub mod system;
pub mod transport;

pub use context::ActorContext;
pub use discovery::{
    AgentProfile, AgentRegistration, AgentStatus, Discovery, InMemoryDiscovery, REGISTRATION_KEY,
};
pub use error::{ActorError, Result};
pub use messages::{Envelope, Handler, HandlerTable, Hook, Inbound};
pub use registry::{MailboxRegistry, MailboxSender};
pub use state::{ActorState, MemoryStore, StateFlag, StateStore};
pub use system::{ActorBuilder, ActorHandle, ActorStatus, ActorSystem, SystemMetrics, SystemStats};
pub use transport::{LocalTransport, Transport, TransportMetrics, TransportStats};
