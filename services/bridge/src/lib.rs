//! # Correlation Bridge
//!
//! Request/reply on top of fire-and-forget actors. A caller submits a payload,
//! gets a [`CorrelationId`](types::CorrelationId) back straight away, and
//! later waits on that id for the pipeline's reply.
//!
//! ```rust,no_run
//! # async fn run(bridge: std::sync::Arc<bridge::Bridge>) -> Result<(), bridge::BridgeError> {
//! let id = bridge.submit_sales_spec("TechCorp", "B2B SaaS companies in fintech", 100.0)?;
//! match bridge.await_result(id, None).await {
//!     bridge::AwaitOutcome::Ready(reply) => println!("{} summaries", reply.summaries.len()),
//!     bridge::AwaitOutcome::TimedOut => println!("no reply yet"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod correlation;
pub mod error;
pub mod queue;

pub use crate::bridge::{
    AwaitOutcome, Bridge, BridgeMetrics, BridgeOptions, BridgeStats, DeliveryOutcome, BRIDGE_NAME,
};
pub use correlation::{CorrelationTable, PendingRequest, RequestKind, RequestStatus, SweepReport};
pub use error::{BridgeError, Result};
pub use queue::{OutboundQueue, OutboundQueueEntry};
