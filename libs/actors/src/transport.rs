//! Actor Transport
//!
//! How an [`Envelope`] reaches a mailbox. The in-process [`LocalTransport`]
//! hands the envelope over a tokio channel, so the payload `Arc` is shared
//! and never serialized. Delivery is best effort: the transport reports
//! failure, the caller decides whether to drop or retry.

use crate::messages::Envelope;
use crate::registry::MailboxRegistry;
use crate::{ActorError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Delivery seam between actors
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand the envelope to the mailbox named by `envelope.to`
    async fn deliver(&self, envelope: Envelope) -> Result<()>;

    fn metrics(&self) -> Arc<TransportMetrics>;
}

/// Transport performance metrics
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Envelopes accepted by a mailbox
    pub sent: AtomicU64,
    /// Mailbox existed but was closed
    pub failed: AtomicU64,
    /// No mailbox for the destination
    pub unroutable: AtomicU64,
    /// Sends that found the mailbox full and had to wait
    pub channel_full_events: AtomicU64,
    pub latency_total_ns: AtomicU64,
}

impl TransportMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_send(&self, duration: Duration) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.latency_total_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unroutable(&self) {
        self.unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_channel_full(&self) {
        self.channel_full_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ns(&self) -> f64 {
        let sends = self.sent.load(Ordering::Relaxed);
        if sends == 0 {
            return 0.0;
        }
        self.latency_total_ns.load(Ordering::Relaxed) as f64 / sends as f64
    }

    pub fn get_stats(&self) -> TransportStats {
        TransportStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
            channel_full_events: self.channel_full_events.load(Ordering::Relaxed),
            avg_latency_ns: self.avg_latency_ns(),
        }
    }
}

/// Transport statistics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStats {
    pub sent: u64,
    pub failed: u64,
    pub unroutable: u64,
    pub channel_full_events: u64,
    pub avg_latency_ns: f64,
}

/// In-process transport backed by the mailbox registry
#[derive(Debug, Clone)]
pub struct LocalTransport {
    registry: Arc<MailboxRegistry>,
    metrics: Arc<TransportMetrics>,
}

impl LocalTransport {
    pub fn new(registry: Arc<MailboxRegistry>) -> Self {
        Self {
            registry,
            metrics: TransportMetrics::new(),
        }
    }

    pub fn registry(&self) -> &Arc<MailboxRegistry> {
        &self.registry
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn deliver(&self, envelope: Envelope) -> Result<()> {
        let start = Instant::now();

        let Some(mailbox) = self.registry.lookup(&envelope.to).await else {
            self.metrics.record_unroutable();
            return Err(ActorError::unreachable(&envelope.to));
        };

        trace!(
            to = %envelope.to,
            message_type = %envelope.message.message_type(),
            "Local delivery"
        );

        match mailbox.try_send(envelope) {
            Ok(()) => {}
            // never wait for capacity: callers either drop or requeue
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                warn!(to = %envelope.to, "Mailbox full - message not delivered");
                self.metrics.record_channel_full();
                return Err(ActorError::mailbox_full(&envelope.to));
            }
            Err(mpsc::error::TrySendError::Closed(envelope)) => {
                self.metrics.record_failure();
                return Err(ActorError::mailbox_closed(&envelope.to));
            }
        }

        self.metrics.record_send(start.elapsed());
        Ok(())
    }

    fn metrics(&self) -> Arc<TransportMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Address, Message, Metadata, SummaryRequest};

    fn envelope(to: &Address) -> Envelope {
        Envelope::new(
            Address::random(),
            to.clone(),
            Message::new(SummaryRequest {
                request_id: "r-1".to_string(),
                metadata: Metadata::new(),
            }),
        )
    }

    #[tokio::test]
    async fn test_local_delivery_reaches_mailbox() {
        let registry = Arc::new(MailboxRegistry::new());
        let transport = LocalTransport::new(Arc::clone(&registry));
        let address = Address::random();
        let (tx, mut rx) = mpsc::channel(4);
        registry.register(address.clone(), tx).await.unwrap();

        transport.deliver(envelope(&address)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.to, address);
        assert_eq!(transport.metrics().get_stats().sent, 1);
    }

    #[tokio::test]
    async fn test_unknown_destination_is_unreachable() {
        let transport = LocalTransport::new(Arc::new(MailboxRegistry::new()));
        let err = transport
            .deliver(envelope(&Address::random()))
            .await
            .unwrap_err();

        assert!(matches!(err, ActorError::Unreachable { .. }));
        assert_eq!(transport.metrics().get_stats().unroutable, 1);
    }

    #[tokio::test]
    async fn test_closed_mailbox_is_reported() {
        let registry = Arc::new(MailboxRegistry::new());
        let transport = LocalTransport::new(Arc::clone(&registry));
        let address = Address::random();
        let (tx, rx) = mpsc::channel(4);
        registry.register(address.clone(), tx).await.unwrap();
        drop(rx);

        let err = transport.deliver(envelope(&address)).await.unwrap_err();
        assert!(matches!(err, ActorError::MailboxClosed { .. }));
        assert_eq!(transport.metrics().get_stats().failed, 1);
    }

    #[tokio::test]
    async fn test_full_mailbox_fails_without_waiting() {
        let registry = Arc::new(MailboxRegistry::new());
        let transport = LocalTransport::new(Arc::clone(&registry));
        let address = Address::random();
        let (tx, mut rx) = mpsc::channel(1);
        registry.register(address.clone(), tx).await.unwrap();

        transport.deliver(envelope(&address)).await.unwrap();
        let err = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            transport.deliver(envelope(&address)),
        )
        .await
        .expect("delivery to a full mailbox returns at once")
        .unwrap_err();

        assert!(matches!(err, ActorError::MailboxFull { .. }));
        assert!(err.is_delivery_fault());
        assert_eq!(transport.metrics().get_stats().channel_full_events, 1);

        // capacity frees up once the receiver drains
        rx.recv().await.unwrap();
        transport.deliver(envelope(&address)).await.unwrap();
    }
}
