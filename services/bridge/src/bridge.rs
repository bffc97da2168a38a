//! Correlation Bridge
//!
//! Lets a synchronous-style caller talk to the pipeline actors:
//!
//! 1. [`Bridge::submit`] tags the payload with a fresh correlation id and the
//!    bridge's own address, queues it and returns the id at once
//! 2. the bridge actor's delivery tick sends at most one queued message per
//!    period, requeueing it at the tail on failure
//! 3. a `SummaryResponse` reaching the bridge actor is filed under its
//!    correlation id
//! 4. [`Bridge::await_result`] polls for that reply until a deadline
//!
//! The queue and the correlation table are owned by the bridge instance and
//! guarded by their own mutexes. Neither lock is held across an await.

use crate::correlation::{CorrelationTable, RequestKind, RequestStatus, SweepReport};
use crate::error::{BridgeError, Result};
use crate::queue::{OutboundQueue, OutboundQueueEntry};
use messaging_actors::{ActorBuilder, ActorContext, AgentProfile, Envelope, Inbound, Transport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use types::metadata;
use types::{
    Address, CorrelationId, Message, MessageBody, MessageType, Metadata, Payload, Role,
    RoutingTable, SalesSpec, SummaryRequest, SummaryResponse,
};

/// Actor name of the bridge
pub const BRIDGE_NAME: &str = "cli_agent";

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOptions {
    /// Period of the outbound delivery tick
    pub delivery_tick: Duration,
    /// How often `await_result` checks for a reply
    pub poll_interval: Duration,
    /// Used by `await_result` when the caller passes no timeout
    pub default_timeout: Duration,
    /// Drop an entry after this many failed deliveries. Unbounded when `None`.
    pub max_delivery_attempts: Option<u32>,
    /// How long an uncollected reply or a timed-out request is kept
    pub reply_retention: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            delivery_tick: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            default_timeout: Duration::from_secs(10),
            max_delivery_attempts: None,
            reply_retention: Duration::from_secs(300),
        }
    }
}

impl BridgeOptions {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("delivery_tick", self.delivery_tick),
            ("poll_interval", self.poll_interval),
            ("default_timeout", self.default_timeout),
            ("reply_retention", self.reply_retention),
        ] {
            if value.is_zero() {
                return Err(BridgeError::invalid_option(field, "must be greater than zero"));
            }
        }
        if self.max_delivery_attempts == Some(0) {
            return Err(BridgeError::invalid_option(
                "max_delivery_attempts",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

/// Result of waiting for a reply
#[derive(Debug, Clone, PartialEq)]
pub enum AwaitOutcome {
    Ready(SummaryResponse),
    TimedOut,
}

impl AwaitOutcome {
    pub fn into_reply(self) -> Option<SummaryResponse> {
        match self {
            AwaitOutcome::Ready(reply) => Some(reply),
            AwaitOutcome::TimedOut => None,
        }
    }
}

/// What one delivery tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queue was empty
    Idle,
    Delivered,
    /// Delivery failed; the entry is back at the tail
    Requeued,
    /// Delivery failed and the entry ran out of attempts
    Dropped,
}

/// Bridge metrics
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    pub submitted: AtomicU64,
    pub delivered: AtomicU64,
    pub delivery_failures: AtomicU64,
    pub dropped: AtomicU64,
    pub replies_received: AtomicU64,
    pub timeouts: AtomicU64,
    pub replies_expired: AtomicU64,
}

impl BridgeMetrics {
    pub fn get_stats(&self) -> BridgeStats {
        BridgeStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            replies_received: self.replies_received.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            replies_expired: self.replies_expired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStats {
    pub submitted: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
    pub dropped: u64,
    pub replies_received: u64,
    pub timeouts: u64,
    pub replies_expired: u64,
}

pub struct Bridge {
    address: Address,
    routing: Arc<RoutingTable>,
    transport: Arc<dyn Transport>,
    options: BridgeOptions,
    queue: Mutex<OutboundQueue>,
    table: Mutex<CorrelationTable>,
    metrics: BridgeMetrics,
}

impl Bridge {
    /// The bridge takes the address the routing table holds for
    /// [`Role::Bridge`], so pipeline replies find their way back
    pub fn new(
        routing: Arc<RoutingTable>,
        transport: Arc<dyn Transport>,
        options: BridgeOptions,
    ) -> Result<Self> {
        options.validate()?;
        let address = routing.address(Role::Bridge)?.clone();
        Ok(Self {
            address,
            routing,
            transport,
            options,
            queue: Mutex::new(OutboundQueue::new()),
            table: Mutex::new(CorrelationTable::new()),
            metrics: BridgeMetrics::default(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    /// Queue `body` for `destination` and return its correlation id
    pub fn submit<B: MessageBody>(&self, destination: Role, body: B) -> Result<CorrelationId> {
        let kind = match B::TYPE {
            MessageType::SummaryRequest => RequestKind::SummaryRequest,
            _ => RequestKind::Submission,
        };
        self.enqueue(destination, kind, |_| body.into_payload())
    }

    /// Send a buyer's sales spec into the pipeline
    pub fn submit_sales_spec(
        &self,
        company_name: impl Into<String>,
        spec: impl Into<String>,
        bounty_amount: f64,
    ) -> Result<CorrelationId> {
        let body = SalesSpec {
            company_name: company_name.into(),
            spec: spec.into(),
            bounty_amount,
            metadata: Metadata::new(),
        };
        self.submit(Role::Scraper, body)
    }

    /// Ask the summarizer for the summaries it holds
    pub fn request_summaries(&self) -> Result<CorrelationId> {
        self.enqueue(Role::Summary, RequestKind::SummaryRequest, |id| {
            SummaryRequest {
                request_id: id.to_string(),
                metadata: Metadata::new(),
            }
            .into_payload()
        })
    }

    fn enqueue(
        &self,
        destination: Role,
        kind: RequestKind,
        build: impl FnOnce(CorrelationId) -> Payload,
    ) -> Result<CorrelationId> {
        let to = self.routing.address(destination)?.clone();
        let id = self.table.lock().open(kind);

        let mut payload = build(id);
        if let Payload::SummaryRequest(request) = &mut payload {
            request.request_id = id.to_string();
        }
        metadata::tag_request(payload.metadata_mut(), id, &self.address);
        let message = Message::from_payload(payload).with_correlation_id(id);
        let message_type = message.message_type();

        let queued = {
            let mut queue = self.queue.lock();
            queue.push(OutboundQueueEntry::new(to, message));
            queue.len()
        };
        self.metrics.submitted.fetch_add(1, Ordering::Relaxed);

        info!(
            correlation_id = %id,
            destination = %destination,
            message_type = %message_type,
            queued,
            "Request queued"
        );
        Ok(id)
    }

    /// Attempt delivery of the entry at the head of the queue
    pub async fn deliver_next(&self) -> DeliveryOutcome {
        let Some(entry) = self.queue.lock().pop() else {
            return DeliveryOutcome::Idle;
        };

        let correlation_id = entry.message.correlation_id();
        let envelope = Envelope::new(
            self.address.clone(),
            entry.destination.clone(),
            entry.message.clone(),
        );

        match self.transport.deliver(envelope).await {
            Ok(()) => {
                self.metrics.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = ?correlation_id,
                    to = %entry.destination,
                    attempts = entry.attempts + 1,
                    waited_ms = entry.enqueued_at.elapsed().as_millis() as u64,
                    "Delivered queued message"
                );
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                self.metrics.delivery_failures.fetch_add(1, Ordering::Relaxed);
                let attempts = entry.attempts + 1;
                if self
                    .options
                    .max_delivery_attempts
                    .is_some_and(|max| attempts >= max)
                {
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    error!(
                        correlation_id = ?correlation_id,
                        to = %entry.destination,
                        attempts,
                        error = %e,
                        "Delivery attempts exhausted - dropping message"
                    );
                    return DeliveryOutcome::Dropped;
                }

                warn!(
                    correlation_id = ?correlation_id,
                    to = %entry.destination,
                    attempts,
                    error = %e,
                    "Delivery failed - requeued"
                );
                self.queue.lock().requeue(entry);
                DeliveryOutcome::Requeued
            }
        }
    }

    /// File a reply under `correlation_id`. Replies nobody asked for are kept.
    pub fn receive_reply(&self, correlation_id: Option<CorrelationId>, reply: SummaryResponse) {
        let Some(id) = correlation_id.or_else(|| metadata::request_id(&reply.metadata)) else {
            warn!(
                count = reply.summaries.len(),
                "Reply without correlation id - dropping"
            );
            return;
        };

        self.metrics.replies_received.fetch_add(1, Ordering::Relaxed);
        let count = reply.summaries.len();
        if self.table.lock().store_reply(id, reply) {
            info!(correlation_id = %id, count, "Reply received");
        } else {
            debug!(correlation_id = %id, count, "Reply for unknown request stored");
        }
    }

    /// Wait for the reply to `id`, checking every poll interval.
    ///
    /// Returns no later than one poll interval past `timeout` (the default
    /// timeout when `None`). A timed-out request stays in the table, so a
    /// later call with the same id still picks up a late reply.
    pub async fn await_result(&self, id: CorrelationId, timeout: Option<Duration>) -> AwaitOutcome {
        let timeout = timeout.unwrap_or(self.options.default_timeout);
        let started = Instant::now();

        loop {
            let ready = self.table.lock().take_reply(&id);
            if let Some(reply) = ready {
                debug!(correlation_id = %id, waited_ms = started.elapsed().as_millis() as u64, "Reply consumed");
                return AwaitOutcome::Ready(reply);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                self.table.lock().mark_timed_out(&id);
                self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for reply"
                );
                return AwaitOutcome::TimedOut;
            }

            tokio::time::sleep(self.options.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Forget replies and timed-out requests older than the retention
    pub fn sweep_expired(&self) -> SweepReport {
        let report = self
            .table
            .lock()
            .sweep(self.options.reply_retention, Instant::now());
        if !report.is_empty() {
            self.metrics
                .replies_expired
                .fetch_add(report.replies as u64, Ordering::Relaxed);
            debug!(
                replies = report.replies,
                requests = report.requests,
                "Expired correlation entries removed"
            );
        }
        report
    }

    pub fn status(&self, id: &CorrelationId) -> Option<RequestStatus> {
        self.table.lock().get(id).map(|request| request.status)
    }

    /// Requests still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.table.lock().pending_count()
    }

    /// Messages waiting in the outbound queue
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Host the bridge as an actor: replies are filed, the queue is drained
    /// one entry per delivery tick
    pub fn actor(self: &Arc<Self>) -> ActorBuilder {
        let replies = Arc::clone(self);
        let ticker = Arc::clone(self);
        let tick = self.options.delivery_tick;

        ActorBuilder::new(BRIDGE_NAME, self.address.clone())
            .advertise(profile())
            .on_startup(move |ctx| announce(ctx, tick))
            .on_message(move |_ctx, msg: Inbound<SummaryResponse>| {
                Arc::clone(&replies).on_reply(msg)
            })
            .on_interval(tick, move |_ctx| Arc::clone(&ticker).on_tick())
    }

    async fn on_reply(self: Arc<Self>, msg: Inbound<SummaryResponse>) -> messaging_actors::Result<()> {
        let correlation_id = msg.correlation_id();
        self.receive_reply(correlation_id, msg.body);
        Ok(())
    }

    async fn on_tick(self: Arc<Self>) -> messaging_actors::Result<()> {
        self.deliver_next().await;
        self.sweep_expired();
        Ok(())
    }
}

/// What the bridge advertises to discovery
pub fn profile() -> AgentProfile {
    AgentProfile::new("Lead Generation CLI Agent", Role::Bridge)
        .with_capabilities(["agent_communication", "request_tracking"])
        .with_description("Bridges synchronous callers and the pipeline actors")
}

async fn announce(ctx: ActorContext, tick: Duration) -> messaging_actors::Result<()> {
    info!(
        actor = %ctx.name(),
        address = %ctx.address(),
        tick_ms = tick.as_millis() as u64,
        "Bridge started"
    );
    Ok(())
}
