//! Bridge hosted as an actor, driven by its own delivery tick

use async_trait::async_trait;
use bridge::{AwaitOutcome, Bridge, BridgeOptions, RequestStatus};
use messaging_actors::{
    ActorBuilder, ActorContext, ActorSystem, Envelope, Inbound, LocalTransport, MailboxRegistry,
    Transport, TransportMetrics,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use types::metadata;
use types::{Message, Role, RoutingTable, SalesSpec, SummaryResponse};

/// Fails the first `failures` deliveries, then behaves like the local transport
struct FlakyTransport {
    inner: LocalTransport,
    failures: AtomicU32,
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn deliver(&self, envelope: Envelope) -> messaging_actors::Result<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(messaging_actors::ActorError::unreachable(&envelope.to));
        }
        self.inner.deliver(envelope).await
    }

    fn metrics(&self) -> Arc<TransportMetrics> {
        self.inner.metrics()
    }
}

struct Harness {
    system: ActorSystem,
    bridge: Arc<Bridge>,
    received: Arc<AtomicUsize>,
}

/// Bridge plus a stand-in intake actor that counts sales specs and, when
/// `reply` is set, answers each with an empty summary list
async fn harness(failures: u32, reply: bool) -> Harness {
    let routing = Arc::new(RoutingTable::random());
    let registry = Arc::new(MailboxRegistry::new());
    let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
        inner: LocalTransport::new(Arc::clone(&registry)),
        failures: AtomicU32::new(failures),
    });
    let system = ActorSystem::with_transport(Arc::clone(&routing), registry, Arc::clone(&transport));

    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    let intake = ActorBuilder::new("stub_intake", routing.address(Role::Scraper).unwrap().clone())
        .on_message(move |ctx: ActorContext, msg: Inbound<SalesSpec>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if reply {
                    if let Some(requester) = metadata::requester(&msg.body.metadata) {
                        let response = SummaryResponse {
                            summaries: Vec::new(),
                            metadata: msg.body.metadata.clone(),
                        };
                        let mut message = Message::new(response);
                        if let Some(id) = msg.correlation_id() {
                            message = message.with_correlation_id(id);
                        }
                        ctx.reply(&requester, message).await;
                    }
                }
                Ok::<(), messaging_actors::ActorError>(())
            }
        });
    system.spawn(intake).await.unwrap();

    let bridge = Arc::new(
        Bridge::new(
            Arc::clone(&routing),
            Arc::clone(system.transport()),
            BridgeOptions::default(),
        )
        .unwrap(),
    );
    system.spawn(bridge.actor()).await.unwrap();

    Harness {
        system,
        bridge,
        received,
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_retried_exactly_once_on_next_tick() {
    let h = harness(1, false).await;
    h.bridge.submit_sales_spec("Buyer", "B2B fintech", 50.0).unwrap();

    // first tick at 1s fails
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.received.load(Ordering::SeqCst), 0);
    assert_eq!(h.bridge.queued(), 1);

    // second tick at 2s delivers
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.received.load(Ordering::SeqCst), 1);
    assert_eq!(h.bridge.queued(), 0);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.received.load(Ordering::SeqCst), 1);

    let stats = h.bridge.metrics().get_stats();
    assert_eq!(stats.delivery_failures, 1);
    assert_eq!(stats.delivered, 1);
    h.system.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_one_message_per_tick() {
    let h = harness(0, false).await;
    for company in ["a", "b", "c"] {
        h.bridge.submit_sales_spec(company, "spec", 1.0).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.received.load(Ordering::SeqCst), 2);
    assert_eq!(h.bridge.queued(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_round_trip_through_stub_pipeline() {
    let h = harness(0, true).await;
    let id = h
        .bridge
        .submit_sales_spec("Buyer", "B2B fintech", 50.0)
        .unwrap();

    let outcome = h.bridge.await_result(id, Some(Duration::from_secs(5))).await;

    let AwaitOutcome::Ready(reply) = outcome else {
        panic!("expected a reply before the timeout");
    };
    assert_eq!(metadata::request_id(&reply.metadata), Some(id));
    assert_eq!(h.bridge.status(&id), None);
    assert_eq!(h.bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_reply_times_out_and_stays_tracked() {
    let h = harness(0, false).await;
    let id = h.bridge.submit_sales_spec("Buyer", "spec", 1.0).unwrap();

    let outcome = h.bridge.await_result(id, Some(Duration::from_secs(3))).await;

    assert_eq!(outcome, AwaitOutcome::TimedOut);
    assert_eq!(h.bridge.status(&id), Some(RequestStatus::TimedOut));
    assert_eq!(h.received.load(Ordering::SeqCst), 1);

    // the summarizer role has no actor here, so a summary request just waits
    let request = h.bridge.request_summaries().unwrap();
    assert_eq!(
        h.bridge.await_result(request, Some(Duration::from_secs(2))).await,
        AwaitOutcome::TimedOut
    );
}
