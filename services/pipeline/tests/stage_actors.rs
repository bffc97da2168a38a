//! Stage actors hosted on a real actor system

use async_trait::async_trait;
use messaging_actors::{ActorBuilder, ActorError, ActorSystem, Envelope, Inbound};
use pipeline::{
    FilterStage, IntakeStage, KeywordAlignment, ScorerStage, Stage, StaticLeadSource,
    SummarizerStage, TemplateSummarizer, Transform, TransformContext, TransformError,
    WeightedScoring,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use types::metadata::{self, keys};
use types::{
    Address, Alignment, CorrelationId, FilteredLeadBatch, Lead, LeadBatch, Message, MessageBody,
    Metadata, Role, RoutingTable, SalesSpec, SummaryRequest, SummaryResponse,
};

type Received<T> = mpsc::UnboundedReceiver<(Option<CorrelationId>, T)>;

/// Actor at `role` that hands every `T` it receives to the test
fn collector<T: MessageBody>(routing: &RoutingTable, role: Role) -> (ActorBuilder, Received<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let address = routing.address(role).unwrap().clone();
    let builder = ActorBuilder::new(format!("{role}-collector"), address).on_message(
        move |_ctx, msg: Inbound<T>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((msg.correlation_id(), msg.body));
                Ok::<(), ActorError>(())
            }
        },
    );
    (builder, rx)
}

async fn deliver(system: &ActorSystem, from: &Address, role: Role, message: Message) {
    let to = system.routing().address(role).unwrap().clone();
    system
        .deliver(Envelope::new(from.clone(), to, message))
        .await
        .unwrap();
}

fn lead_batch(spec: Option<&str>, names: &[&str]) -> Message {
    let mut metadata = Metadata::new();
    if let Some(spec) = spec {
        metadata.insert(keys::SALES_SPEC.into(), Value::from(spec));
    }
    let leads = names
        .iter()
        .map(|name| {
            let mut lead = Lead::new(*name);
            lead.description = "payments platform".into();
            lead
        })
        .collect();
    Message::new(LeadBatch { leads, metadata })
}

async fn wait_for_failures(system: &ActorSystem, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while system.metrics().get_stats().handler_failures < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_batch_is_ignored_while_busy() {
    let routing = Arc::new(RoutingTable::random());
    let system = ActorSystem::new(Arc::clone(&routing));
    let (scoring, mut forwarded) = collector::<FilteredLeadBatch>(&routing, Role::Scoring);
    system.spawn(scoring).await.unwrap();

    let slow = KeywordAlignment::new().with_latency(Duration::from_secs(1));
    let filter = FilterStage::new(Arc::new(slow), 0.3);
    system.spawn(filter.actor(&routing).unwrap()).await.unwrap();

    let sender = Address::random();
    deliver(&system, &sender, Role::Alignment, lead_batch(Some("payments"), &["A"])).await;
    deliver(&system, &sender, Role::Alignment, lead_batch(Some("payments"), &["B"])).await;

    let (_, batch) = forwarded.recv().await.unwrap();
    assert_eq!(batch.leads.len(), 1);
    assert!(
        tokio::time::timeout(Duration::from_secs(5), forwarded.recv())
            .await
            .is_err(),
        "second batch should have been ignored"
    );

    // the guard is free again once the first batch finished
    deliver(&system, &sender, Role::Alignment, lead_batch(Some("payments"), &["C"])).await;
    let (_, batch) = forwarded.recv().await.unwrap();
    assert_eq!(batch.leads[0].company_name, "C");
}

struct PanicOn(&'static str);

#[async_trait]
impl Transform for PanicOn {
    type Output = Alignment;

    fn name(&self) -> &'static str {
        "panic_on"
    }

    async fn apply(&self, lead: &Lead, ctx: &TransformContext) -> Result<Alignment, TransformError> {
        if lead.company_name == self.0 {
            panic!("transform blew up");
        }
        Ok(KeywordAlignment::evaluate(lead, &ctx.sales_spec))
    }
}

#[tokio::test]
async fn test_guard_is_released_after_failure() {
    let routing = Arc::new(RoutingTable::random());
    let system = ActorSystem::new(Arc::clone(&routing));
    let (scoring, mut forwarded) = collector::<FilteredLeadBatch>(&routing, Role::Scoring);
    system.spawn(scoring).await.unwrap();

    let filter = FilterStage::new(Arc::new(PanicOn("boom")), 0.3);
    system.spawn(filter.actor(&routing).unwrap()).await.unwrap();
    let sender = Address::random();

    // missing sales spec is a handler error
    deliver(&system, &sender, Role::Alignment, lead_batch(None, &["A"])).await;
    wait_for_failures(&system, 1).await;

    // a panicking transform unwinds through the guard
    deliver(&system, &sender, Role::Alignment, lead_batch(Some("payments"), &["boom"])).await;
    wait_for_failures(&system, 2).await;

    deliver(&system, &sender, Role::Alignment, lead_batch(Some("payments"), &["ok"])).await;
    let (_, batch) = forwarded.recv().await.unwrap();
    assert_eq!(batch.leads[0].company_name, "ok");
}

async fn spawn_pipeline(system: &ActorSystem) {
    let routing = Arc::clone(system.routing());
    let stages = [
        IntakeStage::new(Arc::new(StaticLeadSource::builtin())).actor(&routing),
        FilterStage::new(Arc::new(KeywordAlignment::new()), 0.3).actor(&routing),
        ScorerStage::new(Arc::new(WeightedScoring::new())).actor(&routing),
        SummarizerStage::new(Arc::new(TemplateSummarizer::new())).actor(&routing),
    ];
    for stage in stages {
        system.spawn(stage.unwrap()).await.unwrap();
    }
}

#[tokio::test]
async fn test_sales_spec_flows_back_to_requester() {
    let routing = Arc::new(RoutingTable::random());
    let system = ActorSystem::new(Arc::clone(&routing));
    let (bridge, mut replies) = collector::<SummaryResponse>(&routing, Role::Bridge);
    let requester = bridge.address().clone();
    system.spawn(bridge).await.unwrap();
    spawn_pipeline(&system).await;

    let id = CorrelationId::new();
    let mut metadata = Metadata::new();
    metadata::tag_request(&mut metadata, id, &requester);
    let spec = SalesSpec {
        company_name: "Buyer".into(),
        spec: "B2B fintech".into(),
        bounty_amount: 100.0,
        metadata,
    };
    deliver(&system, &requester, Role::Scraper, Message::new(spec).with_correlation_id(id)).await;

    let (correlation_id, response) =
        tokio::time::timeout(Duration::from_secs(5), replies.recv())
            .await
            .unwrap()
            .unwrap();

    assert_eq!(correlation_id, Some(id));
    let names: Vec<_> = response
        .summaries
        .iter()
        .map(|s| s.company_name.as_str())
        .collect();
    // HealthAI misses both keywords and is filtered out
    assert_eq!(names, ["FinanceApp", "TechCorp", "CloudSecure", "DataFlow"]);
    assert_eq!(response.metadata[keys::COUNT], 4);
    assert_eq!(response.metadata[keys::SOURCE], "summary_agent");
    assert_eq!(response.metadata[keys::FILTERED_LEAD_COUNT], 4);
    assert_eq!(response.metadata[keys::ORIGINAL_LEAD_COUNT], 5);

    // stored summaries answer a later request
    let request = SummaryRequest {
        request_id: "later".into(),
        metadata: Metadata::new(),
    };
    deliver(&system, &requester, Role::Summary, Message::new(request)).await;
    let (_, response) = tokio::time::timeout(Duration::from_secs(5), replies.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.summaries.len(), 4);
    assert_eq!(response.metadata[keys::REQUEST_ID], "later");
    assert_eq!(
        response.metadata[keys::AGENT_ADDRESS],
        routing.address(Role::Summary).unwrap().to_string()
    );
}

#[tokio::test]
async fn test_summary_request_before_any_batch_is_empty() {
    let routing = Arc::new(RoutingTable::random());
    let system = ActorSystem::new(Arc::clone(&routing));
    let (bridge, mut replies) = collector::<SummaryResponse>(&routing, Role::Bridge);
    let requester = bridge.address().clone();
    system.spawn(bridge).await.unwrap();
    spawn_pipeline(&system).await;

    let request = SummaryRequest {
        request_id: "first".into(),
        metadata: Metadata::new(),
    };
    deliver(&system, &requester, Role::Summary, Message::new(request)).await;

    let (_, response) = tokio::time::timeout(Duration::from_secs(5), replies.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(response.summaries.is_empty());
    assert_eq!(response.metadata[keys::COUNT], 0);
}
