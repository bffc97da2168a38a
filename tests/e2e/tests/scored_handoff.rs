//! What the scorer hands to the summarizer, and what the summarizer makes of it

use leadgen::Deployment;
use leadgen_e2e_tests::{fast_config, init_tracing, three_lead_source, FIXTURE_SPEC};
use messaging_actors::{ActorBuilder, ActorError, ActorSystem, Envelope, Inbound};
use pipeline::{FilterStage, IntakeStage, KeywordAlignment, ScorerStage, Stage, WeightedScoring};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use types::{Address, CorrelationId, Message, Metadata, Role, RoutingTable, SalesSpec, ScoredLeadBatch};

const WAIT: Duration = Duration::from_secs(5);

async fn scored_batch_for_fixture() -> ScoredLeadBatch {
    let routing = Arc::new(RoutingTable::random());
    let system = ActorSystem::new(Arc::clone(&routing));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = ActorBuilder::new("summary-collector", routing.address(Role::Summary).unwrap().clone())
        .on_message(move |_ctx, msg: Inbound<ScoredLeadBatch>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(msg.body);
                Ok::<(), ActorError>(())
            }
        });
    system.spawn(summary).await.unwrap();

    let stages = [
        IntakeStage::new(three_lead_source()).actor(&routing),
        FilterStage::new(Arc::new(KeywordAlignment::new()), 0.3).actor(&routing),
        ScorerStage::new(Arc::new(WeightedScoring::new())).actor(&routing),
    ];
    for stage in stages {
        system.spawn(stage.unwrap()).await.unwrap();
    }

    let spec = SalesSpec {
        company_name: "Buyer".into(),
        spec: FIXTURE_SPEC.into(),
        bounty_amount: 150.0,
        metadata: Metadata::new(),
    };
    let to = routing.address(Role::Scraper).unwrap().clone();
    let message = Message::new(spec).with_correlation_id(CorrelationId::new());
    system
        .deliver(Envelope::new(Address::random(), to, message))
        .await
        .unwrap();

    let batch = tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("scored batch before the timeout")
        .unwrap();
    system.shutdown().await;
    batch
}

#[tokio::test]
async fn test_scorer_forwards_only_aligned_leads_with_scores() {
    init_tracing();
    let batch = scored_batch_for_fixture().await;

    let names: Vec<_> = batch.leads.iter().map(|l| l.company_name.as_str()).collect();
    assert_eq!(names, ["PayGrid", "Ledgerly"]);
    assert!(batch.leads.iter().all(|l| l.scoring.is_some()));
    assert!(batch.leads[0].score() > batch.leads[1].score());
    assert_eq!(batch.scoring_results.len(), 2);
    assert!(!batch.scoring_results.contains_key("Crumbs"));
}

#[tokio::test]
async fn test_summaries_keep_the_scored_order() {
    init_tracing();
    let scored: Vec<_> = scored_batch_for_fixture()
        .await
        .leads
        .into_iter()
        .map(|l| l.company_name)
        .collect();

    let deployment = Deployment::start_with_source(&fast_config(), three_lead_source())
        .await
        .unwrap();
    let reply = deployment
        .request("Buyer", FIXTURE_SPEC, 150.0, Some(WAIT))
        .await
        .unwrap()
        .into_reply()
        .expect("summaries before the timeout");
    let summarized: Vec<_> = reply.summaries.into_iter().map(|s| s.company_name).collect();

    assert_eq!(summarized, scored);
    deployment.shutdown().await;
}
