//! Full round trips: bridge → intake → filter → scorer → summarizer → bridge

use bridge::{AwaitOutcome, RequestStatus};
use leadgen::Deployment;
use leadgen_e2e_tests::{fast_config, init_tracing, three_lead_source, three_leads, FIXTURE_SPEC};
use std::time::Duration;
use types::metadata::keys;
use types::{CorrelationId, Metadata, Role, SummaryRequest};

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

#[tokio::test]
async fn test_filtered_leads_come_back_ranked() {
    init_tracing();
    let deployment = Deployment::start_with_source(&fast_config(), three_lead_source())
        .await
        .unwrap();

    let reply = deployment
        .request("Buyer", FIXTURE_SPEC, 150.0, WAIT)
        .await
        .unwrap()
        .into_reply()
        .expect("summaries before the timeout");

    let names: Vec<_> = reply
        .summaries
        .iter()
        .map(|s| s.company_name.as_str())
        .collect();
    assert_eq!(names, ["PayGrid", "Ledgerly"]);

    // prices come from the scorer, not the unscored default
    assert_eq!(reply.summaries[0].price, 820.0);
    assert_eq!(reply.summaries[1].price, 490.0);
    assert_eq!(reply.summaries[0].confidence, "Very High");
    assert_eq!(reply.summaries[1].confidence, "Medium");

    assert_eq!(reply.metadata[keys::ORIGINAL_LEAD_COUNT], 3);
    assert_eq!(reply.metadata[keys::FILTERED_LEAD_COUNT], 2);
    assert_eq!(reply.metadata[keys::LEAD_COUNT], 2);
    assert_eq!(reply.metadata[keys::COUNT], 2);
    assert_eq!(reply.metadata[keys::SALES_SPEC], FIXTURE_SPEC);
    assert_eq!(reply.metadata[keys::COMPANY_NAME], "Buyer");

    assert_eq!(deployment.bridge().pending_count(), 0);
    deployment.shutdown().await;
}

#[tokio::test]
async fn test_summaries_can_be_fetched_again() {
    init_tracing();
    let deployment = Deployment::start_with_source(&fast_config(), three_lead_source())
        .await
        .unwrap();

    let first = deployment
        .request("Buyer", FIXTURE_SPEC, 150.0, WAIT)
        .await
        .unwrap();
    assert!(matches!(first, AwaitOutcome::Ready(_)));

    let stored = deployment
        .stored_summaries(WAIT)
        .await
        .unwrap()
        .into_reply()
        .expect("stored summaries");
    assert_eq!(stored.summaries.len(), 2);
    assert_eq!(stored.summaries[0].company_name, "PayGrid");
    deployment.shutdown().await;
}

#[tokio::test]
async fn test_no_match_times_out_without_error() {
    init_tracing();
    let deployment = Deployment::start_with_source(&fast_config(), three_lead_source())
        .await
        .unwrap();

    let bridge = deployment.bridge();
    let id = bridge
        .submit_sales_spec("Buyer", "quantum biology", 10.0)
        .unwrap();
    let outcome = bridge.await_result(id, Some(Duration::from_millis(500))).await;

    assert_eq!(outcome, AwaitOutcome::TimedOut);
    assert_eq!(bridge.status(&id), Some(RequestStatus::TimedOut));
    assert_eq!(bridge.queued(), 0);
    deployment.shutdown().await;
}

#[tokio::test]
async fn test_lead_file_feeds_intake() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leads.json");
    std::fs::write(&path, serde_json::to_string(&three_leads()).unwrap()).unwrap();

    let mut config = fast_config();
    config.pipeline.lead_file = Some(path);
    let deployment = Deployment::start(&config).await.unwrap();

    let reply = deployment
        .request("Buyer", FIXTURE_SPEC, 150.0, WAIT)
        .await
        .unwrap()
        .into_reply()
        .expect("summaries before the timeout");
    assert_eq!(reply.summaries.len(), 2);
    deployment.shutdown().await;
}

#[tokio::test]
async fn test_builtin_leads_by_default() {
    init_tracing();
    let deployment = Deployment::start(&fast_config()).await.unwrap();

    let reply = deployment
        .request("TechCorp", "B2B fintech", 100.0, WAIT)
        .await
        .unwrap()
        .into_reply()
        .expect("summaries before the timeout");

    let names: Vec<_> = reply
        .summaries
        .iter()
        .map(|s| s.company_name.as_str())
        .collect();
    assert_eq!(names, ["FinanceApp", "TechCorp", "CloudSecure", "DataFlow"]);
    deployment.shutdown().await;
}

#[tokio::test]
async fn test_generic_summary_request_answers_under_returned_id() {
    init_tracing();
    let deployment = Deployment::start_with_source(&fast_config(), three_lead_source())
        .await
        .unwrap();
    deployment
        .request("Buyer", FIXTURE_SPEC, 150.0, WAIT)
        .await
        .unwrap()
        .into_reply()
        .expect("summaries before the timeout");

    // the caller's own token must not decide where the reply is filed
    let bridge = deployment.bridge();
    let request = SummaryRequest {
        request_id: CorrelationId::new().to_string(),
        metadata: Metadata::new(),
    };
    let id = bridge.submit(Role::Summary, request).unwrap();

    let reply = bridge
        .await_result(id, WAIT)
        .await
        .into_reply()
        .expect("stored summaries under the submitted id");
    assert_eq!(reply.summaries.len(), 2);
    assert_eq!(bridge.pending_count(), 0);
    deployment.shutdown().await;
}
