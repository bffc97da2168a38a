use super::{announce, begin, forward, Stage};
use crate::error::TransformError;
use crate::transform::{SharedTransform, TransformContext};
use futures::future::join_all;
use messaging_actors::{ActorBuilder, ActorContext, ActorError, AgentProfile, Inbound};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use types::metadata::{self, keys};
use types::{
    Address, CorrelationId, LeadSummary, Metadata, Role, ScoredLeadBatch, SummaryRequest,
    SummaryResponse,
};

/// State key under which the latest summaries are kept
pub const SUMMARIES_KEY: &str = "lead_summaries";

/// Writes one summary per scored lead and answers summary requests
pub struct SummarizerStage {
    summarizer: SharedTransform<LeadSummary>,
}

impl SummarizerStage {
    pub fn new(summarizer: SharedTransform<LeadSummary>) -> Self {
        Self { summarizer }
    }

    /// Summaries in the order the scorer ranked the leads
    pub async fn process(
        &self,
        batch: &ScoredLeadBatch,
    ) -> Result<Option<Vec<LeadSummary>>, TransformError> {
        let sales_spec = metadata::get_str(&batch.metadata, keys::SALES_SPEC).unwrap_or_default();
        let contexts: Vec<TransformContext> = batch
            .leads
            .iter()
            .map(|lead| {
                TransformContext::new(sales_spec)
                    .with_alignment(batch.alignment_results.get(lead.identity()).cloned())
                    .with_scoring(batch.scoring_results.get(lead.identity()).cloned())
            })
            .collect();

        let results = join_all(
            batch
                .leads
                .iter()
                .zip(&contexts)
                .map(|(lead, ctx)| self.summarizer.apply(lead, ctx)),
        )
        .await;

        let summaries: Vec<LeadSummary> = batch
            .leads
            .iter()
            .zip(results)
            .filter_map(|(lead, result)| match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(
                        transform = self.summarizer.name(),
                        company = %lead.company_name,
                        error = %e,
                        "Summary failed - skipping lead"
                    );
                    None
                }
            })
            .collect();

        Ok((!summaries.is_empty()).then_some(summaries))
    }

    async fn handle_batch(
        &self,
        ctx: ActorContext,
        msg: Inbound<ScoredLeadBatch>,
    ) -> messaging_actors::Result<()> {
        info!(
            actor = %ctx.name(),
            from = %msg.from,
            count = msg.body.leads.len(),
            "Received scored leads for summary"
        );

        let Some(_guard) = begin(&ctx) else {
            return Ok(());
        };

        let summaries = self
            .process(&msg.body)
            .await
            .map_err(|e| ActorError::handler_with_source("lead summary failed", e))?;
        let Some(summaries) = summaries else {
            warn!(actor = %ctx.name(), "No summaries generated");
            return Ok(());
        };

        ctx.state().put(SUMMARIES_KEY, &summaries)?;
        info!(actor = %ctx.name(), count = summaries.len(), "Stored lead summaries");

        let Some(requester) = metadata::requester(&msg.body.metadata) else {
            info!(actor = %ctx.name(), "No requester on batch - summaries kept for later requests");
            return Ok(());
        };

        let mut metadata = metadata::stamp(&msg.body.metadata, Self::NAME);
        metadata.insert(keys::COUNT.into(), Value::from(summaries.len()));
        metadata.insert(keys::AGENT_ADDRESS.into(), Value::from(ctx.address().to_string()));

        let correlation_id = metadata::request_id(&msg.body.metadata).or(msg.correlation_id());
        ctx.reply(
            &requester,
            forward(SummaryResponse { summaries, metadata }, correlation_id),
        )
        .await;
        Ok(())
    }

    async fn handle_request(
        ctx: ActorContext,
        msg: Inbound<SummaryRequest>,
    ) -> messaging_actors::Result<()> {
        let summaries: Vec<LeadSummary> = ctx.state().get_as(SUMMARIES_KEY)?.unwrap_or_default();
        info!(
            actor = %ctx.name(),
            from = %msg.from,
            request_id = %msg.body.request_id,
            count = summaries.len(),
            "Answering summary request"
        );

        // the envelope id is what the sender waits on; the body id is a fallback
        let correlation_id = msg
            .correlation_id()
            .or_else(|| msg.body.request_id.parse::<CorrelationId>().ok());
        let response = SummaryResponse {
            metadata: request_metadata(&msg.body, correlation_id, ctx.address(), summaries.len()),
            summaries,
        };
        ctx.reply(&msg.from, forward(response, correlation_id)).await;
        Ok(())
    }
}

fn request_metadata(
    request: &SummaryRequest,
    correlation_id: Option<CorrelationId>,
    agent: &Address,
    count: usize,
) -> Metadata {
    let request_id = correlation_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| request.request_id.clone());
    let mut metadata = metadata::stamp(&request.metadata, SummarizerStage::NAME);
    metadata.insert(keys::COUNT.into(), Value::from(count));
    metadata.insert(keys::AGENT_ADDRESS.into(), Value::from(agent.to_string()));
    metadata.insert(keys::REQUEST_ID.into(), Value::from(request_id));
    metadata
}

impl Stage for SummarizerStage {
    const ROLE: Role = Role::Summary;
    const NAME: &'static str = "summary_agent";

    fn profile() -> AgentProfile {
        AgentProfile::new("Lead Generation Summary Agent", Self::ROLE)
            .with_capabilities(["lead_summarization", "knowledge_graph", "context_awareness"])
            .with_description("Summarizes ranked leads for the buyer")
    }

    fn into_actor(self, address: Address) -> ActorBuilder {
        let stage = Arc::new(self);
        ActorBuilder::new(Self::NAME, address)
            .on_startup(|ctx| announce(ctx, Self::ROLE))
            .on_message(move |ctx, msg: Inbound<ScoredLeadBatch>| {
                let stage = Arc::clone(&stage);
                async move { stage.handle_batch(ctx, msg).await }
            })
            .on_message(|ctx, msg: Inbound<SummaryRequest>| Self::handle_request(ctx, msg))
    }
}
