use super::{announce, begin, pass_on, Stage};
use crate::error::TransformError;
use crate::transform::{SharedTransform, TransformContext};
use futures::future::join_all;
use messaging_actors::{ActorBuilder, ActorContext, ActorError, AgentProfile, Inbound};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use types::metadata::{self, keys};
use types::{Address, FilteredLeadBatch, Lead, Role, ScoredLeadBatch, Scoring};

/// Scores aligned leads and orders them best first
pub struct ScorerStage {
    scoring: SharedTransform<Scoring>,
}

impl ScorerStage {
    pub fn new(scoring: SharedTransform<Scoring>) -> Self {
        Self { scoring }
    }

    /// Score every lead concurrently, then sort by score descending.
    ///
    /// The sort is stable: equal scores keep their incoming order.
    pub async fn process(
        &self,
        batch: &FilteredLeadBatch,
    ) -> Result<Option<ScoredLeadBatch>, TransformError> {
        let sales_spec = metadata::get_str(&batch.metadata, keys::SALES_SPEC).unwrap_or_default();
        let contexts: Vec<TransformContext> = batch
            .leads
            .iter()
            .map(|lead| {
                let alignment = batch
                    .alignment_results
                    .get(lead.identity())
                    .cloned()
                    .or_else(|| lead.alignment.clone());
                TransformContext::new(sales_spec).with_alignment(alignment)
            })
            .collect();

        let results = join_all(
            batch
                .leads
                .iter()
                .zip(&contexts)
                .map(|(lead, ctx)| self.scoring.apply(lead, ctx)),
        )
        .await;

        let mut scoring_results = BTreeMap::new();
        let mut leads: Vec<Lead> = Vec::with_capacity(batch.leads.len());
        for (lead, result) in batch.leads.iter().zip(results) {
            match result {
                Ok(scoring) => {
                    scoring_results.insert(lead.identity().to_string(), scoring.clone());
                    let mut lead = lead.clone();
                    lead.scoring = Some(scoring);
                    leads.push(lead);
                }
                Err(e) => warn!(
                    transform = self.scoring.name(),
                    company = %lead.company_name,
                    error = %e,
                    "Scoring failed - skipping lead"
                ),
            }
        }

        if leads.is_empty() {
            return Ok(None);
        }
        sort_by_score(&mut leads);

        let mut metadata = metadata::stamp(&batch.metadata, Self::NAME);
        metadata.insert(keys::LEAD_COUNT.into(), Value::from(leads.len()));

        Ok(Some(ScoredLeadBatch {
            leads,
            metadata,
            alignment_results: batch.alignment_results.clone(),
            scoring_results,
        }))
    }

    async fn handle(
        &self,
        ctx: ActorContext,
        msg: Inbound<FilteredLeadBatch>,
    ) -> messaging_actors::Result<()> {
        info!(
            actor = %ctx.name(),
            from = %msg.from,
            count = msg.body.leads.len(),
            "Received aligned leads for scoring"
        );

        let Some(_guard) = begin(&ctx) else {
            return Ok(());
        };

        let scored = self
            .process(&msg.body)
            .await
            .map_err(|e| ActorError::handler_with_source("lead scoring failed", e))?;

        match scored {
            Some(batch) => {
                if let Some(top) = batch.leads.first() {
                    info!(
                        actor = %ctx.name(),
                        count = batch.leads.len(),
                        top = %top.company_name,
                        top_score = top.score(),
                        "Sending scored leads to summary"
                    );
                }
                pass_on(&ctx, Self::ROLE, batch, msg.correlation_id()).await?;
            }
            None => warn!(actor = %ctx.name(), "No leads scored"),
        }
        Ok(())
    }
}

/// Highest score first, ties in arrival order
pub fn sort_by_score(leads: &mut [Lead]) {
    leads.sort_by(|a, b| b.score().total_cmp(&a.score()));
}

impl Stage for ScorerStage {
    const ROLE: Role = Role::Scoring;
    const NAME: &'static str = "scoring_agent";

    fn profile() -> AgentProfile {
        AgentProfile::new("Lead Generation Scoring Agent", Self::ROLE)
            .with_capabilities(["lead_scoring", "price_calculation"])
            .with_description("Scores and prices aligned leads")
    }

    fn into_actor(self, address: Address) -> ActorBuilder {
        let stage = Arc::new(self);
        ActorBuilder::new(Self::NAME, address)
            .on_startup(|ctx| announce(ctx, Self::ROLE))
            .on_message(move |ctx, msg: Inbound<FilteredLeadBatch>| {
                let stage = Arc::clone(&stage);
                async move { stage.handle(ctx, msg).await }
            })
    }
}
