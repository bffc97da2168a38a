use super::{announce, begin, pass_on, Stage};
use crate::error::TransformError;
use crate::transform::{SharedTransform, TransformContext};
use futures::future::join_all;
use messaging_actors::{ActorBuilder, ActorContext, ActorError, AgentProfile, Inbound};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::metadata::{self, keys};
use types::{Address, Alignment, FilteredLeadBatch, LeadBatch, Role};

/// Drops leads whose alignment with the sales spec falls below a threshold
pub struct FilterStage {
    alignment: SharedTransform<Alignment>,
    threshold: f64,
}

impl FilterStage {
    pub fn new(alignment: SharedTransform<Alignment>, threshold: f64) -> Self {
        Self {
            alignment,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Align every lead concurrently and keep those at or above the threshold.
    ///
    /// `alignment_results` holds every lead that aligned, kept or not, keyed
    /// by company name. Returns `None` when nothing passed.
    pub async fn process(
        &self,
        batch: &LeadBatch,
    ) -> Result<Option<FilteredLeadBatch>, TransformError> {
        let sales_spec = metadata::get_str(&batch.metadata, keys::SALES_SPEC)
            .filter(|spec| !spec.trim().is_empty())
            .ok_or(TransformError::MissingContext("sales_spec"))?;
        let ctx = TransformContext::new(sales_spec);

        let results = join_all(
            batch
                .leads
                .iter()
                .map(|lead| self.alignment.apply(lead, &ctx)),
        )
        .await;

        let mut alignment_results = BTreeMap::new();
        let mut leads = Vec::new();
        for (lead, result) in batch.leads.iter().zip(results) {
            let alignment = match result {
                Ok(alignment) => alignment,
                Err(e) => {
                    warn!(
                        transform = self.alignment.name(),
                        company = %lead.company_name,
                        error = %e,
                        "Alignment failed - skipping lead"
                    );
                    continue;
                }
            };

            alignment_results.insert(lead.identity().to_string(), alignment.clone());
            if alignment.score >= self.threshold {
                debug!(company = %lead.company_name, score = alignment.score, "Lead passed alignment");
                let mut lead = lead.clone();
                lead.alignment = Some(alignment);
                leads.push(lead);
            } else {
                debug!(company = %lead.company_name, score = alignment.score, "Lead filtered out");
            }
        }

        if leads.is_empty() {
            return Ok(None);
        }

        let mut metadata = metadata::stamp(&batch.metadata, Self::NAME);
        metadata.insert(keys::ORIGINAL_LEAD_COUNT.into(), Value::from(batch.leads.len()));
        metadata.insert(keys::FILTERED_LEAD_COUNT.into(), Value::from(leads.len()));

        Ok(Some(FilteredLeadBatch {
            leads,
            metadata,
            alignment_results,
        }))
    }

    async fn handle(&self, ctx: ActorContext, msg: Inbound<LeadBatch>) -> messaging_actors::Result<()> {
        info!(
            actor = %ctx.name(),
            from = %msg.from,
            count = msg.body.leads.len(),
            "Received leads for alignment"
        );

        let Some(_guard) = begin(&ctx) else {
            return Ok(());
        };

        let filtered = self
            .process(&msg.body)
            .await
            .map_err(|e| ActorError::handler_with_source("alignment filtering failed", e))?;

        match filtered {
            Some(batch) => {
                info!(
                    actor = %ctx.name(),
                    passed = batch.leads.len(),
                    total = msg.body.leads.len(),
                    "Sending aligned leads to scoring"
                );
                pass_on(&ctx, Self::ROLE, batch, msg.correlation_id()).await?;
            }
            None => warn!(
                actor = %ctx.name(),
                threshold = self.threshold,
                "No leads passed alignment filtering"
            ),
        }
        Ok(())
    }
}

impl Stage for FilterStage {
    const ROLE: Role = Role::Alignment;
    const NAME: &'static str = "alignment_agent";

    fn profile() -> AgentProfile {
        AgentProfile::new("Lead Generation Alignment Agent", Self::ROLE)
            .with_capabilities(["intent_matching", "lead_filtering"])
            .with_description("Keeps leads that align with the sales spec")
    }

    fn into_actor(self, address: Address) -> ActorBuilder {
        let stage = Arc::new(self);
        ActorBuilder::new(Self::NAME, address)
            .on_startup(|ctx| announce(ctx, Self::ROLE))
            .on_message(move |ctx, msg: Inbound<LeadBatch>| {
                let stage = Arc::clone(&stage);
                async move { stage.handle(ctx, msg).await }
            })
    }
}
