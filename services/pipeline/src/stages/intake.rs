use super::{announce, begin, pass_on, Stage};
use crate::error::TransformError;
use crate::source::LeadSource;
use messaging_actors::{ActorBuilder, ActorContext, ActorError, AgentProfile, Inbound};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use types::metadata::{self, keys};
use types::{Address, LeadBatch, Role, SalesSpec};

/// Turns a sales spec into a batch of raw leads
pub struct IntakeStage {
    source: Arc<dyn LeadSource>,
}

impl IntakeStage {
    pub fn new(source: Arc<dyn LeadSource>) -> Self {
        Self { source }
    }

    /// Load leads for `spec`; `None` when the source has nothing
    pub async fn process(&self, spec: &SalesSpec) -> Result<Option<LeadBatch>, TransformError> {
        let leads = self.source.load().await?;
        if leads.is_empty() {
            return Ok(None);
        }

        let mut metadata = metadata::stamp(&spec.metadata, Self::NAME);
        metadata.insert(keys::SALES_SPEC.into(), Value::from(spec.spec.as_str()));
        metadata.insert(keys::COMPANY_NAME.into(), Value::from(spec.company_name.as_str()));
        metadata.insert(keys::BOUNTY_AMOUNT.into(), Value::from(spec.bounty_amount));
        metadata.insert(keys::LEAD_COUNT.into(), Value::from(leads.len()));

        Ok(Some(LeadBatch { leads, metadata }))
    }

    async fn handle(&self, ctx: ActorContext, msg: Inbound<SalesSpec>) -> messaging_actors::Result<()> {
        info!(
            actor = %ctx.name(),
            from = %msg.from,
            company = %msg.body.company_name,
            bounty = msg.body.bounty_amount,
            "Received sales spec"
        );
        ctx.state().put(keys::SALES_SPEC, &msg.body)?;

        let Some(_guard) = begin(&ctx) else {
            return Ok(());
        };

        let batch = self
            .process(&msg.body)
            .await
            .map_err(|e| ActorError::handler_with_source("lead intake failed", e))?;

        match batch {
            Some(batch) => {
                info!(actor = %ctx.name(), count = batch.leads.len(), "Sending leads to alignment");
                pass_on(&ctx, Self::ROLE, batch, msg.correlation_id()).await?;
            }
            None => warn!(actor = %ctx.name(), "Lead source returned no leads"),
        }
        Ok(())
    }
}

impl Stage for IntakeStage {
    const ROLE: Role = Role::Scraper;
    const NAME: &'static str = "scraper_agent";

    fn profile() -> AgentProfile {
        AgentProfile::new("Lead Generation Scraper Agent", Self::ROLE)
            .with_capabilities(["lead_scraping", "data_collection"])
            .with_description("Collects candidate leads for a sales spec")
    }

    fn into_actor(self, address: Address) -> ActorBuilder {
        let stage = Arc::new(self);
        ActorBuilder::new(Self::NAME, address)
            .on_startup(|ctx| announce(ctx, Self::ROLE))
            .on_message(move |ctx, msg: Inbound<SalesSpec>| {
                let stage = Arc::clone(&stage);
                async move { stage.handle(ctx, msg).await }
            })
    }
}
