//! Single-process deployment of the pipeline actors and the bridge

use anyhow::{Context, Result};
use bridge::{AwaitOutcome, Bridge, BridgeOptions};
use config::{BridgeSettings, PipelineConfig};
use messaging_actors::{ActorSystem, Discovery, InMemoryDiscovery};
use pipeline::{
    FilterStage, IntakeStage, JsonFileLeadSource, KeywordAlignment, LeadSource, ScorerStage,
    Stage, StaticLeadSource, SummarizerStage, TemplateSummarizer, Transform, WeightedScoring,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use types::RoutingTable;

pub struct Deployment {
    system: ActorSystem,
    bridge: Arc<Bridge>,
    discovery: Arc<dyn Discovery>,
}

impl Deployment {
    /// Spawn the four stages and the bridge on one actor system
    pub async fn start(config: &PipelineConfig) -> Result<Self> {
        Self::start_with_source(config, lead_source(config)).await
    }

    /// Same as [`Deployment::start`] with an explicit lead source for intake
    pub async fn start_with_source(
        config: &PipelineConfig,
        source: Arc<dyn LeadSource>,
    ) -> Result<Self> {
        let routing = Arc::new(
            config
                .routing_table()
                .context("Invalid routing configuration")?,
        );
        routing
            .require_all()
            .context("Routing table must name every role")?;
        let discovery: Arc<dyn Discovery> = Arc::new(InMemoryDiscovery::new());
        let system =
            ActorSystem::new(Arc::clone(&routing)).with_discovery(Arc::clone(&discovery));

        let latency = config.pipeline.transform_latency();
        let stages = [
            IntakeStage::new(source).actor(&routing)?,
            FilterStage::new(
                Arc::new(KeywordAlignment::new().with_latency(latency)),
                config.pipeline.alignment_threshold,
            )
            .actor(&routing)?,
            ScorerStage::new(Arc::new(WeightedScoring::new().with_latency(latency)))
                .actor(&routing)?,
            SummarizerStage::new(Arc::new(TemplateSummarizer::new().with_latency(latency)))
                .actor(&routing)?,
        ];
        for stage in stages {
            system
                .spawn(stage)
                .await
                .context("Failed to spawn pipeline stage")?;
        }

        let bridge = Arc::new(
            Bridge::new(
                Arc::clone(&routing),
                Arc::clone(system.transport()),
                bridge_options(&config.bridge),
            )
            .context("Failed to create bridge")?,
        );
        system
            .spawn(bridge.actor())
            .await
            .context("Failed to spawn bridge")?;

        log_routes(&routing);
        info!(actors = system.actor_count().await, "Deployment started");

        Ok(Self {
            system,
            bridge,
            discovery,
        })
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    /// Directory every actor registers with on startup
    pub fn discovery(&self) -> &Arc<dyn Discovery> {
        &self.discovery
    }

    /// Submit a sales spec and wait for the correlated summaries
    pub async fn request(
        &self,
        company_name: &str,
        spec: &str,
        bounty_amount: f64,
        timeout: Option<Duration>,
    ) -> Result<AwaitOutcome> {
        let id = self
            .bridge
            .submit_sales_spec(company_name, spec, bounty_amount)
            .context("Failed to submit sales spec")?;
        Ok(self.bridge.await_result(id, timeout).await)
    }

    /// Fetch whatever summaries the summarizer holds
    pub async fn stored_summaries(&self, timeout: Option<Duration>) -> Result<AwaitOutcome> {
        let id = self
            .bridge
            .request_summaries()
            .context("Failed to request summaries")?;
        Ok(self.bridge.await_result(id, timeout).await)
    }

    pub async fn shutdown(self) {
        let stats = self.bridge.metrics().get_stats();
        info!(
            submitted = stats.submitted,
            delivered = stats.delivered,
            replies = stats.replies_received,
            timeouts = stats.timeouts,
            "Shutting down deployment"
        );
        self.system.shutdown().await;
    }
}

/// Intake source for the configured lead file, built-in leads otherwise
pub fn lead_source(config: &PipelineConfig) -> Arc<dyn LeadSource> {
    match &config.pipeline.lead_file {
        Some(path) => Arc::new(JsonFileLeadSource::new(path)),
        None => Arc::new(StaticLeadSource::builtin()),
    }
}

pub fn bridge_options(settings: &BridgeSettings) -> BridgeOptions {
    BridgeOptions {
        delivery_tick: settings.delivery_tick(),
        poll_interval: settings.poll_interval(),
        default_timeout: settings.default_timeout(),
        max_delivery_attempts: settings.max_delivery_attempts,
        reply_retention: settings.reply_retention(),
    }
}

fn log_routes(routing: &RoutingTable) {
    for (role, address) in routing.iter() {
        info!(role = %role, address = %address, "Route");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_actors::AgentStatus;
    use types::Role;

    #[test]
    fn test_bridge_options_follow_settings() {
        let settings = BridgeSettings {
            delivery_tick_ms: 250,
            poll_interval_ms: 50,
            default_timeout_secs: 3,
            max_delivery_attempts: Some(4),
            reply_retention_secs: 90,
        };

        let options = bridge_options(&settings);

        assert_eq!(options.delivery_tick, Duration::from_millis(250));
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.default_timeout, Duration::from_secs(3));
        assert_eq!(options.max_delivery_attempts, Some(4));
        assert_eq!(options.reply_retention, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_start_spawns_five_actors() {
        let config = PipelineConfig::default();
        let deployment = Deployment::start(&config).await.unwrap();

        assert_eq!(deployment.system().actor_count().await, 5);

        let discovery = Arc::clone(deployment.discovery());
        let registered = discovery.list().await;
        let roles: Vec<Role> = registered.iter().map(|r| r.profile.role).collect();
        assert_eq!(roles, Role::ALL);
        assert!(registered.iter().all(|r| r.status == AgentStatus::Active));

        assert_eq!(
            deployment.bridge().address(),
            config.routing_table().unwrap().address(Role::Bridge).unwrap()
        );
        deployment.shutdown().await;

        let stopped = discovery.list().await;
        assert!(stopped.iter().all(|r| r.status == AgentStatus::Stopped));
    }
}
