//! End-to-end fixtures for the lead pipeline
//!
//! Scenarios run the real [`leadgen::Deployment`] with fast bridge timing and
//! a small, known lead list so the expected ranking can be worked out by hand.

use config::PipelineConfig;
use pipeline::{LeadSource, StaticLeadSource};
use std::sync::{Arc, Once};
use types::Lead;

/// Sales spec the fixture leads are judged against
pub const FIXTURE_SPEC: &str = "b2b payments";

/// Bridge timing short enough for tests
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.bridge.delivery_tick_ms = 10;
    config.bridge.poll_interval_ms = 10;
    config.bridge.default_timeout_secs = 5;
    config
}

/// Three leads against [`FIXTURE_SPEC`]:
///
/// | Lead        | Alignment | Weighted score        |
/// |-------------|-----------|-----------------------|
/// | Ledgerly    | 0.5       | 25 + 4 + 10 + 10 = 49 |
/// | PayGrid     | 1.0       | 50 + 12 + 12 + 8 = 82 |
/// | Crumbs      | 0.0       | filtered out          |
pub fn three_leads() -> Vec<Lead> {
    vec![
        lead("Ledgerly", "fintech", "Payments reconciliation", 40, "Series A", "2x YoY"),
        lead("PayGrid", "fintech", "B2B payments network", 120, "Series B", "80% YoY"),
        lead("Crumbs", "food", "Neighbourhood bakery chain", 300, "Series C", "3x YoY"),
    ]
}

pub fn three_lead_source() -> Arc<dyn LeadSource> {
    Arc::new(StaticLeadSource::new(three_leads()))
}

fn lead(
    name: &str,
    industry: &str,
    description: &str,
    employees: u32,
    funding: &str,
    growth: &str,
) -> Lead {
    let mut lead = Lead::new(name);
    lead.industry = industry.into();
    lead.description = description.into();
    lead.employees = employees;
    lead.funding = funding.into();
    lead.growth = growth.into();
    lead.website = format!("{}.example", name.to_lowercase());
    lead.contact = format!("sales@{}.example", name.to_lowercase());
    lead
}

static TRACING: Once = Once::new();

/// Test logging, filtered by RUST_LOG (warnings only by default)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
