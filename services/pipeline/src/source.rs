//! Where the intake stage gets its leads

use crate::error::TransformError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};
use types::Lead;

#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Lead>, TransformError>;
}

/// Fixed in-memory lead list
#[derive(Debug, Clone)]
pub struct StaticLeadSource {
    leads: Vec<Lead>,
}

impl StaticLeadSource {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads }
    }

    /// The five demo companies
    pub fn builtin() -> Self {
        Self::new(builtin_leads())
    }
}

impl Default for StaticLeadSource {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl LeadSource for StaticLeadSource {
    async fn load(&self) -> Result<Vec<Lead>, TransformError> {
        Ok(self.leads.clone())
    }
}

/// Reads a JSON array of leads, falling back to the built-in list when the
/// file is missing or malformed
#[derive(Debug, Clone)]
pub struct JsonFileLeadSource {
    path: PathBuf,
}

impl JsonFileLeadSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Strict read, no fallback
    pub async fn read(&self) -> Result<Vec<Lead>, TransformError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TransformError::source_with(format!("cannot read {}", self.path.display()), e)
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            TransformError::source_with(format!("invalid lead file {}", self.path.display()), e)
        })
    }
}

#[async_trait]
impl LeadSource for JsonFileLeadSource {
    async fn load(&self) -> Result<Vec<Lead>, TransformError> {
        match self.read().await {
            Ok(leads) => {
                info!(path = %self.path.display(), count = leads.len(), "Loaded leads from file");
                Ok(leads)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Lead file not found or invalid - using built-in leads"
                );
                Ok(builtin_leads())
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn lead(
    company_name: &str,
    industry: &str,
    description: &str,
    employees: u32,
    funding: &str,
    investors: &[&str],
    growth: &str,
    website: &str,
    contact: &str,
) -> Lead {
    let mut lead = Lead::new(company_name);
    lead.industry = industry.to_string();
    lead.description = description.to_string();
    lead.employees = employees;
    lead.funding = funding.to_string();
    lead.investors = investors.iter().map(|i| i.to_string()).collect();
    lead.growth = growth.to_string();
    lead.website = website.to_string();
    lead.contact = contact.to_string();
    lead
}

/// Demo companies used when no lead file is configured
pub fn builtin_leads() -> Vec<Lead> {
    vec![
        lead(
            "TechCorp",
            "fintech",
            "B2B SaaS company offering payment API solutions",
            50,
            "Series A",
            &["InvestorX", "VentureY"],
            "2x YoY",
            "techcorp.io",
            "info@techcorp.io",
        ),
        lead(
            "HealthAI",
            "healthcare",
            "AI diagnostics platform for hospitals",
            120,
            "Series B",
            &["MedFund", "HealthVentures"],
            "80% YoY",
            "healthai.com",
            "contact@healthai.com",
        ),
        lead(
            "DataFlow",
            "data analytics",
            "B2B data pipeline solutions for enterprise",
            75,
            "Series A",
            &["DataCapital", "InvestorX"],
            "1.5x YoY",
            "dataflow.tech",
            "sales@dataflow.tech",
        ),
        lead(
            "CloudSecure",
            "cybersecurity",
            "B2B cloud security platform",
            60,
            "Seed",
            &["SecureVentures"],
            "3x YoY",
            "cloudsecure.dev",
            "hello@cloudsecure.dev",
        ),
        lead(
            "FinanceApp",
            "fintech",
            "Consumer banking application with B2B API",
            200,
            "Series C",
            &["FinCapital", "VentureY"],
            "70% YoY",
            "financeapp.com",
            "partnerships@financeapp.com",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_builtin_source() {
        let leads = StaticLeadSource::builtin().load().await.unwrap();
        let names: Vec<_> = leads.iter().map(|l| l.company_name.as_str()).collect();
        assert_eq!(
            names,
            ["TechCorp", "HealthAI", "DataFlow", "CloudSecure", "FinanceApp"]
        );
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.json");
        fs::write(
            &path,
            r#"[{"company_name": "Acme", "industry": "retail", "employees": 12, "region": "EU"}]"#,
        )
        .unwrap();

        let leads = JsonFileLeadSource::new(&path).load().await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].company_name, "Acme");
        assert_eq!(leads[0].extra["region"], "EU");
    }

    #[tokio::test]
    async fn test_missing_or_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let missing = JsonFileLeadSource::new(dir.path().join("absent.json"));
        assert!(missing.read().await.is_err());
        assert_eq!(missing.load().await.unwrap().len(), 5);

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(JsonFileLeadSource::new(&path).load().await.unwrap().len(), 5);
    }
}
