//! Lead records and the enrichment each stage attaches to them

use crate::Metadata;
use serde::{Deserialize, Serialize};

fn unknown_company() -> String {
    "Unknown".to_string()
}

/// A prospective customer as collected by the intake stage.
///
/// Fields the pipeline does not know about are kept in `extra` so they
/// survive every hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default = "unknown_company")]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub employees: u32,
    #[serde(default)]
    pub funding: String,
    #[serde(default)]
    pub investors: Vec<String>,
    #[serde(default)]
    pub growth: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub contact: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<Scoring>,

    #[serde(flatten)]
    pub extra: Metadata,
}

impl Lead {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            industry: String::new(),
            description: String::new(),
            employees: 0,
            funding: String::new(),
            investors: Vec::new(),
            growth: String::new(),
            website: String::new(),
            contact: String::new(),
            alignment: None,
            scoring: None,
            extra: Metadata::new(),
        }
    }

    /// Key used for per-job result maps.
    ///
    /// Two leads with the same company name share a key; the later one wins.
    pub fn identity(&self) -> &str {
        &self.company_name
    }

    /// Score assigned by the scoring stage, 0.0 when not scored yet
    pub fn score(&self) -> f64 {
        self.scoring.as_ref().map(|s| s.score).unwrap_or(0.0)
    }
}

/// How well a lead matches the sales spec, in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub score: f64,
    pub reasoning: String,
    pub matches: u32,
    pub total_keywords: u32,
}

/// Lead quality score in [0, 100] and the derived price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoring {
    pub score: f64,
    pub price: f64,
    pub reasoning: String,
    pub factors: Vec<String>,
}

/// Contact details revealed to the buyer after payment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncryptedContact {
    pub website: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeadSummary {
    pub company_name: String,
    pub industry: String,
    pub tldr: String,
    pub detailed: String,
    pub price: f64,
    pub confidence: String,
    pub knowledge_connections: Vec<String>,
    pub encrypted_contact: EncryptedContact,
}
