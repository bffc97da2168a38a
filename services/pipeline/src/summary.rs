//! Template-based lead summaries

use crate::error::TransformError;
use crate::transform::{Transform, TransformContext};
use async_trait::async_trait;
use types::{EncryptedContact, Lead, LeadSummary};

const DEFAULT_SCORE: f64 = 50.0;
const DEFAULT_PRICE: f64 = 500.0;

/// Investor the buyer already has a relationship with
const PORTFOLIO_INVESTOR: &str = "InvestorX";

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize(lead: &Lead, ctx: &TransformContext) -> LeadSummary {
        let alignment = lead.alignment.as_ref().or(ctx.alignment.as_ref());
        let scoring = lead.scoring.as_ref().or(ctx.scoring.as_ref());

        let knowledge_connections = knowledge_connections(lead);

        let industry_focus = match lead.industry.as_str() {
            "fintech" => {
                let focus: Vec<&str> = lead.description.split(' ').skip(3).take(3).collect();
                format!("aligns with your fintech focus through their {}", focus.join(" "))
            }
            "healthcare" => {
                "offers healthcare solutions that could expand your portfolio diversity".to_string()
            }
            other => format!("operates in the {other} space"),
        };

        let alignment_insight = format!(
            "matches {}/{} of your criteria",
            alignment.map(|a| a.matches).unwrap_or(0),
            alignment.map(|a| a.total_keywords).unwrap_or(1)
        );

        let mut tldr = format!("{} {}.", lead.company_name, industry_focus);
        if !lead.funding.is_empty() {
            tldr.push_str(&format!(" Their {} funding", lead.funding));
        }
        if let Some(connection) = knowledge_connections.first() {
            tldr.push_str(&format!(" {connection}."));
        }
        tldr.push_str(&format!(
            " Based on the alignment analysis, they {alignment_insight}."
        ));
        if let Some(highlight) = scoring.and_then(|s| strongest_factor(&s.factors)) {
            tldr.push_str(&format!(" Scoring rated them highly on {highlight}."));
        }

        let mut detailed = format!(
            "{} is a {} company with {} employees, offering {}. ",
            lead.company_name, lead.industry, lead.employees, lead.description
        );
        detailed.push_str(&format!(
            "They have secured {} funding and are experiencing {} growth. ",
            lead.funding, lead.growth
        ));
        detailed.push_str(&format!(
            "\n\nAlignment Analysis: {}\n",
            alignment.map(|a| a.reasoning.as_str()).unwrap_or_default()
        ));
        detailed.push_str(&format!(
            "Scoring Analysis: {}\n",
            scoring.map(|s| s.reasoning.as_str()).unwrap_or_default()
        ));
        if !knowledge_connections.is_empty() {
            detailed.push_str("\nKnowledge Graph Connections:\n");
            for connection in &knowledge_connections {
                detailed.push_str(&format!("- {connection}\n"));
            }
        }

        let score = scoring.map(|s| s.score).unwrap_or(DEFAULT_SCORE);

        LeadSummary {
            company_name: lead.company_name.clone(),
            industry: lead.industry.clone(),
            tldr,
            detailed,
            price: scoring.map(|s| s.price).unwrap_or(DEFAULT_PRICE),
            confidence: confidence(score).to_string(),
            knowledge_connections,
            encrypted_contact: EncryptedContact {
                website: lead.website.clone(),
                contact: lead.contact.clone(),
            },
        }
    }
}

fn knowledge_connections(lead: &Lead) -> Vec<String> {
    let mut connections = Vec::new();
    if lead.investors.iter().any(|i| i == PORTFOLIO_INVESTOR) {
        connections.push(format!("Connected to your portfolio company {PORTFOLIO_INVESTOR}"));
    }
    if lead.industry == "fintech" {
        connections
            .push("2 degrees from your existing client FinanceApp through shared investors".into());
    }
    connections
}

/// Confidence bucket for a 0-100 score
pub fn confidence(score: f64) -> &'static str {
    if score > 80.0 {
        "Very High"
    } else if score > 60.0 {
        "High"
    } else if score > 40.0 {
        "Medium"
    } else {
        "Low"
    }
}

/// Label of the factor worth the most points, e.g. "company size".
/// Factors look like `"Company size: 50 employees (5.0 points)"`.
fn strongest_factor(factors: &[String]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for factor in factors {
        let Some(points) = factor_points(factor) else {
            continue;
        };
        if best.map_or(true, |(top, _)| points > top) {
            best = Some((points, factor));
        }
    }
    best.map(|(_, factor)| {
        factor
            .split(':')
            .next()
            .unwrap_or(factor)
            .to_lowercase()
    })
}

fn factor_points(factor: &str) -> Option<f64> {
    let (_, rest) = factor.rsplit_once('(')?;
    rest.split_whitespace().next()?.parse().ok()
}

#[async_trait]
impl Transform for TemplateSummarizer {
    type Output = LeadSummary;

    fn name(&self) -> &'static str {
        "template_summarizer"
    }

    async fn apply(
        &self,
        lead: &Lead,
        ctx: &TransformContext,
    ) -> Result<LeadSummary, TransformError> {
        Ok(Self::summarize(lead, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::WeightedScoring;
    use types::Alignment;

    fn techcorp() -> Lead {
        let mut lead = Lead::new("TechCorp");
        lead.industry = "fintech".into();
        lead.description = "B2B SaaS company offering payment API solutions".into();
        lead.employees = 50;
        lead.funding = "Series A".into();
        lead.investors = vec!["InvestorX".into(), "VentureY".into()];
        lead.growth = "2x YoY".into();
        lead.website = "techcorp.io".into();
        lead.contact = "info@techcorp.io".into();
        lead.alignment = Some(Alignment {
            score: 0.75,
            reasoning: "Strong alignment with 3 keywords matching the sales spec".into(),
            matches: 3,
            total_keywords: 4,
        });
        lead
    }

    #[test]
    fn test_summary_carries_scoring_and_contact() {
        let mut lead = techcorp();
        lead.scoring = Some(WeightedScoring::evaluate(&lead, &TransformContext::default()));

        let summary = TemplateSummarizer::summarize(&lead, &TransformContext::default());

        assert_eq!(summary.company_name, "TechCorp");
        assert_eq!(summary.price, lead.scoring.as_ref().unwrap().price);
        assert_eq!(summary.encrypted_contact.contact, "info@techcorp.io");
        assert_eq!(summary.knowledge_connections.len(), 2);
        assert!(summary.tldr.contains("offering payment API"));
        assert!(summary.tldr.contains("matches 3/4 of your criteria"));
        assert!(summary.tldr.contains("highly on alignment with sales spec"));
        assert!(summary.detailed.contains("Knowledge Graph Connections"));
    }

    #[test]
    fn test_unscored_lead_uses_defaults() {
        let mut lead = techcorp();
        lead.industry = "retail".into();
        lead.investors.clear();

        let summary = TemplateSummarizer::summarize(&lead, &TransformContext::default());

        assert_eq!(summary.price, DEFAULT_PRICE);
        assert_eq!(summary.confidence, "Medium");
        assert!(summary.knowledge_connections.is_empty());
        assert!(summary.tldr.contains("operates in the retail space"));
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(confidence(95.0), "Very High");
        assert_eq!(confidence(80.0), "High");
        assert_eq!(confidence(60.5), "High");
        assert_eq!(confidence(41.0), "Medium");
        assert_eq!(confidence(40.0), "Low");
    }

    #[test]
    fn test_strongest_factor_prefers_first_on_tie() {
        let factors = vec![
            "Company size: 100 employees (10.0 points)".to_string(),
            "Funding stage: Series A (10.0 points)".to_string(),
            "garbage".to_string(),
        ];
        assert_eq!(strongest_factor(&factors).as_deref(), Some("company size"));
        assert_eq!(strongest_factor(&[]), None);
    }
}
