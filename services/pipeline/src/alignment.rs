//! Keyword-overlap alignment between a lead and the sales spec

use crate::error::TransformError;
use crate::transform::{Transform, TransformContext};
use async_trait::async_trait;
use types::{Alignment, Lead};

/// Scores a lead by the fraction of spec keywords that occur in its
/// description or industry (substring match, case-insensitive).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordAlignment;

impl KeywordAlignment {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(lead: &Lead, sales_spec: &str) -> Alignment {
        let spec = sales_spec.to_lowercase();
        let keywords: Vec<&str> = spec.split_whitespace().collect();
        let description = lead.description.to_lowercase();
        let industry = lead.industry.to_lowercase();

        let matches = keywords
            .iter()
            .filter(|keyword| description.contains(*keyword) || industry.contains(*keyword))
            .count();
        let score = (matches as f64 / keywords.len().max(1) as f64).min(1.0);

        let reasoning = if score > 0.7 {
            format!("Strong alignment with {matches} keywords matching the sales spec")
        } else if score > 0.3 {
            format!("Moderate alignment with {matches} keywords matching the sales spec")
        } else {
            format!("Low alignment with only {matches} keywords matching the sales spec")
        };

        Alignment {
            score,
            reasoning,
            matches: matches as u32,
            total_keywords: keywords.len() as u32,
        }
    }
}

#[async_trait]
impl Transform for KeywordAlignment {
    type Output = Alignment;

    fn name(&self) -> &'static str {
        "keyword_alignment"
    }

    async fn apply(&self, lead: &Lead, ctx: &TransformContext) -> Result<Alignment, TransformError> {
        if ctx.sales_spec.trim().is_empty() {
            return Err(TransformError::MissingContext("sales_spec"));
        }
        Ok(Self::evaluate(lead, &ctx.sales_spec))
    }
}
