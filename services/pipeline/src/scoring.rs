//! Weighted lead scoring
//!
//! | Factor    | Points                                                  |
//! |-----------|---------------------------------------------------------|
//! | alignment | `alignment * 50` (0.5 when the lead has no alignment)   |
//! | size      | `min(20, employees / 10)`                               |
//! | funding   | Seed 5, Series A 10, Series B 12, Series C 15, else 0   |
//! | growth    | `Nx` → `min(15, 5N)`, `P%` → `min(15, P/10)`, else 5/0  |
//!
//! The total is clamped to [0, 100]; the price is ten per point.

use crate::error::TransformError;
use crate::transform::{Transform, TransformContext};
use async_trait::async_trait;
use types::{Lead, Scoring};

const DEFAULT_ALIGNMENT: f64 = 0.5;
const PRICE_PER_POINT: f64 = 10.0;
const UNPARSABLE_GROWTH_POINTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScoring;

impl WeightedScoring {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(lead: &Lead, ctx: &TransformContext) -> Scoring {
        let alignment = lead
            .alignment
            .as_ref()
            .or(ctx.alignment.as_ref())
            .map(|a| a.score)
            .unwrap_or(DEFAULT_ALIGNMENT);

        let base_points = alignment * 50.0;
        let size_points = (lead.employees as f64 / 10.0).min(20.0);
        let funding_points = funding_points(&lead.funding);
        let growth_points = growth_points(&lead.growth);

        let score = (base_points + size_points + funding_points + growth_points).clamp(0.0, 100.0);

        let factors = vec![
            format!("Alignment with sales spec: {alignment:.2} ({base_points:.1} points)"),
            format!("Company size: {} employees ({size_points:.1} points)", lead.employees),
            format!("Funding stage: {} ({funding_points:.1} points)", lead.funding),
            format!("Growth rate: {} ({growth_points:.1} points)", lead.growth),
        ];

        Scoring {
            score,
            price: score * PRICE_PER_POINT,
            reasoning: factors.join("\n"),
            factors,
        }
    }
}

fn funding_points(funding: &str) -> f64 {
    match funding {
        "Seed" => 5.0,
        "Series A" => 10.0,
        "Series B" => 12.0,
        "Series C" => 15.0,
        _ => 0.0,
    }
}

/// "2x YoY" → 10, "80% YoY" → 8, "fast" → 0, "Nx-ish" → 5
fn growth_points(growth: &str) -> f64 {
    if let Some((multiplier, _)) = growth.split_once('x') {
        return match multiplier.trim().parse::<f64>() {
            Ok(multiplier) => (multiplier * 5.0).min(15.0),
            Err(_) => UNPARSABLE_GROWTH_POINTS,
        };
    }
    if let Some((percentage, _)) = growth.split_once('%') {
        return match percentage.trim().parse::<f64>() {
            Ok(percentage) => (percentage / 10.0).min(15.0),
            Err(_) => UNPARSABLE_GROWTH_POINTS,
        };
    }
    0.0
}

#[async_trait]
impl Transform for WeightedScoring {
    type Output = Scoring;

    fn name(&self) -> &'static str {
        "weighted_scoring"
    }

    async fn apply(&self, lead: &Lead, ctx: &TransformContext) -> Result<Scoring, TransformError> {
        Ok(Self::evaluate(lead, ctx))
    }
}
