//! # Lead Pipeline
//!
//! Four stage actors turn a buyer's sales spec into ranked, summarized leads:
//!
//! 1. [`IntakeStage`] loads raw leads from a [`LeadSource`]
//! 2. [`FilterStage`] keeps leads whose alignment clears the threshold
//! 3. [`ScorerStage`] scores and ranks what is left
//! 4. [`SummarizerStage`] writes summaries and answers the requester
//!
//! Each stage enriches records through a pluggable [`Transform`], so the
//! keyword/weighted/template defaults can be swapped for remote models
//! without touching the actors.

pub mod alignment;
pub mod error;
pub mod scoring;
pub mod source;
pub mod stages;
pub mod summary;
pub mod transform;

pub use alignment::KeywordAlignment;
pub use error::TransformError;
pub use scoring::WeightedScoring;
pub use source::{builtin_leads, JsonFileLeadSource, LeadSource, StaticLeadSource};
pub use stages::{
    FilterStage, IntakeStage, ScorerStage, Stage, SummarizerStage, IN_FLIGHT_KEY, SUMMARIES_KEY,
};
pub use summary::TemplateSummarizer;
pub use transform::{SharedTransform, Transform, TransformContext, WithLatency};
