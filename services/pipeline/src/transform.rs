//! Pluggable per-record transforms
//!
//! Each stage enriches leads through one [`Transform`]. The stage invokes it
//! once per record; a failing record is skipped, never the whole batch.

use crate::error::TransformError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use types::{Alignment, Lead, Scoring};

/// What earlier stages learned about the record being transformed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformContext {
    pub sales_spec: String,
    pub alignment: Option<Alignment>,
    pub scoring: Option<Scoring>,
}

impl TransformContext {
    pub fn new(sales_spec: impl Into<String>) -> Self {
        Self {
            sales_spec: sales_spec.into(),
            ..Self::default()
        }
    }

    pub fn with_alignment(mut self, alignment: Option<Alignment>) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_scoring(mut self, scoring: Option<Scoring>) -> Self {
        self.scoring = scoring;
        self
    }
}

#[async_trait]
pub trait Transform: Send + Sync {
    type Output: Send;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn apply(
        &self,
        lead: &Lead,
        ctx: &TransformContext,
    ) -> Result<Self::Output, TransformError>;

    /// Delay every call by `delay`, e.g. to stand in for a remote model
    fn with_latency(self, delay: Duration) -> WithLatency<Self>
    where
        Self: Sized,
    {
        WithLatency { inner: self, delay }
    }
}

/// Shared handle to a transform producing `O`
pub type SharedTransform<O> = Arc<dyn Transform<Output = O>>;

/// A transform that sleeps before delegating
#[derive(Debug, Clone)]
pub struct WithLatency<T> {
    inner: T,
    delay: Duration,
}

#[async_trait]
impl<T: Transform> Transform for WithLatency<T> {
    type Output = T::Output;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn apply(
        &self,
        lead: &Lead,
        ctx: &TransformContext,
    ) -> Result<Self::Output, TransformError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.apply(lead, ctx).await
    }
}
