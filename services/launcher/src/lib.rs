//! # Leadgen
//!
//! Runs all five actors of the lead pipeline in one process and exposes the
//! correlation bridge to callers.
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! let config = config::load_config(None)?;
//! let deployment = leadgen::Deployment::start(&config).await?;
//! let outcome = deployment
//!     .request("TechCorp", "B2B SaaS companies in fintech", 100.0, None)
//!     .await?;
//! if let Some(reply) = outcome.into_reply() {
//!     print!("{}", leadgen::render_summaries(&reply.summaries, false));
//! }
//! deployment.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod deployment;
pub mod report;

pub use deployment::{bridge_options, lead_source, Deployment};
pub use report::render_summaries;
