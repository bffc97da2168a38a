//! Lead pipeline launcher
//!
//! Usage:
//!   leadgen --company TechCorp --spec "B2B SaaS companies in fintech"
//!   leadgen --config config/leadgen.toml --bounty 250 --detailed
//!   leadgen --print-config > leadgen.toml

use anyhow::{Context, Result};
use bridge::AwaitOutcome;
use clap::Parser;
use config::PipelineConfig;
use leadgen::{render_summaries, Deployment};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "leadgen")]
#[command(about = "Submit a sales spec to the lead pipeline and print the ranked leads")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Buyer company name
    #[arg(long, default_value = "TechCorp")]
    company: String,

    /// What kind of leads the buyer wants
    #[arg(long, default_value = "B2B SaaS companies in fintech with 50-200 employees")]
    spec: String,

    /// Bounty offered for the leads
    #[arg(long, default_value_t = 100.0)]
    bounty: f64,

    /// Seconds to wait for the summaries (config default when unset)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Include the detailed summary and contact details
    #[arg(long)]
    detailed: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(&config.logging.level, config.logging.json)?;
    info!(
        company = %args.company,
        bounty = args.bounty,
        threshold = config.pipeline.alignment_threshold,
        "Starting lead pipeline"
    );

    let deployment = Deployment::start(&config).await?;
    let timeout = args.timeout_secs.map(Duration::from_secs);

    let outcome = deployment
        .request(&args.company, &args.spec, args.bounty, timeout)
        .await;

    match outcome {
        Ok(AwaitOutcome::Ready(reply)) => {
            info!(count = reply.summaries.len(), "Summaries received");
            print!("{}", render_summaries(&reply.summaries, args.detailed));
        }
        Ok(AwaitOutcome::TimedOut) => {
            let waited = timeout.unwrap_or_else(|| config.bridge.default_timeout());
            warn!(timeout_secs = waited.as_secs(), "No summaries before the timeout");
            eprintln!(
                "No summaries arrived within {}s. The pipeline may have found no matching leads.",
                waited.as_secs()
            );
        }
        Err(e) => {
            error!(error = %e, "Request failed");
            deployment.shutdown().await;
            return Err(e);
        }
    }

    deployment.shutdown().await;
    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
