use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ngscan_ocr::{ScanPipeline, TextPassthrough};

mod cli;
mod output;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let settings = cli::resolve_settings(&args)?;
    let sources = cli::build_sources(&args.sources, std::io::stdin().lock())?;

    tracing::info!(
        "Scanning {} source(s), scope={}, strict={}",
        sources.len(),
        settings.scope,
        settings.strict
    );

    let pipeline =
        ScanPipeline::new(settings.policy, settings.strictness()).with_pass(TextPassthrough);
    let report = pipeline.process_batch(sources, settings.scope).await;

    output::log_summary(&report);
    output::write_report(&report, args.format, &mut std::io::stdout().lock())?;
    Ok(())
}
