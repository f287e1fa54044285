use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dewarp_bridge::{run_cycle, InMemoryModel};

mod config;

#[derive(Parser, Debug)]
#[command(name = "dewarp-bridge")]
#[command(about = "Import detected baselines and text blocks into a dewarping model")]
#[command(version)]
pub struct Args {
    /// Path to the baseline detection results (baselines.json)
    #[arg(long, env = "DEWARP_BASELINES")]
    pub baselines: PathBuf,

    /// Path to the text block detection results (textblocks.json)
    #[arg(long, env = "DEWARP_TEXTBLOCKS")]
    pub textblocks: PathBuf,

    /// Prior model state to reconcile against (JSON written by --output)
    #[arg(long, env = "DEWARP_STATE")]
    pub state: Option<PathBuf>,

    /// Where to write the reconciled model state
    #[arg(long, env = "DEWARP_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Where to write the cycle report as JSON (stdout gets a summary either way)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting dewarp-bridge v{}", env!("CARGO_PKG_VERSION"));

    let mut model = match &config.state_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read model state {}", path.display()))?;
            let model: InMemoryModel = serde_json::from_str(&text)
                .with_context(|| format!("model state {} is not valid JSON", path.display()))?;
            tracing::info!(
                baselines = model.baseline_count(),
                blocks = model.block_count(),
                "loaded prior model state"
            );
            model
        }
        None => InMemoryModel::new(),
    };

    let report = run_cycle(&mut model, &config.baselines_path, &config.textblocks_path)?;

    println!(
        "Imported {} baselines and {} text blocks in {}ms",
        report.baselines_populated, report.blocks_populated, report.total_time_ms
    );
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for excluded in &report.excluded {
        println!("excluded: {excluded}");
    }

    if let Some(path) = &config.output_path {
        let text = serde_json::to_string_pretty(&model)?;
        fs::write(path, text)
            .with_context(|| format!("cannot write model state {}", path.display()))?;
        tracing::info!("wrote reconciled model state to {}", path.display());
    }

    if let Some(path) = &config.report_path {
        let text = serde_json::to_string_pretty(&report)?;
        fs::write(path, text)
            .with_context(|| format!("cannot write report {}", path.display()))?;
    }

    Ok(())
}
