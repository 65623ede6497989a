use anyhow::Result;
use clap::Parser;
use cli::args::{Cli, ClassifyArgs, Commands};
use cli::{logging, report};
use sorter_core::config::{self, AppConfig};
use sorter_core::{pipeline, scanner};
use std::path::Path;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;
    if let Commands::Classify(args) = &cli.command {
        args.apply_to(&mut cfg);
    }
    let _guard = logging::init(&cfg.logging)?;

    let outcome = match cli.command {
        Commands::Classify(args) => run_classify(cfg, args).await,
        Commands::Scan { directory, json } => run_scan(&cfg, &directory, json),
    };
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}

async fn run_classify(cfg: AppConfig, args: ClassifyArgs) -> Result<()> {
    let summary = pipeline::run_configured(&cfg, &args.directory).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report::summary_json(&summary))?);
    } else {
        println!("{}", report::summary_text(&summary));
    }
    Ok(())
}

fn run_scan(cfg: &AppConfig, directory: &Path, json: bool) -> Result<()> {
    let directory = pipeline::absolute(directory)?;
    let category_dir = pipeline::absolute(Path::new(&cfg.output.category_dir))?;
    let discovery = scanner::discover(&directory, &cfg.scan, &[category_dir])?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report::scan_json(&discovery))?);
    } else {
        println!("{}", report::scan_text(&discovery));
    }
    Ok(())
}
