use clap::{Args, Parser, Subcommand};
use sorter_core::config::AppConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audio-sorter")]
#[command(about = "Classify audio files and sort them into category folders", long_about = None)]
pub struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse every audio file under a directory, copy it into its category
    /// folder and record the outcome
    Classify(ClassifyArgs),
    /// List the audio files a classify run would process
    Scan {
        /// Directory to scan
        #[arg(short, long)]
        directory: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Directory containing the audio files
    #[arg(short, long)]
    pub directory: PathBuf,
    /// API key for the analysis service (falls back to GEMINI_API_KEY)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,
    /// Result table path
    #[arg(short, long)]
    pub output: Option<String>,
    /// Retries after a rate-limit error
    #[arg(short = 'r', long)]
    pub max_retries: Option<u32>,
    /// Seconds to wait before each retry
    #[arg(short = 't', long)]
    pub retry_delay: Option<u64>,
    /// Root folder for the category copies
    #[arg(short = 'c', long)]
    pub category_dir: Option<String>,
    /// HTTP/HTTPS proxy, e.g. http://127.0.0.1:7890
    #[arg(short, long)]
    pub proxy: Option<String>,
    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,
    /// Output JSON summary
    #[arg(long)]
    pub json: bool,
}

impl ClassifyArgs {
    /// Flags win over config file and environment values.
    pub fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(key) = &self.api_key {
            cfg.service.api_key = Some(key.clone());
        }
        if let Some(output) = &self.output {
            cfg.output.results_path = output.clone();
        }
        if let Some(n) = self.max_retries {
            cfg.retry.max_retries = n;
        }
        if let Some(secs) = self.retry_delay {
            cfg.retry.retry_delay_secs = secs;
        }
        if let Some(dir) = &self.category_dir {
            cfg.output.category_dir = dir.clone();
        }
        if let Some(proxy) = &self.proxy {
            cfg.service.proxy = Some(proxy.clone());
        }
        if let Some(model) = &self.model {
            cfg.service.model = model.clone();
        }
    }
}
