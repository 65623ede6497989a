use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "AUDIO_SORTER";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub retry: RetryConfig,
    pub scan: ScanConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Registry name of the analysis service, `gemini` or `noop`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub proxy: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: providers::gemini::DEFAULT_MODEL.to_string(),
            base_url: providers::gemini::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            proxy: None,
        }
    }
}

impl ServiceConfig {
    /// Explicit key first, then the `GEMINI_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 60,
            retry_delay_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extensions sent to the service, without the dot.
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "wav", "m4a", "flac", "aac", "ogg"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            exclude: Vec::new(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_path: String,
    pub category_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: "audio_classification_results.csv".to_string(),
            category_dir: "classified_audio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("audio_sorter.log".to_string()),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
