//! Sends one audio file to the analysis service, retrying rate-limited calls.

use crate::config::RetryConfig;
use crate::models::ClassificationResult;
use crate::response;
use providers::AudioAnalysisService;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const PROMPT: &str = "\
Analyse this audio file and provide the following information:
1. Content: a detailed description of the sounds in the audio
2. Scenario: the situations where this sound effect could be used
3. Tags: 1-5 tags for categorising this sound effect, separated by commas

Reply using exactly this layout:
Content: <description>
Scenario: <scenario description>
Tags: <tag1>, <tag2>, ...";

/// Declared when the extension does not map to an audio type.
pub const FALLBACK_MIME: &str = "audio/mpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            retry_delay: Duration::from_secs(cfg.retry_delay_secs),
        }
    }
}

/// Result of [`AnalysisClient::analyze`] plus how it was reached.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: ClassificationResult,
    pub attempts: u32,
    pub waits: u32,
}

pub struct AnalysisClient {
    service: Arc<dyn AudioAnalysisService>,
    policy: RetryPolicy,
}

impl AnalysisClient {
    pub fn new(service: Arc<dyn AudioAnalysisService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Never fails: errors end up in `result.failure_reason`.
    pub async fn analyze(&self, path: &Path) -> Analysis {
        let mime = mime_for(path);
        let mut attempts = 0u32;
        let mut waits = 0u32;
        loop {
            attempts += 1;
            debug!(path = %path.display(), attempt = attempts, "analysing");

            // Re-read on every attempt; the request is rebuilt from scratch.
            let audio = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let reason = format!("failed to read {}: {}", path.display(), e);
                    error!("{}", reason);
                    return Analysis {
                        result: ClassificationResult::failed(reason),
                        attempts,
                        waits,
                    };
                }
            };

            let err = match self.service.submit(PROMPT, &audio, &mime).await {
                Ok(text) => {
                    return Analysis {
                        result: ClassificationResult::from_reply(response::parse(&text)),
                        attempts,
                        waits,
                    };
                }
                Err(e) => e.to_string(),
            };
            error!("analysis of {} failed: {}", path.display(), err);

            if is_rate_limited(&err) {
                if waits < self.policy.max_retries {
                    waits += 1;
                    info!(
                        "rate limited, waiting {}s before retry ({}/{})",
                        self.policy.retry_delay.as_secs(),
                        waits,
                        self.policy.max_retries
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    continue;
                }
                warn!(
                    "giving up on {} after {} retries",
                    path.display(),
                    self.policy.max_retries
                );
            }

            return Analysis {
                result: ClassificationResult::failed(err),
                attempts,
                waits,
            };
        }
    }
}

/// Substring heuristic over the error text. It also matches unrelated errors
/// that happen to contain these words (e.g. "generate", "unlimited").
pub fn is_rate_limited(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    ["quota", "limit", "rate"].iter().any(|k| lower.contains(k))
}

pub fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .iter()
        .find(|m| m.type_().as_str() == "audio")
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
