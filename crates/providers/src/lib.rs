//! Provider abstractions for the external audio analysis service.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod gemini;
pub mod noop;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("status {status} body {body}")]
    Status { status: u16, body: String },
    #[error("service returned no candidates")]
    EmptyResponse,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
}

/// A service that takes a prompt plus raw audio and answers with free text.
#[async_trait::async_trait]
pub trait AudioAnalysisService: Send + Sync {
    async fn submit(
        &self,
        prompt: &str,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    services: HashMap<String, Arc<dyn AudioAnalysisService>>,
    pub preferred: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: &str, service: Arc<dyn AudioAnalysisService>) -> Self {
        self.services.insert(name.to_string(), service);
        self
    }

    pub fn set_preferred(mut self, name: &str) -> Self {
        self.preferred = Some(name.to_string());
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn service(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn AudioAnalysisService>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no analysis service configured".into())
            })?;
        self.services
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}
