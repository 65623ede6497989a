use crate::{AudioAnalysisService, ProviderError};

/// Stand-in used when no credential is configured; every call fails terminally.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl AudioAnalysisService for NoopProvider {
    async fn submit(
        &self,
        _prompt: &str,
        _audio: &[u8],
        _mime_type: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}
