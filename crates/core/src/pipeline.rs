use crate::category::{self, UNSUPPORTED};
use crate::classifier::{AnalysisClient, RetryPolicy};
use crate::config::AppConfig;
use crate::{organizer, scanner};
use anyhow::Context;
use providers::gemini::{GeminiConfig, GeminiProvider};
use providers::noop::NoopProvider;
use providers::{AudioAnalysisService, ProviderRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{ResultRow, ResultStore};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineSummary {
    pub discovered: usize,
    pub classified: usize,
    pub failed: usize,
    pub organized: usize,
    pub unsupported: usize,
    pub persist_failures: usize,
    pub output_path: PathBuf,
    pub category_dir: PathBuf,
}

/// Builds the service from config and runs the pipeline over `directory`.
pub async fn run_configured(
    config: &AppConfig,
    directory: &Path,
) -> anyhow::Result<PipelineSummary> {
    if !directory.is_dir() {
        anyhow::bail!(scanner::ScanError::NotADirectory(directory.to_path_buf()));
    }
    let registry = build_registry(config)?;
    let service = registry.service(None).with_context(|| {
        format!(
            "no analysis service available (provider {:?}); pass --api-key or set {}",
            config.service.provider,
            crate::config::API_KEY_ENV
        )
    })?;
    run(config, directory, service).await
}

/// Processes every discovered file in order, saving the result table after
/// each one. Only a missing input directory or an unusable output location
/// aborts the run; everything else is recorded per file.
pub async fn run(
    config: &AppConfig,
    directory: &Path,
    service: Arc<dyn AudioAnalysisService>,
) -> anyhow::Result<PipelineSummary> {
    let directory = absolute(directory).context("resolve input directory")?;
    let output_path =
        absolute(Path::new(&config.output.results_path)).context("resolve output path")?;
    let category_dir =
        absolute(Path::new(&config.output.category_dir)).context("resolve category directory")?;

    let discovery = scanner::discover(&directory, &config.scan, &[category_dir.clone()])?;

    std::fs::create_dir_all(&category_dir)
        .with_context(|| format!("create category directory {}", category_dir.display()))?;
    info!("classified files will be copied to {}", category_dir.display());

    let client = AnalysisClient::new(service, RetryPolicy::from(&config.retry));
    let mut store = ResultStore::new(&output_path);
    let mut summary = PipelineSummary {
        discovered: discovery.supported.len(),
        unsupported: discovery.unsupported.len(),
        output_path,
        category_dir,
        ..Default::default()
    };

    let total = discovery.supported.len();
    for (i, path) in discovery.supported.iter().enumerate() {
        info!("analysing {} ({}/{})", path.display(), i + 1, total);
        let row = process_file(&client, path, &summary.category_dir).await;
        if row.failure_reason.is_empty() {
            summary.classified += 1;
        } else {
            summary.failed += 1;
        }
        if !row.organized_path.is_empty() {
            summary.organized += 1;
        }
        store.append(row);
        save(&mut store, &mut summary);
        info!("progress saved ({}/{})", i + 1, total);
    }

    if !discovery.unsupported.is_empty() {
        for file in discovery.unsupported {
            store.append(ResultRow {
                file_path: file.path.to_string_lossy().into_owned(),
                category: UNSUPPORTED.to_string(),
                failure_reason: file.reason,
                ..Default::default()
            });
        }
        save(&mut store, &mut summary);
    }

    info!(
        "finished: {} classified, {} failed, {} organized; results in {}",
        summary.classified,
        summary.failed,
        summary.organized,
        summary.output_path.display()
    );
    Ok(summary)
}

/// analyse, pick the category, then copy only if the analysis succeeded
/// with at least one tag.
pub async fn process_file(client: &AnalysisClient, path: &Path, category_root: &Path) -> ResultRow {
    let result = client.analyze(path).await.result;
    let category = category::primary(&result.tags);

    let mut organized_path = String::new();
    if result.is_success() && !result.tags.is_empty() {
        match organizer::organize(path, &category, category_root) {
            Ok(organized) => {
                organized_path = organized.destination.to_string_lossy().into_owned();
            }
            Err(e) => error!("failed to organize {}: {}", path.display(), e),
        }
    }

    ResultRow {
        file_path: path.to_string_lossy().into_owned(),
        organized_path,
        tags: result.tags_text(),
        category,
        content: result.content,
        scenario: result.scenario,
        failure_reason: result.failure_reason.unwrap_or_default(),
    }
}

fn save(store: &mut ResultStore, summary: &mut PipelineSummary) {
    if let Err(e) = store.flush() {
        summary.persist_failures += 1;
        warn!(
            "failed to save results to {}: {} (will retry after the next file)",
            store.path().display(),
            e
        );
    }
}

pub fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut reg = ProviderRegistry::new().with_service("noop", Arc::new(NoopProvider));

    if let Some(key) = config.service.resolve_api_key() {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: key,
            base_url: config.service.base_url.clone(),
            model: config.service.model.clone(),
            proxy: config.service.proxy.clone(),
        })
        .context("configure gemini provider")?;
        if let Some(proxy) = &config.service.proxy {
            info!("using proxy {}", proxy);
        }
        info!("using model {}", provider.model());
        reg = reg.with_service("gemini", Arc::new(provider));
    }

    Ok(reg.set_preferred(&config.service.provider))
}

pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_without_key_only_has_noop() {
        let mut cfg = AppConfig::default();
        cfg.service.api_key = None;
        cfg.service.provider = "noop".to_string();
        let reg = build_registry(&cfg).unwrap();
        assert!(reg.service(None).is_ok());
        assert!(reg.service(Some("noop")).is_ok());
    }

    #[test]
    fn registry_with_key_has_gemini() {
        let mut cfg = AppConfig::default();
        cfg.service.api_key = Some("k".to_string());
        let reg = build_registry(&cfg).unwrap();
        assert_eq!(reg.names(), vec!["gemini", "noop"]);
        assert!(reg.service(None).is_ok());
    }

    #[test]
    fn bad_proxy_fails_setup() {
        let mut cfg = AppConfig::default();
        cfg.service.api_key = Some("k".to_string());
        cfg.service.proxy = Some("not a url".to_string());
        assert!(build_registry(&cfg).is_err());
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(absolute(temp.path()).unwrap(), temp.path());
        assert!(absolute(Path::new("rel/out.csv")).unwrap().is_absolute());
    }

    #[tokio::test]
    async fn missing_key_does_not_fall_back_to_noop() {
        if std::env::var(crate::config::API_KEY_ENV).is_ok() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.service.api_key = None;
        let err = run_configured(&cfg, temp.path()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("--api-key"), "{:#}", err);
    }

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let err = run_configured(&AppConfig::default(), &temp.path().join("missing"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("directory not found"));
    }
}
