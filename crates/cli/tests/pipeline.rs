use providers::{AudioAnalysisService, ProviderError};
use sorter_core::config::AppConfig;
use sorter_core::pipeline;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Answers by file content so each test file gets a known reply.
struct ByContentService {
    replies: HashMap<Vec<u8>, Result<String, String>>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl AudioAnalysisService for ByContentService {
    async fn submit(
        &self,
        _prompt: &str,
        audio: &[u8],
        _mime_type: &str,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(audio) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(ProviderError::RequestFailed(e.clone())),
            None => Err(ProviderError::RequestFailed("unexpected audio".into())),
        }
    }
}

fn service() -> Arc<ByContentService> {
    let mut replies = HashMap::new();
    replies.insert(
        b"walk".to_vec(),
        Ok("Content: footsteps on wood\nScenario: games, film\nTags: footstep, walking".to_string()),
    );
    replies.insert(
        b"hum".to_vec(),
        Ok("Content: electrical hum\nScenario: lab scenes".to_string()),
    );
    replies.insert(
        b"rain".to_vec(),
        Ok("Content: rain on a roof\nScenario: storms\nTags: rain".to_string()),
    );
    replies.insert(b"bad".to_vec(), Err("invalid argument".to_string()));
    Arc::new(ByContentService {
        replies,
        calls: AtomicUsize::new(0),
    })
}

fn config_for(root: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.output.results_path = root.join("out").join("results.csv").to_string_lossy().into_owned();
    cfg.output.category_dir = root.join("sorted").to_string_lossy().into_owned();
    cfg.retry.max_retries = 0;
    cfg.retry.retry_delay_secs = 0;
    cfg
}

#[tokio::test]
async fn classifies_organizes_and_records_every_file() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a_walk.wav"), "walk").unwrap();
    fs::write(src.join("b_bad.mp3"), "bad").unwrap();
    fs::write(src.join("sub").join("c_hum.ogg"), "hum").unwrap();
    fs::write(src.join("d_song.mid"), "midi").unwrap();
    fs::write(src.join("readme.txt"), "not audio").unwrap();

    let cfg = config_for(temp.path());
    let svc = service();
    let summary = pipeline::run(&cfg, &src, svc.clone()).await.unwrap();

    assert_eq!(svc.calls.load(Ordering::SeqCst), 3);
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.organized, 1);
    assert_eq!(summary.unsupported, 1);
    assert_eq!(summary.persist_failures, 0);

    let organized = temp.path().join("sorted").join("footstep").join("a_walk.wav");
    assert_eq!(fs::read_to_string(&organized).unwrap(), "walk");
    assert!(src.join("a_walk.wav").exists());

    let rows = storage::read_table(&summary.output_path).unwrap();
    let files: Vec<_> = rows
        .iter()
        .map(|r| Path::new(&r.file_path).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["a_walk.wav", "b_bad.mp3", "c_hum.ogg", "d_song.mid"]);

    let walk = &rows[0];
    assert_eq!(walk.category, "footstep");
    assert_eq!(walk.failure_reason, "");
    assert_eq!(walk.tags, "footstep, walking");
    assert_eq!(walk.content, "footsteps on wood");
    assert_eq!(walk.scenario, "games, film");
    assert_eq!(Path::new(&walk.organized_path), organized);

    let bad = &rows[1];
    assert_eq!(bad.failure_reason, "request failed: invalid argument");
    assert_eq!(bad.category, "unclassified");
    assert_eq!(bad.organized_path, "");

    // Success without tags is recorded but not organized.
    let hum = &rows[2];
    assert_eq!(hum.failure_reason, "");
    assert_eq!(hum.category, "unclassified");
    assert_eq!(hum.organized_path, "");
    assert!(!temp.path().join("sorted").join("unclassified").exists());

    let midi = &rows[3];
    assert_eq!(midi.category, "unsupported");
    assert_eq!(midi.failure_reason, "unsupported audio format");
}

#[tokio::test]
async fn rerun_never_overwrites_earlier_copies() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("step.wav"), "walk").unwrap();
    let cfg = config_for(temp.path());

    pipeline::run(&cfg, &src, service()).await.unwrap();
    let summary = pipeline::run(&cfg, &src, service()).await.unwrap();

    let dir = temp.path().join("sorted").join("footstep");
    assert!(dir.join("step.wav").exists());
    assert!(dir.join("step_1.wav").exists());

    // The second run replaces the table rather than appending to it.
    let rows = storage::read_table(&summary.output_path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(Path::new(&rows[0].organized_path), dir.join("step_1.wav"));
}

#[tokio::test]
async fn category_folder_inside_input_is_not_rescanned() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("step.wav"), "walk").unwrap();
    let mut cfg = config_for(temp.path());
    cfg.output.category_dir = src.join("sorted").to_string_lossy().into_owned();

    pipeline::run(&cfg, &src, service()).await.unwrap();
    let svc = service();
    let summary = pipeline::run(&cfg, &src, svc.clone()).await.unwrap();
    assert_eq!(summary.discovered, 1);
    assert_eq!(svc.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unwritable_output_does_not_stop_the_run() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.wav"), "walk").unwrap();
    fs::write(src.join("b.wav"), "hum").unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "a file where a directory should be").unwrap();

    let mut cfg = config_for(temp.path());
    cfg.output.results_path = blocker.join("results.csv").to_string_lossy().into_owned();
    let svc = service();
    let summary = pipeline::run(&cfg, &src, svc.clone()).await.unwrap();

    assert_eq!(svc.calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.persist_failures, 2);
    assert_eq!(summary.organized, 1);
}

#[tokio::test]
async fn empty_directory_writes_nothing() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    let cfg = config_for(temp.path());

    let summary = pipeline::run(&cfg, &src, service()).await.unwrap();
    assert_eq!(summary.discovered, 0);
    assert!(!summary.output_path.exists());
    assert!(summary.category_dir.is_dir());
}

#[tokio::test]
async fn failed_copy_is_recorded_and_run_continues() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a_walk.wav"), "walk").unwrap();
    fs::write(src.join("b_rain.wav"), "rain").unwrap();
    let sorted = temp.path().join("sorted");
    fs::create_dir_all(&sorted).unwrap();
    fs::write(sorted.join("footstep"), "a file where the category folder should be").unwrap();

    let cfg = config_for(temp.path());
    let svc = service();
    let summary = pipeline::run(&cfg, &src, svc.clone()).await.unwrap();

    assert_eq!(svc.calls.load(Ordering::SeqCst), 2);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.organized, 1);

    let rows = storage::read_table(&summary.output_path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].category, "footstep");
    assert_eq!(rows[0].failure_reason, "");
    assert_eq!(rows[0].organized_path, "");
    assert_eq!(Path::new(&rows[1].organized_path), sorted.join("rain").join("b_rain.wav"));
    assert_eq!(fs::read_to_string(sorted.join("rain").join("b_rain.wav")).unwrap(), "rain");
}

#[tokio::test]
async fn category_folder_equal_to_input_still_scans() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("sounds");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("step.wav"), "walk").unwrap();
    let mut cfg = config_for(temp.path());
    cfg.output.category_dir = src.to_string_lossy().into_owned();

    let svc = service();
    let summary = pipeline::run(&cfg, &src, svc.clone()).await.unwrap();
    assert_eq!(summary.discovered, 1);
    assert_eq!(svc.calls.load(Ordering::SeqCst), 1);
    assert!(src.join("footstep").join("step.wav").exists());
}
