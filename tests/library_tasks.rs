// tests/library_tasks.rs

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use shelfjobs::errors::TaskError;
use shelfjobs::progress::ProgressStore;
use shelfjobs::task::{run_task_unit, JobContext, TaskDescriptor, TaskExit, TaskUnit};
use shelfjobs::tasks::remove::RemoveParams;
use shelfjobs::tasks::scan::ScanParams;
use shelfjobs::tasks::{RemoveTask, ScanHandler, ScanTask, ScannedFile, TaskServices};
use shelfjobs_test_utils::{init_tracing, with_timeout};
use tokio_util::sync::CancellationToken;

/// Records scanned files; refuses files whose name contains "bad".
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<ScannedFile>>,
}

impl ScanHandler for RecordingHandler {
    fn on_file(&self, file: &ScannedFile) -> anyhow::Result<()> {
        if file.relative.contains("bad") {
            anyhow::bail!("metadata lookup failed for {}", file.relative);
        }
        self.seen.lock().unwrap().push(file.clone());
        Ok(())
    }
}

fn library(root: &Path) {
    fs::create_dir_all(root.join("le-guin")).unwrap();
    fs::write(root.join("le-guin/earthsea.epub"), b"earthsea").unwrap();
    fs::write(root.join("le-guin/bad-dispossessed.epub"), b"dispossessed").unwrap();
    fs::write(root.join("dune.pdf"), b"dune").unwrap();
    fs::write(root.join("notes.txt"), b"notes").unwrap();
    fs::write(root.join("draft.tmp.pdf"), b"draft").unwrap();
}

fn context_for(descriptor: &TaskDescriptor, cancel: CancellationToken) -> JobContext {
    JobContext::new(descriptor.key().to_string(), descriptor.data().clone(), cancel)
}

#[tokio::test]
async fn scan_fingerprints_matching_files_and_skips_failures() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let handler = Arc::new(RecordingHandler::default());
    let services = TaskServices::new("rclone").with_scan_handler(handler.clone());
    let params = ScanParams {
        root: dir.path().to_path_buf(),
        patterns: vec!["**/*.epub".into(), "**/*.pdf".into()],
        exclude: vec!["**/*.tmp.pdf".into()],
    };
    let descriptor = ScanTask::descriptor(&params).unwrap();
    assert_eq!(descriptor.key().to_string(), "Library.Scan");
    assert!(descriptor.disallow_concurrent());

    let task = ScanTask::from_job_data(descriptor.data(), &services).unwrap();
    let progress = ProgressStore::new();
    let ctx = context_for(&descriptor, CancellationToken::new());

    let exit = with_timeout(run_task_unit(&task, &ctx, &progress)).await.unwrap();
    assert_eq!(exit, TaskExit::Clean);

    let seen = handler.seen.lock().unwrap();
    let names: Vec<_> = seen.iter().map(|f| f.relative.as_str()).collect();
    assert_eq!(names, vec!["dune.pdf", "le-guin/earthsea.epub"]);
    assert_eq!(seen[0].size, 4);
    assert_eq!(seen[0].hash, blake3::hash(b"dune").to_hex().to_string());
}

#[tokio::test]
async fn scan_stops_at_interrupt_and_keeps_progress() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let services = TaskServices::new("rclone");
    let params = ScanParams {
        root: dir.path().to_path_buf(),
        patterns: vec!["**/*".into()],
        exclude: vec![],
    };
    let descriptor = ScanTask::descriptor(&params).unwrap();
    let task = ScanTask::from_job_data(descriptor.data(), &services).unwrap();
    let progress = ProgressStore::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = context_for(&descriptor, cancel);

    let exit = run_task_unit(&task, &ctx, &progress).await.unwrap();

    assert_eq!(exit, TaskExit::Cancelled);
    assert_eq!(progress.get_progress("Library.Scan"), Some(0));
    assert!(progress.get_message("Library.Scan").is_some());
}

#[tokio::test]
async fn scan_of_missing_root_is_an_unexpected_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let params = ScanParams {
        root: dir.path().join("missing"),
        patterns: vec!["**/*".into()],
        exclude: vec![],
    };
    let descriptor = ScanTask::descriptor(&params).unwrap();
    let task = ScanTask::from_job_data(descriptor.data(), &TaskServices::new("rclone")).unwrap();
    let progress = ProgressStore::new();
    let ctx = context_for(&descriptor, CancellationToken::new());

    assert_eq!(
        run_task_unit(&task, &ctx, &progress).await.unwrap(),
        TaskExit::Errored
    );
}

#[tokio::test]
async fn remove_deletes_matching_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let params = RemoveParams {
        name: "drafts".to_string(),
        root: dir.path().to_path_buf(),
        patterns: vec!["**/*.tmp.pdf".into(), "**/*.txt".into()],
        dry_run: false,
    };
    let descriptor = RemoveTask::descriptor(&params).unwrap();
    assert_eq!(descriptor.key().to_string(), "Library.Remove-drafts");

    let task = RemoveTask::from_job_data(descriptor.data()).unwrap();
    let progress = ProgressStore::new();
    let ctx = context_for(&descriptor, CancellationToken::new());

    let exit = run_task_unit(&task, &ctx, &progress).await.unwrap();

    assert_eq!(exit, TaskExit::Clean);
    assert!(!dir.path().join("draft.tmp.pdf").exists());
    assert!(!dir.path().join("notes.txt").exists());
    assert!(dir.path().join("dune.pdf").exists());
    assert!(dir.path().join("le-guin/earthsea.epub").exists());
    assert!(progress.is_empty());
}

#[tokio::test]
async fn remove_dry_run_keeps_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());

    let params = RemoveParams {
        name: "everything".to_string(),
        root: dir.path().to_path_buf(),
        patterns: vec!["**/*".into()],
        dry_run: true,
    };
    let descriptor = RemoveTask::descriptor(&params).unwrap();
    let task = RemoveTask::from_job_data(descriptor.data()).unwrap();
    let progress = ProgressStore::new();
    let ctx = context_for(&descriptor, CancellationToken::new());

    assert_eq!(
        run_task_unit(&task, &ctx, &progress).await.unwrap(),
        TaskExit::Clean
    );
    assert!(dir.path().join("dune.pdf").exists());
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn remove_task_is_not_killable() {
    let params = RemoveParams {
        name: "x".to_string(),
        root: "/tmp".into(),
        patterns: vec!["*".into()],
        dry_run: true,
    };
    let task = RemoveTask::new(params);
    assert!(matches!(task.kill(), Err(TaskError::NotKillable(_))));
}

#[test]
fn job_data_missing_fields_are_argument_errors() {
    let descriptor = TaskDescriptor::builder("Library", "Scan", "library.scan")
        .data("root", "/books")
        .build()
        .unwrap();
    assert!(matches!(
        ScanTask::from_job_data(descriptor.data(), &TaskServices::new("rclone")),
        Err(TaskError::Argument(_))
    ));
}
