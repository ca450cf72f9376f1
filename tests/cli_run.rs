// tests/cli_run.rs

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use shelfjobs::cli::CliArgs;
use shelfjobs::run;
use shelfjobs_test_utils::{init_tracing, with_timeout};

fn args(config: &NamedTempFile) -> CliArgs {
    CliArgs {
        config: config.path().to_string_lossy().into_owned(),
        job: None,
        stop_if_running: false,
        log_level: None,
        dry_run: false,
    }
}

fn config_for(root: &std::path::Path) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[policy]
wait_timeout_secs = 5

[job.inbox]
kind = "scan"
root = "{root}"
patterns = ["**/*.epub"]
wait_for_finish = true

[job.drafts]
kind = "remove"
root = "{root}"
patterns = ["**/*.tmp"]
"#,
        root = root.display()
    )
    .unwrap();
    file
}

#[tokio::test]
async fn runs_configured_jobs_until_idle() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("earthsea.epub"), b"epub").unwrap();
    fs::write(dir.path().join("draft.tmp"), b"tmp").unwrap();
    let config = config_for(dir.path());

    with_timeout(run(args(&config))).await.unwrap();

    assert!(dir.path().join("earthsea.epub").exists());
    assert!(!dir.path().join("draft.tmp").exists());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("draft.tmp"), b"tmp").unwrap();
    let config = config_for(dir.path());

    let mut args = args(&config);
    args.dry_run = true;
    with_timeout(run(args)).await.unwrap();

    assert!(dir.path().join("draft.tmp").exists());
}

#[tokio::test]
async fn single_job_selection() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("draft.tmp"), b"tmp").unwrap();
    let config = config_for(dir.path());

    let mut only_scan = args(&config);
    only_scan.job = Some("inbox".to_string());
    with_timeout(run(only_scan)).await.unwrap();
    assert!(dir.path().join("draft.tmp").exists());

    let mut unknown = args(&config);
    unknown.job = Some("nope".to_string());
    assert!(run(unknown).await.is_err());
}
