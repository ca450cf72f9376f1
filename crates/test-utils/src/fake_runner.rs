use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use shelfjobs::errors::{Result, TaskError};
use shelfjobs::process::{
    ProcessCommand, ProcessFuture, ProcessHandle, ProcessHooks, ProcessOutput, ProcessRunner,
};

/// What one scripted invocation prints and how it ends.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
    /// After printing, block until cancelled or killed.
    pub hang: bool,
}

impl ScriptedRun {
    pub fn ok(stdout: &[&str]) -> Self {
        Self {
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            stderr: vec![stderr.to_string()],
            exit_code,
            ..Self::default()
        }
    }

    pub fn hanging(stdout: &[&str]) -> Self {
        Self {
            hang: true,
            ..Self::ok(stdout)
        }
    }
}

/// A [`ProcessRunner`] that never touches the OS.
///
/// - records every command it is asked to run;
/// - replays queued [`ScriptedRun`]s in order, then the default run;
/// - hands out handles whose `kill` ends a hanging run with exit code -1.
pub struct ScriptedRunner {
    queue: Mutex<VecDeque<ScriptedRun>>,
    default_run: ScriptedRun,
    calls: Mutex<Vec<ProcessCommand>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    pub fn new(default_run: ScriptedRun) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_run,
            calls: Mutex::new(Vec::new()),
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn then(self, run: ScriptedRun) -> Self {
        self.queue.lock().unwrap().push_back(run);
        self
    }

    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `kill` calls made on handles this runner handed out.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    fn next_run(&self) -> ScriptedRun {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_run.clone())
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new(ScriptedRun::ok(&[]))
    }
}

struct FakeHandle {
    exited: AtomicBool,
    killed: Notify,
    kills: Arc<AtomicUsize>,
}

impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    fn kill(&self, _entire_tree: bool) -> Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.killed.notify_one();
        Ok(())
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        command: ProcessCommand,
        hooks: ProcessHooks<'a>,
        cancel: Option<&'a CancellationToken>,
    ) -> ProcessFuture<'a> {
        self.calls.lock().unwrap().push(command.clone());
        let run = self.next_run();

        Box::pin(async move {
            let ProcessHooks {
                mut on_stdout_line,
                mut on_stderr_line,
                on_started,
            } = hooks;

            let handle = Arc::new(FakeHandle {
                exited: AtomicBool::new(false),
                killed: Notify::new(),
                kills: Arc::clone(&self.kills),
            });
            if let Some(started) = on_started {
                started(handle.clone());
            }

            let mut output = ProcessOutput {
                exit_code: run.exit_code,
                ..ProcessOutput::default()
            };
            for line in &run.stdout {
                if let Some(cb) = on_stdout_line.as_mut() {
                    cb(line);
                }
                output.stdout.push_str(line);
                output.stdout.push('\n');
                tokio::task::yield_now().await;
            }
            for line in &run.stderr {
                if let Some(cb) = on_stderr_line.as_mut() {
                    cb(line);
                }
                output.stderr.push_str(line);
                output.stderr.push('\n');
            }

            if run.hang {
                let cancelled = async {
                    match cancel {
                        Some(token) => token.cancelled().await,
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    _ = cancelled => {
                        handle.exited.store(true, Ordering::SeqCst);
                        return Err(TaskError::Cancelled(format!(
                            "process '{}' was cancelled",
                            command.display()
                        )));
                    }
                    _ = handle.killed.notified() => {
                        output.exit_code = -1;
                    }
                }
            }

            handle.exited.store(true, Ordering::SeqCst);
            Ok(output)
        })
    }
}
