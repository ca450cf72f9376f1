// src/process/supervisor.rs

//! Run an external command, streaming its output line by line.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskError};
use crate::process::handle::{ChildHandle, ProcessHandle};

pub type LineCallback<'a> = Box<dyn FnMut(&str) + Send + 'a>;
pub type StartedCallback<'a> = Box<dyn FnOnce(Arc<dyn ProcessHandle>) + Send + 'a>;
pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>>;

/// Program, arguments and working directory of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Shell-ish rendering for logs.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Optional callbacks invoked while the process runs.
#[derive(Default)]
pub struct ProcessHooks<'a> {
    pub on_stdout_line: Option<LineCallback<'a>>,
    pub on_stderr_line: Option<LineCallback<'a>>,
    pub on_started: Option<StartedCallback<'a>>,
}

impl<'a> ProcessHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_stdout_line(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_stdout_line = Some(Box::new(f));
        self
    }

    pub fn on_stderr_line(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_stderr_line = Some(Box::new(f));
        self
    }

    pub fn on_started(mut self, f: impl FnOnce(Arc<dyn ProcessHandle>) + Send + 'a) -> Self {
        self.on_started = Some(Box::new(f));
        self
    }
}

/// Exit code plus the full captured output.
///
/// `exit_code` is `-1` when the process was terminated by a signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into a [`TaskError::Process`].
    pub fn ensure_success(self, what: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let detail = self.stderr.lines().last().unwrap_or("").trim().to_string();
        Err(TaskError::Process(format!(
            "{what} exited with code {}{}",
            self.exit_code,
            if detail.is_empty() {
                String::new()
            } else {
                format!(": {detail}")
            }
        )))
    }
}

/// How concrete tasks launch processes.
///
/// Production code uses [`ProcessSupervisor`]; tests can provide a scripted
/// runner that never touches the OS.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: ProcessCommand,
        hooks: ProcessHooks<'a>,
        cancel: Option<&'a CancellationToken>,
    ) -> ProcessFuture<'a>;
}

/// Real [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSupervisor;

impl ProcessRunner for ProcessSupervisor {
    fn run<'a>(
        &'a self,
        command: ProcessCommand,
        hooks: ProcessHooks<'a>,
        cancel: Option<&'a CancellationToken>,
    ) -> ProcessFuture<'a> {
        Box::pin(run_process(command, hooks, cancel))
    }
}

/// Spawn `command` and supervise it until it exits.
///
/// - stdout and stderr lines are passed to the hooks as they arrive and also
///   accumulated into the returned [`ProcessOutput`];
/// - `on_started` receives a handle that can kill the process (tree) while
///   this future is still awaiting it;
/// - if `cancel` fires, the process tree is killed and the call fails with
///   [`TaskError::Cancelled`].
///
/// The child is spawned with `kill_on_drop`, so dropping this future also
/// disposes of the process.
pub async fn run_process(
    command: ProcessCommand,
    hooks: ProcessHooks<'_>,
    cancel: Option<&CancellationToken>,
) -> Result<ProcessOutput> {
    let ProcessHooks {
        mut on_stdout_line,
        mut on_stderr_line,
        on_started,
    } = hooks;

    let rendered = command.display();
    info!(cmd = %rendered, "starting process");

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(ref dir) = command.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        // Lead a fresh process group so a tree kill reaches grandchildren.
        cmd.process_group(0);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process '{}'", command.program))?;

    let handle = Arc::new(ChildHandle::new(child.id()));
    if let Some(started) = on_started {
        started(handle.clone());
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TaskError::Process("child stdout was not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| TaskError::Process("child stderr was not piped".to_string()))?;
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();

    let mut output = ProcessOutput::default();
    let mut out_open = true;
    let mut err_open = true;
    let mut exit_code: Option<i32> = None;

    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(cancelled);

    loop {
        if exit_code.is_some() && !out_open && !err_open {
            break;
        }

        tokio::select! {
            line = out_lines.next_line(), if out_open => match line {
                Ok(Some(line)) => {
                    debug!(cmd = %command.program, "stdout: {}", line);
                    if let Some(cb) = on_stdout_line.as_mut() {
                        cb(&line);
                    }
                    output.stdout.push_str(&line);
                    output.stdout.push('\n');
                }
                Ok(None) => out_open = false,
                Err(e) => {
                    warn!(
                        cmd = %command.program,
                        error = %e,
                        "error reading stdout; closing stream"
                    );
                    out_open = false;
                }
            },

            line = err_lines.next_line(), if err_open => match line {
                Ok(Some(line)) => {
                    debug!(cmd = %command.program, "stderr: {}", line);
                    if let Some(cb) = on_stderr_line.as_mut() {
                        cb(&line);
                    }
                    output.stderr.push_str(&line);
                    output.stderr.push('\n');
                }
                Ok(None) => err_open = false,
                Err(e) => {
                    warn!(
                        cmd = %command.program,
                        error = %e,
                        "error reading stderr; closing stream"
                    );
                    err_open = false;
                }
            },

            status = child.wait(), if exit_code.is_none() => {
                let status = status
                    .with_context(|| format!("waiting for process '{}'", command.program))?;
                handle.mark_exited();
                let code = status.code().unwrap_or(-1);
                info!(
                    cmd = %command.program,
                    exit_code = code,
                    success = status.success(),
                    "process exited"
                );
                exit_code = Some(code);
            },

            _ = handle.kill_requested(), if exit_code.is_none() => {
                info!(
                    cmd = %command.program,
                    pid = ?handle.id(),
                    "kill requested; killing process"
                );
                if let Err(e) = child.start_kill() {
                    warn!(cmd = %command.program, error = %e, "failed to kill child process");
                }
            },

            _ = &mut cancelled => {
                info!(cmd = %command.program, "cancellation requested; killing process tree");
                if let Err(e) = handle.kill(true) {
                    warn!(
                        cmd = %command.program,
                        error = %e,
                        "failed to kill process group on cancellation"
                    );
                }
                if let Err(e) = child.kill().await {
                    warn!(
                        cmd = %command.program,
                        error = %e,
                        "failed to kill child process on cancellation"
                    );
                }
                handle.mark_exited();
                return Err(TaskError::Cancelled(format!("process '{}' was cancelled", rendered)));
            },
        }
    }

    output.exit_code = exit_code.unwrap_or(-1);
    Ok(output)
}
