// src/process/handle.rs

//! Handles onto running child processes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::errors::{Result, TaskError};

/// Control surface of a live child process, handed out through the
/// supervisor's `on_started` hook.
pub trait ProcessHandle: Send + Sync {
    /// OS process id, if the process is (or was) running.
    fn id(&self) -> Option<u32>;

    fn has_exited(&self) -> bool;

    /// Kill the process. With `entire_tree` the whole process group it leads
    /// is killed, which takes out anything it spawned.
    fn kill(&self, entire_tree: bool) -> Result<()>;
}

/// Handle for a child spawned by [`run_process`](super::run_process).
///
/// `kill` signals the process group directly (unix) and asks the supervising
/// future to kill the direct child, which also covers platforms without
/// process groups.
#[derive(Debug)]
pub struct ChildHandle {
    pid: Option<u32>,
    exited: AtomicBool,
    kill_requested: Notify,
}

impl ChildHandle {
    pub(crate) fn new(pid: Option<u32>) -> Self {
        Self {
            pid,
            exited: AtomicBool::new(false),
            kill_requested: Notify::new(),
        }
    }

    pub(crate) fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn kill_requested(&self) {
        self.kill_requested.notified().await
    }
}

impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    fn kill(&self, entire_tree: bool) -> Result<()> {
        if self.has_exited() {
            debug!(pid = ?self.pid, "kill requested for exited process; nothing to do");
            return Ok(());
        }

        // notify_one stores a permit, so the request is not lost if the
        // supervisor is between polls.
        self.kill_requested.notify_one();

        if entire_tree {
            if let Some(pid) = self.pid {
                kill_process_group(pid)?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> Result<()> {
    let pgid = i32::try_from(pid)
        .map_err(|_| TaskError::Process(format!("pid {pid} out of range for a process group")))?;

    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group led by the child.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // Group already gone.
        return Ok(());
    }
    Err(TaskError::Process(format!(
        "killing process group {pgid}: {err}"
    )))
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> Result<()> {
    // Without process groups the supervisor's direct kill is all we have.
    Ok(())
}

/// Slot holding the (at most one) process attached to a running task.
///
/// Process-backed tasks attach the handle from `on_started`, detach it when
/// the process returns, and tree-kill it from `TaskUnit::kill`.
#[derive(Default)]
pub struct ProcessSlot {
    current: Mutex<Option<Arc<dyn ProcessHandle>>>,
}

impl ProcessSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: Arc<dyn ProcessHandle>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.as_ref() {
            if !previous.has_exited() {
                error!(
                    pid = ?previous.id(),
                    "attaching a new process while the previous one is still running"
                );
            }
        }
        *current = Some(handle);
    }

    pub fn detach(&self) {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn is_attached(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Tree-kill the attached process, if any. Kill errors are logged and
    /// swallowed.
    pub fn kill_attached(&self, key: &str) {
        let handle = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match handle {
            Some(handle) if !handle.has_exited() => {
                info!(key, pid = ?handle.id(), "killing attached process tree");
                if let Err(e) = handle.kill(true) {
                    error!(key, pid = ?handle.id(), error = %e, "failed to kill attached process");
                }
            }
            Some(_) => debug!(key, "attached process already exited"),
            None => debug!(key, "no process attached; nothing to kill"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHandle {
        kills: AtomicUsize,
        exited: AtomicBool,
        fail: bool,
    }

    impl ProcessHandle for CountingHandle {
        fn id(&self) -> Option<u32> {
            Some(4242)
        }

        fn has_exited(&self) -> bool {
            self.exited.load(Ordering::SeqCst)
        }

        fn kill(&self, entire_tree: bool) -> Result<()> {
            assert!(entire_tree);
            self.kills.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TaskError::Process("permission denied".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn kill_attached_tree_kills_live_process() {
        let slot = ProcessSlot::new();
        let handle = Arc::new(CountingHandle::default());
        slot.attach(handle.clone());

        slot.kill_attached("Cloud.Sync");
        assert_eq!(handle.kills.load(Ordering::SeqCst), 1);

        handle.exited.store(true, Ordering::SeqCst);
        slot.kill_attached("Cloud.Sync");
        assert_eq!(handle.kills.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn kill_errors_are_swallowed() {
        let slot = ProcessSlot::new();
        let handle = Arc::new(CountingHandle {
            fail: true,
            ..Default::default()
        });
        slot.attach(handle.clone());
        slot.kill_attached("Cloud.Sync");
        assert_eq!(handle.kills.load(Ordering::SeqCst), 1);

        slot.detach();
        assert!(!slot.is_attached());
        slot.kill_attached("Cloud.Sync");
    }

    #[test]
    fn exited_child_handle_ignores_kill() {
        let handle = ChildHandle::new(None);
        handle.mark_exited();
        assert!(handle.has_exited());
        assert!(handle.kill(true).is_ok());
    }
}
