//! Registry of live controller processes
//!
//! One [`ProcessRegistry`] is created when the harness starts and handed to
//! every [`ControllerProcess`](crate::ControllerProcess). Starting a
//! controller registers its process and killing it unregisters it; both are
//! idempotent. On SIGINT/SIGTERM the harness calls
//! [`kill_active_procs`](ProcessRegistry::kill_active_procs) once, which reaps
//! every controller still registered.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// A spawned process under supervision
pub struct SupervisedChild {
    key: u64,
    label: String,
    pid: Option<u32>,
    child: Mutex<Child>,
}

impl fmt::Debug for SupervisedChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisedChild")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("pid", &self.pid)
            .finish()
    }
}

impl SupervisedChild {
    pub fn new(label: impl Into<String>, child: Child) -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    /// Registry key, unique within this process
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// OS process id at spawn time
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the process and reap it
    ///
    /// A process that already exited is just reaped. Errors are logged, not
    /// returned; `None` means the exit status could not be collected.
    pub async fn terminate(&self) -> Option<ExitStatus> {
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(e) => warn!(controller = %self.label, error = %e, "Failed to poll process"),
        }

        if let Err(e) = child.start_kill() {
            debug!(controller = %self.label, error = %e, "Kill signal not delivered");
        }
        match child.wait().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(controller = %self.label, error = %e, "Failed to reap process");
                None
            }
        }
    }

    /// Whether the process is known to have exited
    ///
    /// Returns `false` while another task is terminating it.
    pub fn has_exited(&self) -> bool {
        match self.child.try_lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(Some(_))),
            Err(_) => false,
        }
    }

    /// Send the kill signal without waiting; for use where awaiting is impossible
    pub fn start_kill(&self) {
        if let Ok(mut child) = self.child.try_lock() {
            if let Err(e) = child.start_kill() {
                debug!(controller = %self.label, error = %e, "Kill signal not delivered");
            }
        }
    }
}

/// Concurrent set of live supervised processes
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    procs: Arc<DashMap<u64, Arc<SupervisedChild>>>,
}

impl fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("live", &self.procs.len())
            .finish()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a process; returns `false` if it was already tracked
    pub fn register(&self, child: Arc<SupervisedChild>) -> bool {
        let key = child.key();
        let fresh = self.procs.insert(key, child).is_none();
        debug!(key, fresh, "Registered process");
        fresh
    }

    /// Stop tracking a process; unknown keys are ignored
    pub fn unregister(&self, key: u64) -> Option<Arc<SupervisedChild>> {
        self.procs.remove(&key).map(|(_, child)| child)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.procs.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    /// Pids of every tracked process
    pub fn pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.procs.iter().filter_map(|e| e.value().pid()).collect();
        pids.sort_unstable();
        pids
    }

    /// Kill every tracked process and forget it
    ///
    /// The single entry point for signal-driven shutdown. Processes are
    /// terminated concurrently; returns how many were reaped.
    pub async fn kill_active_procs(&self) -> usize {
        let live: Vec<Arc<SupervisedChild>> =
            self.procs.iter().map(|e| e.value().clone()).collect();
        if live.is_empty() {
            return 0;
        }
        info!(count = live.len(), "Killing active controller processes");

        let mut tasks = JoinSet::new();
        for child in live {
            let registry = self.clone();
            tasks.spawn(async move {
                let status = child.terminate().await;
                registry.unregister(child.key());
                debug!(controller = %child.label(), ?status, "Process reaped");
            });
        }

        let mut reaped = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(()) => reaped += 1,
                Err(e) => warn!(error = %e, "Process reaper task failed"),
            }
        }
        reaped
    }
}
