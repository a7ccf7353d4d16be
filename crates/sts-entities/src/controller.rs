//! Supervised controller processes
//!
//! A [`ControllerProcess`] owns one externally spawned controller binary.
//! Its lifecycle is `STOPPED -> start -> RUNNING -> kill -> STOPPED`.
//! Starting a running controller is an error; killing a stopped one is
//! logged and ignored. A process reaped by
//! [`ProcessRegistry::kill_active_procs`] counts as stopped.

use std::sync::Arc;

use sts_core::{ControllerConfig, ProcessError, StsResult};
use sts_logging::EntityContextGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::procutils::spawn_filtered;
use crate::registry::{ProcessRegistry, SupervisedChild};

/// The running state of one controller
pub struct ControllerProcess {
    config: ControllerConfig,
    registry: ProcessRegistry,
    process: Option<Arc<SupervisedChild>>,
}

impl std::fmt::Debug for ControllerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerProcess")
            .field("uuid", &self.uuid())
            .field("label", &self.label())
            .field("pid", &self.pid())
            .finish()
    }
}

impl ControllerProcess {
    pub fn new(config: ControllerConfig, registry: ProcessRegistry) -> Self {
        Self {
            config,
            registry,
            process: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn uuid(&self) -> Uuid {
        self.config.uuid
    }

    pub fn label(&self) -> String {
        self.config.label()
    }

    /// Our process, unless it was stopped or reaped through the registry
    fn live(&self) -> Option<&Arc<SupervisedChild>> {
        self.process
            .as_ref()
            .filter(|child| self.registry.contains(child.key()))
    }

    pub fn alive(&self) -> bool {
        self.live().is_some()
    }

    /// Pid of the running process; `None` when stopped
    pub fn pid(&self) -> Option<u32> {
        self.live().and_then(|p| p.pid())
    }

    /// Whether the process is gone, either stopped by us or exited on its own
    pub fn has_exited(&self) -> bool {
        self.live().is_none_or(|p| p.has_exited())
    }

    /// Spawn the controller and register it for signal cleanup
    pub async fn start(&mut self) -> StsResult<()> {
        let label = self.label();
        if self.alive() {
            return Err(ProcessError::AlreadyRunning(label).into());
        }
        self.process = None;

        let _ctx = EntityContextGuard::controller(&label);
        let argv = self.config.expanded_cmdline()?;
        info!(controller = %label, uuid = %self.uuid(), cmdline = ?argv, "Starting controller");

        let child = spawn_filtered(&label, &argv, self.config.cwd.as_deref())?;
        let child = Arc::new(SupervisedChild::new(label, child));
        self.registry.register(child.clone());
        self.process = Some(child);
        Ok(())
    }

    /// Terminate the controller and unregister it
    ///
    /// Tolerates a process that already exited.
    pub async fn kill(&mut self) {
        let label = self.label();
        let registry = &self.registry;
        let Some(child) = self
            .process
            .take()
            .filter(|child| registry.contains(child.key()))
        else {
            let _ctx = EntityContextGuard::controller(&label);
            warn!(controller = %label, "Controller already stopped");
            return;
        };

        info!(controller = %label, uuid = %self.uuid(), pid = ?child.pid(), "Killing controller");
        let status = child.terminate().await;
        self.registry.unregister(child.key());
        info!(controller = %label, ?status, "Controller stopped");
    }

    /// Kill (if running), then start
    pub async fn restart(&mut self) -> StsResult<()> {
        self.kill().await;
        self.start().await
    }
}

impl Drop for ControllerProcess {
    fn drop(&mut self) {
        let Some(child) = self.process.take() else {
            return;
        };
        if !child.has_exited() {
            warn!(controller = %child.label(), pid = ?child.pid(), "Dropping running controller; killing it");
            child.start_kill();
        }
        self.registry.unregister(child.key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sts_core::StsError;
    use tokio_test::{assert_err, assert_ok};

    fn sleeper(registry: &ProcessRegistry) -> ControllerProcess {
        ControllerProcess::new(
            ControllerConfig::new("sleep 30").with_label("sleeper"),
            registry.clone(),
        )
    }

    #[tokio::test]
    async fn test_start_and_kill() {
        let registry = ProcessRegistry::new();
        let mut controller = sleeper(&registry);
        assert!(!controller.alive());
        assert!(controller.pid().is_none());
        assert!(controller.has_exited());

        assert_ok!(controller.start().await);
        assert!(controller.alive());
        let pid = controller.pid().unwrap();
        assert_eq!(registry.pids(), vec![pid]);
        assert!(!controller.has_exited());

        controller.kill().await;
        assert!(!controller.alive());
        assert!(controller.pid().is_none());
        assert!(registry.is_empty());

        // Second kill is a no-op
        controller.kill().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_start_twice_is_an_error() {
        let registry = ProcessRegistry::new();
        let mut controller = sleeper(&registry);
        assert_ok!(controller.start().await);
        let pid = controller.pid();

        let err = assert_err!(controller.start().await);
        assert!(matches!(
            err,
            StsError::Process(ProcessError::AlreadyRunning(ref label)) if label == "sleeper"
        ));
        assert_eq!(controller.pid(), pid);
        assert_eq!(registry.len(), 1);

        controller.kill().await;
    }

    #[tokio::test]
    async fn test_restart_replaces_process() {
        let registry = ProcessRegistry::new();
        let mut controller = sleeper(&registry);

        // Restart from stopped simply starts
        assert_ok!(controller.restart().await);
        let first = controller.pid().unwrap();

        assert_ok!(controller.restart().await);
        let second = controller.pid().unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.pids(), vec![second]);

        controller.kill().await;
    }

    #[tokio::test]
    async fn test_bulk_kill_leaves_controller_stopped() {
        let registry = ProcessRegistry::new();
        let mut controller = sleeper(&registry);
        assert_ok!(controller.start().await);
        let first = controller.pid().unwrap();

        assert_eq!(registry.kill_active_procs().await, 1);
        assert!(!controller.alive());
        assert!(controller.pid().is_none());
        assert!(controller.has_exited());
        assert!(registry.is_empty());

        // Killing again only warns
        controller.kill().await;
        assert!(registry.is_empty());

        assert_ok!(controller.start().await);
        assert!(controller.alive());
        let second = controller.pid().unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.pids(), vec![second]);

        controller.kill().await;
        assert!(!controller.alive());
    }

    #[tokio::test]
    async fn test_empty_cmdline_fails_to_start() {
        let registry = ProcessRegistry::new();
        let mut controller = ControllerProcess::new(ControllerConfig::new("   "), registry.clone());

        assert_err!(controller.start().await);
        assert!(!controller.alive());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let registry = ProcessRegistry::new();
        {
            let mut controller = sleeper(&registry);
            assert_ok!(controller.start().await);
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_label_defaults_to_uuid() {
        let config = ControllerConfig::new("sleep 30");
        let uuid = config.uuid;
        let controller = ControllerProcess::new(config, ProcessRegistry::new());
        assert_eq!(controller.label(), format!("c{}", uuid));
        assert_eq!(controller.uuid(), uuid);
    }
}
