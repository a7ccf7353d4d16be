//! Controller supervision for a harness run

use std::time::Duration;

use sts_core::{ControllerConfig, StsResult};
use sts_entities::{ControllerProcess, ProcessRegistry};
use tracing::info;

/// The controllers of one run, all registered in a single registry
pub struct Supervisor {
    registry: ProcessRegistry,
    controllers: Vec<ControllerProcess>,
}

impl Supervisor {
    pub fn new(configs: impl IntoIterator<Item = ControllerConfig>) -> Self {
        let registry = ProcessRegistry::new();
        let controllers = configs
            .into_iter()
            .map(|config| ControllerProcess::new(config, registry.clone()))
            .collect();
        Self {
            registry,
            controllers,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn controllers(&self) -> &[ControllerProcess] {
        &self.controllers
    }

    /// Start controllers in configuration order, stopping at the first failure
    pub async fn start_all(&mut self) -> StsResult<()> {
        for controller in &mut self.controllers {
            controller.start().await?;
        }
        info!(count = self.registry.len(), "Controllers started");
        Ok(())
    }

    /// Reap every registered process; each controller then reads as stopped
    pub async fn shutdown(&mut self) -> usize {
        let reaped = self.registry.kill_active_procs().await;
        info!(reaped, "Controllers shut down");
        reaped
    }
}

/// Resolves on SIGINT or SIGTERM, or when `limit` elapses
///
/// Returns the name of whatever ended the wait.
pub async fn shutdown_signal(limit: Option<Duration>) -> std::io::Result<&'static str> {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
            _ = deadline => Ok("deadline"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "ctrl-c"),
            _ = deadline => Ok("deadline"),
        }
    }
}
