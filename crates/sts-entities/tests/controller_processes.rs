//! Controller Process Supervision Tests
//!
//! Spawns real processes (`sleep`) as stand-in controllers and checks that
//! the shared registry reaps them all.

use std::time::Duration;

use sts_core::ControllerConfig;
use sts_entities::{ControllerProcess, ProcessRegistry};
use tokio_test::assert_ok;

fn controller(registry: &ProcessRegistry, label: &str) -> ControllerProcess {
    ControllerProcess::new(
        ControllerConfig::new("sleep 30").with_label(label),
        registry.clone(),
    )
}

/// Whether `pid` still names a live process
fn pid_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

#[tokio::test]
async fn test_bulk_kill_reaps_every_controller() {
    sts_logging::init_testing();

    let registry = ProcessRegistry::new();
    let mut c0 = controller(&registry, "c0");
    let mut c1 = controller(&registry, "c1");

    assert_ok!(c0.start().await);
    assert_ok!(c1.start().await);
    assert_eq!(registry.len(), 2);
    let pids = registry.pids();

    assert_eq!(registry.kill_active_procs().await, 2);
    assert!(registry.is_empty());
    assert!(c0.has_exited());
    assert!(c1.has_exited());
    if cfg!(target_os = "linux") {
        for pid in pids {
            assert!(!pid_alive(pid), "pid {} survived bulk kill", pid);
        }
    }

    // Killing again is a safe no-op
    c0.kill().await;
    c1.kill().await;
    c0.kill().await;
    assert!(!c0.alive());
    assert!(!c1.alive());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_controllers_can_restart_after_bulk_kill() {
    let registry = ProcessRegistry::new();
    let mut c0 = controller(&registry, "c0");
    assert_ok!(c0.start().await);

    registry.kill_active_procs().await;
    assert_ok!(c0.restart().await);
    assert!(c0.alive());
    assert!(!c0.has_exited());
    assert_eq!(registry.len(), 1);

    c0.kill().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_self_exiting_controller() {
    let registry = ProcessRegistry::new();
    let mut quick = ControllerProcess::new(
        ControllerConfig::new("true").with_label("quick"),
        registry.clone(),
    );
    assert_ok!(quick.start().await);

    // Still registered until someone kills or drops it
    let mut waited = Duration::ZERO;
    while !quick.has_exited() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert!(quick.has_exited());
    assert_eq!(registry.len(), 1);

    // Killing an exited process is tolerated
    quick.kill().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_dropping_controllers_empties_registry() {
    let registry = ProcessRegistry::new();
    {
        let mut running = controller(&registry, "running");
        assert_ok!(running.start().await);

        let mut exited = ControllerProcess::new(
            ControllerConfig::new("true").with_label("exited"),
            registry.clone(),
        );
        assert_ok!(exited.start().await);
        assert_eq!(registry.len(), 2);
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_cmdline_placeholders_reach_the_process() {
    let registry = ProcessRegistry::new();
    let config = ControllerConfig::new("echo --listen=__address__:__port__")
        .with_endpoint("127.0.0.1".parse().unwrap(), 6653);
    assert_eq!(
        config.expanded_cmdline().unwrap(),
        vec!["echo", "--listen=127.0.0.1:6653"]
    );

    let mut c = ControllerProcess::new(config, registry.clone());
    assert_ok!(c.start().await);
    c.kill().await;
    assert!(registry.is_empty());
}
