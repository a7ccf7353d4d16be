//! Spawning controller processes with filtered output
//!
//! A controller's stdout and stderr are read line by line and re-emitted as
//! tracing events under the `sts::controller_output` target, tagged with the
//! controller's label, so they interleave with the harness's own logs.

use std::path::Path;
use std::process::Stdio;

use sts_core::{ConfigError, ProcessError, StsResult};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Target used for forwarded controller output
pub const OUTPUT_TARGET: &str = "sts::controller_output";

/// Spawn `argv` with piped output forwarded to tracing
///
/// Must be called within a tokio runtime. The child is killed if its
/// handle is dropped.
pub fn spawn_filtered(label: &str, argv: &[String], cwd: Option<&Path>) -> StsResult<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ConfigError::EmptyCommandLine(label.to_string()))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        label: label.to_string(),
        source,
    })?;
    debug!(controller = %label, pid = ?child.id(), program = %program, "Spawned process");

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output(label.to_string(), "stdout", stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output(label.to_string(), "stderr", stderr));
    }

    Ok(child)
}

async fn forward_output(label: String, stream: &'static str, output: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(output).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(target: OUTPUT_TARGET, controller = %label, stream, "{}", line);
    }
}
