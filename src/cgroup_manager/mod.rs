#[cfg(target_os = "linux")]
mod cgroup_manager_linux;

#[cfg(target_os = "linux")]
pub use cgroup_manager_linux::*;

#[cfg(not(target_os = "linux"))]
mod cgroup_manager_stub;

#[cfg(not(target_os = "linux"))]
pub use cgroup_manager_stub::*;

use std::{
    process::{Child, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use anyhow::Context;

/// Spawns `command` with stdin, stdout and stderr piped. On unix the child leads its own
/// process group so that whatever it forks can be killed with it.
pub(self) fn create_process(command: &str, args: &[String]) -> anyhow::Result<Child> {
    let mut cmd = std::process::Command::new(command);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd.spawn()
        .with_context(|| format!("command '{command}' not found"))
}

/// Sends SIGKILL to the process group led by `child`, reaching forked leftovers even after
/// the leader exited.
#[cfg(unix)]
pub(self) fn kill_process_group(child: &Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg has no memory effects; a stale group only yields ESRCH
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub(self) fn kill_process_group(_child: &Child) {}

/// Polls `child` until it exits or `max_duration` elapses. `Ok(None)` means still running.
pub(self) fn wait_with_deadline(
    child: &mut Child,
    max_duration: Duration,
) -> anyhow::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + max_duration;
    loop {
        if let Some(status) = child.try_wait().context("could not poll child process")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
