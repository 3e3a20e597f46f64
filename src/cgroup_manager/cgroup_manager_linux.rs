use std::{
    process::{Child, ExitStatus},
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use anyhow::{self, Context};
use cgroups_rs::Cgroup;
use tracing::{error, warn};

use super::{create_process, kill_process_group, wait_with_deadline};

const RELEASE_DURATION: Duration = Duration::from_millis(100);

pub fn get_current_user_id() -> anyhow::Result<String> {
    let output = std::process::Command::new("id")
        .arg("-u")
        .output()
        .context("Could not launch 'id -u'")?;
    let stdout = output.stdout;
    let untrimed_id = std::str::from_utf8(&stdout).context("id is not a valid string")?;
    Ok(untrimed_id.trim().to_string())
}

pub fn get_cgroup_path(user_id: &str, group_name: &str) -> String {
    format!("user.slice/user-{user_id}.slice/user@{user_id}.service/{group_name}")
}

/// Create a cgroup at `path`.
///
/// * `max_memory` - Maximum available memory in Bytes. Non-positive means no restriction.
/// * `max_pids` - Maximum number of PIDS inside the cgroup at any time. Non-positive means no restriction.
/// * `cpus` - which cpus the members can run one. Uses comma separated cpu ranges ("1-5,7", "1,3,4", ...). Empty string means no restriction.
pub fn create_cgroup(
    path: &str,
    max_memory: i64,
    max_pids: i64,
    cpus: &str,
) -> anyhow::Result<Cgroup> {
    let mut builder = cgroups_rs::cgroup_builder::CgroupBuilder::new(path);
    if max_memory > 0 {
        builder = builder.memory().memory_hard_limit(max_memory).done();
    }
    if max_pids > 0 {
        builder = builder
            .pid()
            .maximum_number_of_processes(cgroups_rs::MaxValue::Value(max_pids))
            .done();
    }
    if !cpus.is_empty() {
        builder = builder.cpu().cpus(cpus.to_string()).done();
    }
    builder
        .build(cgroups_rs::hierarchies::auto())
        .context("could not create cgroup")
}

/// Waits until no task is left in `cgroup`.
fn wait_for_process_cleanup(cgroup: &Cgroup, max_duration: Duration) -> bool {
    let deadline = Instant::now() + max_duration;
    while !cgroup.tasks().is_empty() {
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(std::cmp::min(Duration::from_millis(10), max_duration / 10));
    }
    true
}

fn create_process_in_cgroup(command: &str, args: &[String], group: &Cgroup) -> anyhow::Result<Child> {
    let mut child = create_process(command, args)?;

    let pid = child.id() as u64;
    let addition = group.add_task_by_tgid(cgroups_rs::CgroupPid { pid });
    if addition.is_err() {
        let kill = child.kill();

        addition.with_context(|| {
            if let Err(err) = kill {
                format!(
                    "could not add process to cgroup, and process could not be killed either ({err})"
                )
            } else {
                "could not add process to cgroup".to_string()
            }
        })?;
    }
    Ok(child)
}

/// A solver process, optionally confined to its own cgroup.
///
/// The process (and its cgroup) is killed on drop unless it was released after exiting.
#[derive(Debug)]
pub struct LimitedProcess {
    pub child: Child,
    cgroup: Option<Cgroup>,
    cleaned_up: bool,
}

impl LimitedProcess {
    /// Spawns `command` inside a fresh cgroup limited to `max_memory` bytes, `max_pids`
    /// processes and the `cpus` list.
    pub fn launch(
        command: &str,
        args: &[String],
        max_memory: i64,
        max_pids: i64,
        cpus: &str,
    ) -> anyhow::Result<LimitedProcess> {
        static COUNTER: AtomicU32 = AtomicU32::new(1);
        let user_id = get_current_user_id().context("could not get user id")?;
        // one cgroup per solver process
        let group_name = format!(
            "ROYALE_SOLVER_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let path = get_cgroup_path(&user_id, &group_name);
        let group = create_cgroup(&path, max_memory, max_pids, cpus)
            .context("could not create cgroup")?;
        let child = create_process_in_cgroup(command, args, &group).with_context(|| {
            let _ = group.delete();
            "could not create process in cgroup"
        })?;

        Ok(LimitedProcess {
            child,
            cgroup: Some(group),
            cleaned_up: false,
        })
    }

    pub fn launch_without_container(command: &str, args: &[String]) -> anyhow::Result<LimitedProcess> {
        let child = create_process(command, args).context("could not create process")?;

        Ok(LimitedProcess {
            child,
            cgroup: None,
            cleaned_up: false,
        })
    }

    /// Waits for the process to exit. `Ok(None)` when `max_duration` elapsed first.
    pub fn wait_timeout(&mut self, max_duration: Duration) -> anyhow::Result<Option<ExitStatus>> {
        wait_with_deadline(&mut self.child, max_duration)
    }

    /// Kills the process (the whole cgroup when contained).
    pub fn try_kill(&mut self, max_duration: Duration) -> anyhow::Result<()> {
        match &self.cgroup {
            Some(cgroup) => {
                cgroup.kill().context("could not kill process")?;
                if !wait_for_process_cleanup(cgroup, max_duration) {
                    anyhow::bail!("process cleanup timed out");
                }
                // reap the zombie
                let _ = self.child.wait();
                self.cleaned_up = true;
                if let Err(e) = cgroup.delete() {
                    warn!("Failed to remove cgroup. If this happens a lot, it may slow down the computer. {e}");
                }
                Ok(())
            }
            None => {
                kill_process_group(&self.child);
                self.child.kill().context("could not kill process")?;
                let _ = self.child.wait();
                self.cleaned_up = true;
                Ok(())
            }
        }
    }

    /// Marks an exited process as done. Anything it left running (its cgroup, or its
    /// process group when uncontained) is killed and the cgroup removed.
    pub fn release(&mut self) {
        self.cleaned_up = true;
        match self.cgroup.take() {
            Some(cgroup) => {
                if !cgroup.tasks().is_empty() {
                    if let Err(e) = cgroup.kill() {
                        warn!("could not kill leftover solver tasks: {e}");
                    } else if !wait_for_process_cleanup(&cgroup, RELEASE_DURATION) {
                        warn!("leftover solver tasks still alive after kill");
                    }
                }
                if let Err(e) = cgroup.delete() {
                    warn!("Failed to remove cgroup: {e}");
                }
            }
            None => kill_process_group(&self.child),
        }
    }
}

impl Drop for LimitedProcess {
    fn drop(&mut self) {
        static CLEANUP_DURATION: Duration = Duration::from_millis(100);
        if !self.cleaned_up {
            if let Err(e) = self.try_kill(CLEANUP_DURATION) {
                error!("could not kill solver process on drop: {e:#}");
            }
        }
    }
}
