use std::{
    process::{Child, ExitStatus},
    time::Duration,
};

use anyhow::{self, bail, Context};
use tracing::error;

use super::{create_process, kill_process_group, wait_with_deadline};

#[derive(Debug)]
pub struct LimitedProcess {
    pub child: Child,
    cleaned_up: bool,
}

impl LimitedProcess {
    pub fn launch(
        _command: &str,
        _args: &[String],
        _max_memory: i64,
        _max_pids: i64,
        _cpus: &str,
    ) -> anyhow::Result<LimitedProcess> {
        bail!("cgroups only available on linux")
    }

    pub fn launch_without_container(command: &str, args: &[String]) -> anyhow::Result<LimitedProcess> {
        let child = create_process(command, args).context("could not create process")?;

        Ok(LimitedProcess {
            child,
            cleaned_up: false,
        })
    }

    pub fn wait_timeout(&mut self, max_duration: Duration) -> anyhow::Result<Option<ExitStatus>> {
        wait_with_deadline(&mut self.child, max_duration)
    }

    pub fn try_kill(&mut self, _max_duration: Duration) -> anyhow::Result<()> {
        kill_process_group(&self.child);
        self.child.kill().context("could not kill process")?;
        let _ = self.child.wait();
        self.cleaned_up = true;
        Ok(())
    }

    pub fn release(&mut self) {
        self.cleaned_up = true;
        kill_process_group(&self.child);
    }
}

impl Drop for LimitedProcess {
    fn drop(&mut self) {
        static CLEANUP_DURATION: Duration = Duration::from_secs(1);
        if !self.cleaned_up {
            if let Err(e) = self.try_kill(CLEANUP_DURATION) {
                error!("could not kill solver process on drop: {e:#}");
            }
        }
    }
}
