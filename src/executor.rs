use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::process::Command;

use crate::error::ShellError;
use crate::foreground::ForegroundSlot;
use crate::job_control::{self, WaitOutcome, pid_t};
use crate::jobs::JobTable;

/// An external program run in its own process group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    /// The command line as typed, `&` included; shown by `jobs`.
    display: String,
    background: bool,
}

impl ExternalCommand {
    /// `argv` has the background marker already removed. Returns `None` for an
    /// empty argument vector.
    pub fn new(argv: Vec<String>, display: &str, background: bool) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
            display: display.to_string(),
            background,
        })
    }

    /// Spawn the program. A background child goes straight into the job
    /// table; a foreground child is waited on and only tracked if it stops.
    ///
    /// Returns the exit code (0 = success, 127 = not found, 128+N = killed by signal N).
    pub fn execute(self, jobs: &mut JobTable, foreground: &ForegroundSlot) -> Result<i32, ShellError> {
        // The child leaves the shell's process group before exec, so terminal
        // signals aimed at the shell do not reach it.
        let child = match Command::new(&self.program)
            .args(&self.args)
            .process_group(0)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                let code = if err.kind() == ErrorKind::NotFound { 127 } else { 126 };
                ShellError::syscall("execvp")(err).report();
                return Ok(code);
            }
        };
        // Waited on by pid below or by the job table; `Child` is not kept.
        let pid = child.id() as pid_t;
        tracing::debug!(pid, program = %self.program, background = self.background, "spawned");

        if self.background {
            jobs.add(pid, self.display, false);
            return Ok(0);
        }

        wait_in_foreground(pid, self.display, jobs, foreground)
    }

    /// Replace the current process with the program. Only returns on failure,
    /// with the exit code the caller should leave with.
    pub fn exec_in_place(self) -> i32 {
        let err = Command::new(&self.program).args(&self.args).exec();
        let code = if err.kind() == ErrorKind::NotFound { 127 } else { 126 };
        ShellError::syscall("execvp")(err).report();
        code
    }
}

/// Block on `pid` with the tracker set, and move it to the job table if it stops.
pub fn wait_in_foreground(
    pid: pid_t,
    display: String,
    jobs: &mut JobTable,
    foreground: &ForegroundSlot,
) -> Result<i32, ShellError> {
    let outcome = {
        let _tracked = foreground.track(pid);
        job_control::wait_for_pid(pid)
    }
    .map_err(ShellError::syscall("waitpid"))?;

    match outcome {
        WaitOutcome::Exited(code) => Ok(code),
        WaitOutcome::Stopped(signal) => {
            tracing::debug!(pid, signal, "foreground child stopped");
            jobs.add(pid, display, true);
            Ok(128 + signal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_argv_is_not_a_command() {
        assert!(ExternalCommand::new(Vec::new(), "", false).is_none());
    }

    #[test]
    fn foreground_returns_exit_status() {
        let mut jobs = JobTable::new();
        let slot = ForegroundSlot::new();
        let command = ExternalCommand::new(argv(&["sh", "-c", "exit 5"]), "sh -c 'exit 5'", false)
            .unwrap();
        assert_eq!(command.execute(&mut jobs, &slot).unwrap(), 5);
        assert_eq!(jobs.len(), 0);
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn missing_program_is_127() {
        let mut jobs = JobTable::new();
        let slot = ForegroundSlot::new();
        let command =
            ExternalCommand::new(argv(&["smash-no-such-program"]), "smash-no-such-program", false)
                .unwrap();
        assert_eq!(command.execute(&mut jobs, &slot).unwrap(), 127);
    }

    #[test]
    fn background_child_is_registered_in_its_own_group() {
        let mut jobs = JobTable::new();
        let slot = ForegroundSlot::new();
        let command =
            ExternalCommand::new(argv(&["sleep", "30"]), "sleep 30&", true).unwrap();
        assert_eq!(command.execute(&mut jobs, &slot).unwrap(), 0);

        let (id, job) = jobs.get_last().map(|(id, job)| (id, job.clone())).unwrap();
        assert_eq!(id, 1);
        assert_eq!(job.display, "sleep 30&");
        assert!(!job.stopped);
        assert_eq!(unsafe { libc::getpgid(job.pid) }, job.pid);

        jobs.kill_all(&mut Vec::new());
    }

    #[test]
    fn stopped_foreground_child_becomes_stopped_job() {
        let mut jobs = JobTable::new();
        let slot = ForegroundSlot::new();
        let child = Command::new("sh")
            .args(["-c", "kill -STOP $$; exit 0"])
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id() as pid_t;

        let status = wait_in_foreground(pid, "stopper".to_string(), &mut jobs, &slot).unwrap();
        assert_eq!(status, 128 + libc::SIGSTOP);
        let (_, job) = jobs.get_last().unwrap();
        assert_eq!(job.pid, pid);
        assert!(job.stopped);

        jobs.kill_all(&mut Vec::new());
    }
}
