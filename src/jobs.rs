use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

use crate::error::ShellError;
use crate::job_control::{self, pid_t};

/// Small positive job number, unique for the lifetime of the shell.
pub type JobId = usize;

/// A single tracked background or stopped child.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub pid: pid_t,
    /// The command line as the user typed it.
    pub display: String,
    pub stopped: bool,
    pub started_at: Instant,
}

impl JobEntry {
    fn new(pid: pid_t, display: String, stopped: bool) -> Self {
        Self {
            pid,
            display,
            stopped,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// The shell's job table.
///
/// Every public operation reaps finished children first, so callers never
/// observe a job whose process has already exited. Entries are kept ordered by
/// id; ids come from a high-water mark and are never handed out twice.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<JobId, JobEntry>,
    last_id: JobId,
    /// Set in a forked pipeline stage, whose jobs belong to the parent shell.
    inherited: bool,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this table as a forked child's copy. Its jobs are not our
    /// children, so `waitpid` cannot see them and reaping is skipped.
    pub fn mark_inherited(&mut self) {
        self.inherited = true;
    }

    /// Non-blocking status check of every job; exited children are removed.
    ///
    /// A failed check is reported and the entry is kept, unless the kernel
    /// says the pid is no longer our child at all (ECHILD).
    pub fn reap(&mut self) {
        if self.inherited {
            return;
        }

        self.jobs.retain(|id, job| match job_control::try_reap(job.pid) {
            Ok(true) => {
                tracing::debug!(job = *id, pid = job.pid, "reaped finished job");
                false
            }
            Ok(false) => true,
            Err(err) => {
                let gone = err.raw_os_error() == Some(libc::ECHILD);
                ShellError::syscall("waitpid")(err).report();
                !gone
            }
        });
    }

    /// Track a new child. Returns the id it was given.
    pub fn add(&mut self, pid: pid_t, display: impl Into<String>, stopped: bool) -> JobId {
        self.reap();

        let id = self.last_id + 1;
        let entry = JobEntry::new(pid, display.into(), stopped);
        tracing::debug!(job = id, pid, stopped, command = %entry.display, "job added");

        self.jobs.insert(id, entry);
        self.last_id = id;
        id
    }

    /// Print one `[id] display : pid N secs` line per job, ascending by id.
    pub fn list(&mut self, out: &mut dyn Write) {
        self.reap();

        for (id, job) in &self.jobs {
            let stopped = if job.stopped { " (stopped)" } else { "" };
            let _ = writeln!(
                out,
                "[{id}] {} : {} {} secs{stopped}",
                job.display,
                job.pid,
                job.elapsed_secs()
            );
        }
    }

    /// SIGKILL every job and block until each one is collected. Used on the
    /// way out of the shell so no children are left behind.
    pub fn kill_all(&mut self, out: &mut dyn Write) {
        self.reap();

        let _ = writeln!(out, "smash: sending SIGKILL signal to {} jobs:", self.jobs.len());
        for job in std::mem::take(&mut self.jobs).into_values() {
            let _ = writeln!(out, "{} {}", job.pid, job.display);
            let _ = out.flush();

            if let Err(err) = job_control::send_signal(job.pid, libc::SIGKILL) {
                ShellError::syscall("kill")(err).report();
            }
            if let Err(err) = job_control::wait_for_exit(job.pid) {
                ShellError::syscall("waitpid")(err).report();
            }
        }
    }

    pub fn get(&mut self, id: JobId) -> Option<&JobEntry> {
        self.reap();
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut JobEntry> {
        self.reap();
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<JobEntry> {
        self.reap();
        self.jobs.remove(&id)
    }

    /// The highest-id job, whatever its state.
    pub fn get_last(&mut self) -> Option<(JobId, &JobEntry)> {
        self.reap();
        self.jobs.iter().next_back().map(|(id, job)| (*id, job))
    }

    /// The highest-id job that is currently stopped.
    pub fn get_last_stopped(&mut self) -> Option<(JobId, &JobEntry)> {
        self.reap();
        self.jobs
            .iter()
            .rev()
            .find(|(_, job)| job.stopped)
            .map(|(id, job)| (*id, job))
    }

    #[cfg(test)]
    pub fn len(&mut self) -> usize {
        self.reap();
        self.jobs.len()
    }
}
