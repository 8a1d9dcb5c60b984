use std::io::Write;
use std::path::PathBuf;

use crate::error::ShellError;
use crate::executor::wait_in_foreground;
use crate::foreground::ForegroundSlot;
use crate::job_control;
use crate::jobs::{JobId, JobTable};

/// Highest signal number `kill` accepts.
const MAX_SIGNAL: libc::c_int = 31;

// ── Argument helpers ──

/// A job id argument: decimal digits only, 1 up to `i32::MAX`.
fn parse_job_id(arg: &str) -> Option<JobId> {
    if arg.is_empty() || arg.len() > 10 || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: i64 = arg.parse().ok()?;
    if (1..=i64::from(i32::MAX)).contains(&id) {
        JobId::try_from(id).ok()
    } else {
        None
    }
}

/// A signal argument of the form `-N` with N in 1..=31.
fn parse_signal(arg: &str) -> Option<libc::c_int> {
    let digits = arg.strip_prefix('-')?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let signal: libc::c_int = digits.parse().ok()?;
    (1..=MAX_SIGNAL).contains(&signal).then_some(signal)
}

/// Zero or one job id, shared by `fg` and `bg`.
fn parse_optional_job_id(
    command: &'static str,
    args: &[String],
) -> Result<Option<JobId>, ShellError> {
    match args {
        [] => Ok(None),
        [arg] => parse_job_id(arg)
            .map(Some)
            .ok_or(ShellError::InvalidArguments { command }),
        _ => Err(ShellError::InvalidArguments { command }),
    }
}

// ── Signal-control builtins ──

/// `kill -<signum> <job-id>`: validated when built, sent when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillCommand {
    signal: libc::c_int,
    job_id: JobId,
}

impl KillCommand {
    /// `args` excludes the command name.
    pub fn new(args: &[String], jobs: &mut JobTable) -> Result<Self, ShellError> {
        const NAME: &str = "kill";

        let [signal, job_id] = args else {
            return Err(ShellError::InvalidArguments { command: NAME });
        };
        let (Some(signal), Some(job_id)) = (parse_signal(signal), parse_job_id(job_id)) else {
            return Err(ShellError::InvalidArguments { command: NAME });
        };

        if jobs.get(job_id).is_none() {
            return Err(ShellError::JobNotFound { command: NAME, id: job_id });
        }
        Ok(Self { signal, job_id })
    }

    pub fn execute(self, jobs: &mut JobTable, out: &mut dyn Write) -> Result<i32, ShellError> {
        let job = jobs.get_mut(self.job_id).ok_or(ShellError::JobNotFound {
            command: "kill",
            id: self.job_id,
        })?;

        job_control::send_signal(job.pid, self.signal).map_err(ShellError::syscall("kill"))?;
        tracing::debug!(job = self.job_id, pid = job.pid, signal = self.signal, "signal sent");
        let _ = writeln!(out, "signal number {} was sent to pid {}", self.signal, job.pid);

        match self.signal {
            libc::SIGSTOP | libc::SIGTSTP => job.stopped = true,
            libc::SIGCONT => job.stopped = false,
            _ => {}
        }
        Ok(0)
    }
}

/// `fg [job-id]`: bring a job to the foreground and wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundCommand {
    job_id: Option<JobId>,
}

impl ForegroundCommand {
    pub fn new(args: &[String], jobs: &mut JobTable) -> Result<Self, ShellError> {
        const NAME: &str = "fg";

        let job_id = parse_optional_job_id(NAME, args)?;
        if let Some(id) = job_id {
            if jobs.get(id).is_none() {
                return Err(ShellError::JobNotFound { command: NAME, id });
            }
        }
        Ok(Self { job_id })
    }

    pub fn execute(
        self,
        jobs: &mut JobTable,
        foreground: &ForegroundSlot,
        out: &mut dyn Write,
    ) -> Result<i32, ShellError> {
        const NAME: &str = "fg";

        let id = match self.job_id {
            Some(id) => id,
            None => jobs
                .get_last()
                .map(|(id, _)| id)
                .ok_or(ShellError::EmptyJobList { command: NAME })?,
        };

        // A foreground job must not also sit in the background table.
        let job = jobs
            .remove(id)
            .ok_or(ShellError::JobNotFound { command: NAME, id })?;

        let _ = writeln!(out, "{} : {}", job.display, job.pid);
        let _ = out.flush();

        if let Err(err) = job_control::send_signal(job.pid, libc::SIGCONT) {
            ShellError::syscall("kill")(err).report();
        }

        wait_in_foreground(job.pid, job.display, jobs, foreground)
    }
}

/// `bg [job-id]`: resume a stopped job without waiting for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCommand {
    job_id: Option<JobId>,
}

impl BackgroundCommand {
    pub fn new(args: &[String], jobs: &mut JobTable) -> Result<Self, ShellError> {
        const NAME: &str = "bg";

        let job_id = parse_optional_job_id(NAME, args)?;
        if let Some(id) = job_id {
            match jobs.get(id) {
                None => return Err(ShellError::JobNotFound { command: NAME, id }),
                Some(job) if !job.stopped => {
                    return Err(ShellError::JobAlreadyRunning { command: NAME, id });
                }
                Some(_) => {}
            }
        }
        Ok(Self { job_id })
    }

    pub fn execute(self, jobs: &mut JobTable, out: &mut dyn Write) -> Result<i32, ShellError> {
        const NAME: &str = "bg";

        let id = match self.job_id {
            Some(id) => id,
            None => jobs
                .get_last_stopped()
                .map(|(id, _)| id)
                .ok_or(ShellError::NoStoppedJobs { command: NAME })?,
        };
        let job = jobs
            .get_mut(id)
            .ok_or(ShellError::JobNotFound { command: NAME, id })?;

        let _ = writeln!(out, "{} : {}", job.display, job.pid);
        job.stopped = false;
        job_control::send_signal(job.pid, libc::SIGCONT).map_err(ShellError::syscall("kill"))?;
        Ok(0)
    }
}

// ── Simple builtins ──

/// `cd [path|-]`, checked for arity when built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDirCommand {
    target: Option<String>,
}

impl ChangeDirCommand {
    pub fn new(args: &[String]) -> Result<Self, ShellError> {
        match args {
            [] => Ok(Self { target: None }),
            [target] => Ok(Self { target: Some(target.clone()) }),
            _ => Err(ShellError::TooManyArguments { command: "cd" }),
        }
    }

    /// `last_dir` is the directory `cd -` returns to; updated on success.
    pub fn execute(self, last_dir: &mut Option<PathBuf>) -> Result<i32, ShellError> {
        let Some(target) = self.target else {
            return Ok(0);
        };

        let destination = if target == "-" {
            last_dir
                .clone()
                .ok_or(ShellError::OldPwdNotSet { command: "cd" })?
        } else {
            PathBuf::from(target)
        };

        let current = std::env::current_dir().map_err(ShellError::syscall("getcwd"))?;
        std::env::set_current_dir(&destination).map_err(ShellError::syscall("chdir"))?;
        *last_dir = Some(current);
        Ok(0)
    }
}

pub fn builtin_pwd(out: &mut dyn Write) -> Result<i32, ShellError> {
    let cwd = std::env::current_dir().map_err(ShellError::syscall("getcwd"))?;
    let _ = writeln!(out, "{}", cwd.display());
    Ok(0)
}

pub fn builtin_showpid(out: &mut dyn Write) -> i32 {
    let _ = writeln!(out, "smash pid is {}", std::process::id());
    0
}
