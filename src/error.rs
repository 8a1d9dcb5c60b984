use std::ffi::CStr;
use std::io::{self, Write};

use thiserror::Error;

use crate::jobs::JobId;

/// Everything a command can report. Nothing here is fatal to the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{command}: invalid arguments")]
    InvalidArguments { command: &'static str },

    #[error("{command}: too many arguments")]
    TooManyArguments { command: &'static str },

    #[error("{command}: job-id {id} does not exist")]
    JobNotFound { command: &'static str, id: JobId },

    #[error("{command}: job-id {id} is already running in the background")]
    JobAlreadyRunning { command: &'static str, id: JobId },

    #[error("{command}: there is no stopped jobs to resume")]
    NoStoppedJobs { command: &'static str },

    #[error("{command}: jobs list is empty")]
    EmptyJobList { command: &'static str },

    #[error("{command}: OLDPWD not set")]
    OldPwdNotSet { command: &'static str },

    #[error("{call} failed: {}", errno_text(.source))]
    Syscall {
        call: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    /// Wrap an `io::Error` from the named system call.
    pub fn syscall(call: &'static str) -> impl FnOnce(io::Error) -> ShellError {
        move |source| ShellError::Syscall { call, source }
    }

    pub fn is_syscall(&self) -> bool {
        matches!(self, ShellError::Syscall { .. })
    }

    /// Print as `smash error: ...`. Syscall failures go to stderr in perror
    /// form, argument and lookup errors go to stdout.
    pub fn report(&self) {
        tracing::debug!(error = ?self, "command error");
        if self.is_syscall() {
            let _ = io::stdout().flush();
            let _ = writeln!(io::stderr(), "smash error: {self}");
        } else {
            let _ = writeln!(io::stdout(), "smash error: {self}");
        }
    }
}

/// The strerror(3) text for an OS error, without Rust's "(os error N)" suffix.
pub fn errno_text(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => {
            // SAFETY: strerror returns a pointer to a NUL-terminated static or
            // thread-local buffer; we copy it out before any other libc call.
            let text = unsafe { CStr::from_ptr(libc::strerror(code)) };
            text.to_string_lossy().into_owned()
        }
        None => err.to_string(),
    }
}
