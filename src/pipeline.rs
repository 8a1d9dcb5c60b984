use std::io;
use std::os::fd::{AsRawFd, RawFd};

use crate::command::Command;
use crate::error::ShellError;
use crate::executor::wait_in_foreground;
use crate::job_control::{self, Fork, pid_t};
use crate::parser;
use crate::shell::{Shell, ShellAction};

/// Which output of the left-hand command feeds the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeStream {
    /// `|`
    Stdout,
    /// `|&`
    Stderr,
}

impl PipeStream {
    fn fd(self) -> RawFd {
        match self {
            PipeStream::Stdout => libc::STDOUT_FILENO,
            PipeStream::Stderr => libc::STDERR_FILENO,
        }
    }
}

/// `left | right` or `left |& right`, each side run by its own forked shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeCommand {
    left: String,
    right: String,
    stream: PipeStream,
    background: bool,
    display: String,
}

impl PipeCommand {
    /// Split `line` at its first `|`. A trailing `&` backgrounds both stages.
    pub fn new(line: &str) -> Option<Self> {
        let body = parser::strip_background(line);
        let (left, rest) = body.split_once('|')?;
        let (stream, right) = match rest.strip_prefix('&') {
            Some(right) => (PipeStream::Stderr, right),
            None => (PipeStream::Stdout, rest),
        };

        Some(Self {
            left: left.trim().to_string(),
            right: right.trim().to_string(),
            stream,
            background: parser::is_background(line),
            display: line.trim().to_string(),
        })
    }

    pub fn execute(self, shell: &mut Shell) -> Result<i32, ShellError> {
        let (reader, writer) = os_pipe::pipe().map_err(ShellError::syscall("pipe"))?;
        let read_fd = reader.as_raw_fd();
        let write_fd = writer.as_raw_fd();
        let target = self.stream.fd();

        let writer_pid = spawn_stage(shell, &self.left, || {
            job_control::close(read_fd)?;
            job_control::dup2(write_fd, target)?;
            job_control::close(write_fd)
        })?;

        let reader_pid = spawn_stage(shell, &self.right, || {
            job_control::close(write_fd)?;
            job_control::dup2(read_fd, libc::STDIN_FILENO)?;
            job_control::close(read_fd)
        });

        // Only the children use the pipe; the reader sees EOF once the writer exits.
        drop(reader);
        drop(writer);

        let reader_pid = match reader_pid {
            Ok(pid) => pid,
            Err(err) => {
                // The left stage is already running; do not leave it untracked.
                if self.background {
                    shell.jobs.add(writer_pid, self.display, false);
                } else if let Err(wait_err) = job_control::wait_for_exit(writer_pid) {
                    ShellError::syscall("waitpid")(wait_err).report();
                }
                return Err(err);
            }
        };

        tracing::debug!(
            writer = writer_pid,
            reader = reader_pid,
            stream = ?self.stream,
            background = self.background,
            "pipeline started"
        );

        if self.background {
            shell.jobs.add(writer_pid, self.display.clone(), false);
            shell.jobs.add(reader_pid, self.display, false);
            return Ok(0);
        }

        let mut status = 0;
        for pid in [writer_pid, reader_pid] {
            match wait_in_foreground(pid, self.display.clone(), &mut shell.jobs, &shell.foreground) {
                Ok(code) => status = code,
                Err(err) => err.report(),
            }
        }
        Ok(status)
    }
}

/// Fork a child that isolates itself in a new process group, runs `wire` to
/// hook up its end of the pipe, and then runs `command`.
fn spawn_stage(
    shell: &mut Shell,
    command: &str,
    wire: impl FnOnce() -> io::Result<()>,
) -> Result<pid_t, ShellError> {
    match job_control::fork().map_err(ShellError::syscall("fork"))? {
        Fork::Child => {
            shell.jobs.mark_inherited();
            if let Err(err) = job_control::set_process_group(0, 0) {
                ShellError::syscall("setpgid")(err).report();
            }
            if let Err(err) = wire() {
                ShellError::syscall("dup2")(err).report();
                job_control::exit_child(1);
            }

            job_control::exit_child(run_stage(shell, command))
        }
        Fork::Parent(pid) => {
            // Also set from the parent so the group exists before anyone signals it.
            if let Err(err) = job_control::set_process_group(pid, pid) {
                ShellError::syscall("setpgid")(err).report();
            }
            Ok(pid)
        }
    }
}

/// Run one side of the pipe inside its forked child. An external program takes
/// over the child process itself, so the pid in the job table is the program's.
fn run_stage(shell: &mut Shell, line: &str) -> i32 {
    match Command::parse(line, &mut shell.jobs) {
        Ok(Some(Command::External(external))) => external.exec_in_place(),
        Ok(Some(command)) => match command.execute(shell) {
            Ok(ShellAction::Continue(code) | ShellAction::Exit(code)) => code,
            Err(err) => {
                err.report();
                1
            }
        },
        Ok(None) => 0,
        Err(err) => {
            err.report();
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_stdout_pipe() {
        let pipe = PipeCommand::new("echo hi | wc -l").unwrap();
        assert_eq!(pipe.left, "echo hi");
        assert_eq!(pipe.right, "wc -l");
        assert_eq!(pipe.stream, PipeStream::Stdout);
        assert!(!pipe.background);
        assert_eq!(pipe.display, "echo hi | wc -l");
    }

    #[test]
    fn splits_stderr_pipe() {
        let pipe = PipeCommand::new("ls /nope |& sort").unwrap();
        assert_eq!(pipe.left, "ls /nope");
        assert_eq!(pipe.right, "sort");
        assert_eq!(pipe.stream, PipeStream::Stderr);
        assert_eq!(pipe.stream.fd(), libc::STDERR_FILENO);
    }

    #[test]
    fn trailing_ampersand_backgrounds_both_stages() {
        let pipe = PipeCommand::new("yes | head -1 &").unwrap();
        assert!(pipe.background);
        assert_eq!(pipe.right, "head -1");
        assert_eq!(pipe.display, "yes | head -1 &");
    }

    #[test]
    fn only_first_bar_splits() {
        let pipe = PipeCommand::new("a | b | c").unwrap();
        assert_eq!(pipe.left, "a");
        assert_eq!(pipe.right, "b | c");
    }

    #[test]
    fn no_bar_is_not_a_pipeline() {
        assert!(PipeCommand::new("echo hi").is_none());
    }
}
