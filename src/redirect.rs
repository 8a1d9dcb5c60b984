use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use crate::error::ShellError;
use crate::job_control;
use crate::parser;
use crate::shell::{Shell, ShellAction};

/// Permission bits for a newly created target file, before the umask.
const CREATE_MODE: u32 = 0o666;

/// How the target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`
    Truncate,
    /// `>>`
    Append,
}

/// `command > path` or `command >> path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCommand {
    command: String,
    path: PathBuf,
    mode: RedirectMode,
}

impl RedirectCommand {
    /// Split `line` at its first `>`. The path must be exactly one word.
    pub fn new(line: &str) -> Result<Self, ShellError> {
        let invalid = || ShellError::InvalidArguments { command: "redirection" };

        let (command, rest) = line.split_once('>').ok_or_else(invalid)?;
        let (mode, rest) = match rest.strip_prefix('>') {
            Some(rest) => (RedirectMode::Append, rest),
            None => (RedirectMode::Truncate, rest),
        };

        // `cmd > file &` backgrounds the wrapped command, not the redirection.
        let mut command = command.trim().to_string();
        if parser::is_background(rest) {
            command.push('&');
        }

        let [path] = <[String; 1]>::try_from(parser::tokenize(parser::strip_background(rest)))
            .map_err(|_| invalid())?;

        Ok(Self {
            command,
            path: PathBuf::from(path),
            mode,
        })
    }

    fn open_target(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).mode(CREATE_MODE);
        match self.mode {
            RedirectMode::Truncate => options.truncate(true),
            RedirectMode::Append => options.append(true),
        };
        options.open(&self.path)
    }

    /// Run the wrapped command with stdout bound to the target file. Stdout is
    /// put back afterwards no matter how the wrapped command went.
    pub fn execute(self, shell: &mut Shell) -> Result<ShellAction, ShellError> {
        let file = self.open_target().map_err(ShellError::syscall("open"))?;
        let redirected = StdoutRedirect::install(file.as_raw_fd())?;
        tracing::debug!(path = %self.path.display(), mode = ?self.mode, "stdout redirected");

        let action = shell.execute(&self.command);

        drop(redirected);
        drop(file);
        Ok(action)
    }
}

/// Holds the saved stdout while fd 1 points somewhere else.
struct StdoutRedirect {
    saved: RawFd,
}

impl StdoutRedirect {
    fn install(target: RawFd) -> Result<Self, ShellError> {
        let _ = io::stdout().flush();

        let saved = job_control::dup(libc::STDOUT_FILENO).map_err(ShellError::syscall("dup"))?;
        if let Err(err) = job_control::dup2(target, libc::STDOUT_FILENO) {
            let _ = job_control::close(saved);
            return Err(ShellError::syscall("dup2")(err));
        }
        Ok(Self { saved })
    }
}

impl Drop for StdoutRedirect {
    fn drop(&mut self) {
        let _ = io::stdout().flush();

        if let Err(err) = job_control::dup2(self.saved, libc::STDOUT_FILENO) {
            ShellError::syscall("dup2")(err).report();
        }
        if let Err(err) = job_control::close(self.saved) {
            ShellError::syscall("close")(err).report();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_split() {
        let redirect = RedirectCommand::new("echo hello > out.txt").unwrap();
        assert_eq!(redirect.command, "echo hello");
        assert_eq!(redirect.path, PathBuf::from("out.txt"));
        assert_eq!(redirect.mode, RedirectMode::Truncate);
    }

    #[test]
    fn append_split_without_spaces() {
        let redirect = RedirectCommand::new("ls>>log").unwrap();
        assert_eq!(redirect.command, "ls");
        assert_eq!(redirect.path, PathBuf::from("log"));
        assert_eq!(redirect.mode, RedirectMode::Append);
    }

    #[test]
    fn wrapped_pipeline_stays_intact() {
        let redirect = RedirectCommand::new("printf 'a\\nb\\n' | wc -l > count").unwrap();
        assert_eq!(redirect.command, "printf 'a\\nb\\n' | wc -l");
        assert_eq!(redirect.path, PathBuf::from("count"));
    }

    #[test]
    fn quoted_path_and_background_marker() {
        let redirect = RedirectCommand::new("sleep 5 > \"my file\" &").unwrap();
        assert_eq!(redirect.command, "sleep 5&");
        assert_eq!(redirect.path, PathBuf::from("my file"));
    }

    #[test]
    fn missing_or_extra_path_is_invalid() {
        for line in ["echo hi >", "echo hi >   ", "echo hi > a b"] {
            let err = RedirectCommand::new(line).unwrap_err();
            assert_eq!(err.to_string(), "redirection: invalid arguments", "line: {line}");
        }
    }
}
