use std::path::PathBuf;

use crate::command::Command;
use crate::config::ShellConfig;
use crate::foreground::ForegroundSlot;
use crate::jobs::JobTable;

/// What the read loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Continue(i32),
    Exit(i32),
}

/// Per-session state shared by every command.
#[derive(Debug)]
pub struct Shell {
    pub jobs: JobTable,
    /// Read by the interrupt handlers; set only around blocking waits.
    pub foreground: ForegroundSlot,
    /// Target of `cd -`.
    pub last_dir: Option<PathBuf>,
    prompt: String,
    default_prompt: String,
}

impl Shell {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            jobs: JobTable::new(),
            foreground: ForegroundSlot::new(),
            last_dir: None,
            prompt: config.prompt.clone(),
            default_prompt: config.prompt.clone(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// `None` restores the configured prompt.
    pub fn set_prompt(&mut self, prompt: Option<String>) {
        self.prompt = prompt.unwrap_or_else(|| self.default_prompt.clone());
    }

    /// Parse and run one command line. Errors are reported here and turn the
    /// line into a failed no-op; the shell keeps going.
    pub fn execute(&mut self, line: &str) -> ShellAction {
        let command = match Command::parse(line, &mut self.jobs) {
            Ok(Some(command)) => command,
            Ok(None) => return ShellAction::Continue(0),
            Err(err) => {
                err.report();
                return ShellAction::Continue(1);
            }
        };

        tracing::trace!(?command, "dispatch");
        match command.execute(self) {
            Ok(action) => action,
            Err(err) => {
                err.report();
                ShellAction::Continue(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chprompt_sets_and_resets() {
        let mut shell = Shell::new(&ShellConfig::default());
        assert_eq!(shell.prompt(), "smash");

        assert_eq!(shell.execute("chprompt mysh"), ShellAction::Continue(0));
        assert_eq!(shell.prompt(), "mysh");

        shell.execute("chprompt");
        assert_eq!(shell.prompt(), "smash");
    }

    #[test]
    fn construction_error_is_a_failed_no_op() {
        let mut shell = Shell::new(&ShellConfig::default());
        assert_eq!(shell.execute("bg 7"), ShellAction::Continue(1));
        assert_eq!(shell.jobs.len(), 0);
    }

    #[test]
    fn quit_exits() {
        let mut shell = Shell::new(&ShellConfig::default());
        assert_eq!(shell.execute("quit"), ShellAction::Exit(0));
    }

    #[test]
    fn background_spawn_then_kill_all() {
        let mut shell = Shell::new(&ShellConfig::default());
        assert_eq!(shell.execute("sleep 30&"), ShellAction::Continue(0));
        assert_eq!(shell.execute("sleep 30 &"), ShellAction::Continue(0));
        assert_eq!(shell.jobs.len(), 2);

        shell.jobs.kill_all(&mut Vec::new());
        assert_eq!(shell.jobs.len(), 0);
    }
}
