use std::io::{self, Write};

use crate::builtins::{
    self, BackgroundCommand, ChangeDirCommand, ForegroundCommand, KillCommand,
};
use crate::error::ShellError;
use crate::executor::ExternalCommand;
use crate::jobs::JobTable;
use crate::parser;
use crate::pipeline::PipeCommand;
use crate::redirect::RedirectCommand;
use crate::shell::{Shell, ShellAction};

/// One parsed command line, ready to run.
///
/// Building a variant validates its arguments (and, for job commands, that the
/// job exists) without touching any process; running it is a separate step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ChangePrompt(Option<String>),
    ShowPid,
    Pwd,
    ChangeDir(ChangeDirCommand),
    Jobs,
    Kill(KillCommand),
    Foreground(ForegroundCommand),
    Background(BackgroundCommand),
    Quit { kill_all: bool },
    External(ExternalCommand),
    Pipe(PipeCommand),
    Redirect(RedirectCommand),
}

impl Command {
    /// Classify `line`. `Ok(None)` means there is nothing to run.
    pub fn parse(line: &str, jobs: &mut JobTable) -> Result<Option<Command>, ShellError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.contains('>') {
            return RedirectCommand::new(line).map(|r| Some(Command::Redirect(r)));
        }
        if let Some(pipe) = PipeCommand::new(line) {
            return Ok(Some(Command::Pipe(pipe)));
        }

        let background = parser::is_background(line);
        let argv = parser::tokenize(parser::strip_background(line));
        let Some((name, args)) = argv.split_first() else {
            return Ok(None);
        };

        let command = match name.as_str() {
            "chprompt" => Command::ChangePrompt(args.first().cloned()),
            "showpid" => Command::ShowPid,
            "pwd" => Command::Pwd,
            "cd" => Command::ChangeDir(ChangeDirCommand::new(args)?),
            "jobs" => Command::Jobs,
            "kill" => Command::Kill(KillCommand::new(args, jobs)?),
            "fg" => Command::Foreground(ForegroundCommand::new(args, jobs)?),
            "bg" => Command::Background(BackgroundCommand::new(args, jobs)?),
            "quit" => Command::Quit {
                kill_all: args.first().is_some_and(|arg| arg == "kill"),
            },
            _ => return Ok(ExternalCommand::new(argv, line, background).map(Command::External)),
        };
        Ok(Some(command))
    }

    pub fn execute(self, shell: &mut Shell) -> Result<ShellAction, ShellError> {
        let mut stdout = io::stdout();
        let out: &mut dyn Write = &mut stdout;

        let status = match self {
            Command::ChangePrompt(prompt) => {
                shell.set_prompt(prompt);
                0
            }
            Command::ShowPid => builtins::builtin_showpid(out),
            Command::Pwd => builtins::builtin_pwd(out)?,
            Command::ChangeDir(cd) => cd.execute(&mut shell.last_dir)?,
            Command::Jobs => {
                shell.jobs.list(out);
                0
            }
            Command::Kill(kill) => kill.execute(&mut shell.jobs, out)?,
            Command::Foreground(fg) => fg.execute(&mut shell.jobs, &shell.foreground, out)?,
            Command::Background(bg) => bg.execute(&mut shell.jobs, out)?,
            Command::Quit { kill_all } => {
                if kill_all {
                    shell.jobs.kill_all(out);
                }
                return Ok(ShellAction::Exit(0));
            }
            Command::External(external) => external.execute(&mut shell.jobs, &shell.foreground)?,
            Command::Pipe(pipe) => pipe.execute(shell)?,
            Command::Redirect(redirect) => return redirect.execute(shell),
        };
        Ok(ShellAction::Continue(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Command>, ShellError> {
        Command::parse(line, &mut JobTable::new())
    }

    #[test]
    fn blank_lines_are_not_commands() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t").unwrap(), None);
        assert_eq!(parse("&").unwrap(), None);
    }

    #[test]
    fn redirection_wins_over_pipe() {
        assert!(matches!(parse("ls | wc > out"), Ok(Some(Command::Redirect(_)))));
        assert!(matches!(parse("ls | wc"), Ok(Some(Command::Pipe(_)))));
        assert!(matches!(parse("ls |& wc"), Ok(Some(Command::Pipe(_)))));
    }

    #[test]
    fn builtins_ignore_background_marker() {
        assert_eq!(parse("jobs&").unwrap(), Some(Command::Jobs));
        assert_eq!(parse("showpid &").unwrap(), Some(Command::ShowPid));
        assert_eq!(parse("pwd").unwrap(), Some(Command::Pwd));
    }

    #[test]
    fn quit_variants() {
        assert_eq!(parse("quit").unwrap(), Some(Command::Quit { kill_all: false }));
        assert_eq!(parse("quit kill").unwrap(), Some(Command::Quit { kill_all: true }));
        assert_eq!(parse("quit now").unwrap(), Some(Command::Quit { kill_all: false }));
    }

    #[test]
    fn chprompt_takes_first_argument() {
        assert_eq!(
            parse("chprompt hello world").unwrap(),
            Some(Command::ChangePrompt(Some("hello".to_string())))
        );
        assert_eq!(parse("chprompt").unwrap(), Some(Command::ChangePrompt(None)));
    }

    #[test]
    fn construction_errors_surface_from_parse() {
        let err = parse("kill -9 999").unwrap_err();
        assert_eq!(err.to_string(), "kill: job-id 999 does not exist");
        let err = parse("fg 1 2").unwrap_err();
        assert_eq!(err.to_string(), "fg: invalid arguments");
        let err = parse("cd a b").unwrap_err();
        assert_eq!(err.to_string(), "cd: too many arguments");
    }

    #[test]
    fn names_close_to_builtins_run_as_programs() {
        assert!(matches!(parse("cd"), Ok(Some(Command::ChangeDir(_)))));
        assert!(matches!(parse("fg"), Ok(Some(Command::Foreground(_)))));
        for line in ["jobsx", "Kill -9 1", "quitter", "./pwd"] {
            assert!(
                matches!(parse(line), Ok(Some(Command::External(_)))),
                "line: {line}"
            );
        }
    }

    #[test]
    fn everything_else_is_external() {
        let command = parse("sleep 10 &").unwrap();
        let expected = ExternalCommand::new(
            vec!["sleep".to_string(), "10".to_string()],
            "sleep 10 &",
            true,
        );
        assert_eq!(command, expected.map(Command::External));
    }
}
