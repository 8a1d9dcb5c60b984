#[cfg(not(unix))]
compile_error!("smash manages POSIX process groups and only builds on Unix");

mod builtins;
mod command;
mod config;
mod error;
mod executor;
mod foreground;
mod job_control;
mod jobs;
mod parser;
mod pipeline;
mod redirect;
mod shell;
mod signals;

use std::io::{self, Write};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{DEFAULT_LOG_FILTER, ShellConfig};
use crate::shell::{Shell, ShellAction};

fn main() {
    let config = ShellConfig::from_env();

    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let mut shell = Shell::new(&config);
    signals::install(&shell.foreground).expect("Failed to install signal handlers");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_exit_code: i32 = 0;

    loop {
        let _ = write!(stdout, "{}> ", shell.prompt());
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => match shell.execute(&input) {
                ShellAction::Continue(code) => last_exit_code = code,
                ShellAction::Exit(code) => {
                    last_exit_code = code;
                    break;
                }
            },
            Err(error) => {
                eprintln!("smash error: read failed: {error}");
                break;
            }
        }
    }

    let _ = stdout.flush();
    std::process::exit(last_exit_code);
}
