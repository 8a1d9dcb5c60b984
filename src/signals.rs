use std::io::{self, Write};
use std::thread;

use signal_hook::consts::signal::SIGTSTP;
use signal_hook::iterator::Signals;

use crate::error::ShellError;
use crate::foreground::ForegroundSlot;
use crate::job_control;

/// Route Ctrl-C and Ctrl-Z to whichever child the shell is waiting on.
///
/// Children live in their own process groups, so terminal signals only reach
/// the shell; these handlers forward them using the foreground slot.
pub fn install(foreground: &ForegroundSlot) -> io::Result<()> {
    let slot = foreground.clone();
    ctrlc::set_handler(move || on_interrupt(&slot)).map_err(io::Error::other)?;

    let slot = foreground.clone();
    let mut signals = Signals::new([SIGTSTP])?;
    thread::Builder::new()
        .name("smash-sigtstp".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                on_suspend(&slot);
            }
        })?;
    Ok(())
}

fn on_interrupt(foreground: &ForegroundSlot) {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "smash: got ctrl-C");
    if let Some(pid) = foreground.get() {
        forward(pid, libc::SIGKILL, "killed", &mut stdout);
    }
    let _ = stdout.flush();
}

fn on_suspend(foreground: &ForegroundSlot) {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "smash: got ctrl-Z");
    if let Some(pid) = foreground.get() {
        forward(pid, libc::SIGSTOP, "stopped", &mut stdout);
    }
    let _ = stdout.flush();
}

fn forward(pid: job_control::pid_t, signal: libc::c_int, verb: &str, out: &mut dyn Write) {
    match job_control::send_signal(pid, signal) {
        Ok(()) => {
            tracing::debug!(pid, signal, "forwarded terminal signal");
            let _ = writeln!(out, "smash: process {pid} was {verb}");
        }
        Err(err) => ShellError::syscall("kill")(err).report(),
    }
}
