use std::io::{self, Write};
use std::os::fd::RawFd;

pub use libc::pid_t;

/// How a blocking wait on a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Exited normally or was killed; carries the shell-style status (128+N for signals).
    Exited(i32),
    /// Suspended by the carried stop signal; still alive.
    Stopped(libc::c_int),
}

/// Which side of a `fork()` we are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    Child,
    Parent(pid_t),
}

/// Run `f` until it stops failing with EINTR.
fn retry_eintr<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(err) if err.raw_os_error() == Some(libc::EINTR) => continue,
            other => return other,
        }
    }
}

fn check(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Fork the shell. Buffered stdout is flushed first so the child does not
/// replay text the parent already produced.
pub fn fork() -> io::Result<Fork> {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    // SAFETY: the child only runs the shell's own dispatcher and then `_exit`s
    // through `exit_child`; it never returns into the caller's frames.
    let pid = unsafe { libc::fork() };
    match pid {
        0 => Ok(Fork::Child),
        p if p > 0 => Ok(Fork::Parent(p)),
        _ => Err(io::Error::last_os_error()),
    }
}

pub fn set_process_group(pid: pid_t, pgid: pid_t) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::setpgid(pid, pgid) };
        if rc == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINTR => continue,
            // Already exec'd or gone; caller can proceed with best-effort behavior.
            Some(code) if code == libc::EACCES || code == libc::ESRCH => return Ok(()),
            _ => return Err(err),
        }
    }
}

/// Block until `pid` exits or stops.
pub fn wait_for_pid(pid: pid_t) -> io::Result<WaitOutcome> {
    loop {
        let mut raw_status: libc::c_int = 0;
        retry_eintr(|| check(unsafe { libc::waitpid(pid, &mut raw_status, libc::WUNTRACED) }))?;

        if libc::WIFSTOPPED(raw_status) {
            return Ok(WaitOutcome::Stopped(libc::WSTOPSIG(raw_status)));
        }

        if let Some(code) = exit_code_from_wait_status(raw_status) {
            return Ok(WaitOutcome::Exited(code));
        }
    }
}

/// Block until `pid` has terminated and been collected. Stops are not reported.
pub fn wait_for_exit(pid: pid_t) -> io::Result<()> {
    retry_eintr(|| check(unsafe { libc::waitpid(pid, std::ptr::null_mut(), 0) })).map(|_| ())
}

/// Non-blocking status check. `Ok(true)` means the child has exited and is now reaped.
pub fn try_reap(pid: pid_t) -> io::Result<bool> {
    let rc = retry_eintr(|| {
        check(unsafe { libc::waitpid(pid, std::ptr::null_mut(), libc::WNOHANG) })
    })?;
    Ok(rc > 0)
}

pub fn send_signal(pid: pid_t, signal: libc::c_int) -> io::Result<()> {
    if pid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process id",
        ));
    }

    retry_eintr(|| check(unsafe { libc::kill(pid, signal) })).map(|_| ())
}

pub fn dup(fd: RawFd) -> io::Result<RawFd> {
    retry_eintr(|| check(unsafe { libc::dup(fd) }))
}

pub fn dup2(src: RawFd, dst: RawFd) -> io::Result<()> {
    retry_eintr(|| check(unsafe { libc::dup2(src, dst) })).map(|_| ())
}

pub fn close(fd: RawFd) -> io::Result<()> {
    // Retrying close on EINTR can close an unrelated, reused descriptor.
    check(unsafe { libc::close(fd) }).map(|_| ())
}

/// Leave a forked child without running the parent's atexit handlers.
pub fn exit_child(status: i32) -> ! {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    unsafe { libc::_exit(status) }
}

/// Convert a raw `waitpid` status into shell exit-code semantics.
///
/// Processes terminated by a signal map to `128 + signal`.
pub fn exit_code_from_wait_status(raw_status: libc::c_int) -> Option<i32> {
    if libc::WIFEXITED(raw_status) {
        return Some(libc::WEXITSTATUS(raw_status));
    }

    if libc::WIFSIGNALED(raw_status) {
        return Some(128 + libc::WTERMSIG(raw_status));
    }

    None
}
