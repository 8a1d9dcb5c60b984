use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::job_control::pid_t;

/// The child the shell is currently blocked on, if any.
///
/// Owned by the [`Shell`](crate::shell::Shell) and cloned into the interrupt
/// handlers, which run on their own threads. Zero means "no foreground child".
#[derive(Debug, Clone, Default)]
pub struct ForegroundSlot {
    pid: Arc<AtomicI32>,
}

impl ForegroundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<pid_t> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Record `pid` until the returned guard is dropped.
    pub fn track(&self, pid: pid_t) -> ForegroundGuard<'_> {
        self.pid.store(pid, Ordering::SeqCst);
        ForegroundGuard { slot: self }
    }

    fn clear(&self) {
        self.pid.store(0, Ordering::SeqCst);
    }
}

/// Clears the slot when the blocking wait it brackets is over, on every path.
#[must_use = "the slot is cleared as soon as the guard is dropped"]
pub struct ForegroundGuard<'a> {
    slot: &'a ForegroundSlot,
}

impl Drop for ForegroundGuard<'_> {
    fn drop(&mut self) {
        self.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_by_default() {
        assert_eq!(ForegroundSlot::new().get(), None);
    }

    #[test]
    fn guard_clears_on_drop_and_clones_share_state() {
        let slot = ForegroundSlot::new();
        let handler_view = slot.clone();
        {
            let _guard = slot.track(4242);
            assert_eq!(handler_view.get(), Some(4242));
        }
        assert_eq!(handler_view.get(), None);
    }

    #[test]
    fn guard_clears_on_error_path() {
        fn failing_wait(slot: &ForegroundSlot) -> Result<(), &'static str> {
            let _guard = slot.track(77);
            Err("waitpid failed")
        }

        let slot = ForegroundSlot::new();
        assert!(failing_wait(&slot).is_err());
        assert_eq!(slot.get(), None);
    }
}
