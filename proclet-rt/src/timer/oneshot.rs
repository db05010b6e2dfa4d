//! Lightweight stand-alone timers.
//!
//! For the common "poke me in a while" case that does not need the timer
//! server: each timer is its own task, stoppable, with the same
//! non-blocking delivery guarantee.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use crate::message::Term;
use crate::process::Pid;

/// A stoppable one-shot timer.
///
/// Dropping the handle does not stop the timer; call [`Timer::stop`].
#[derive(Debug)]
pub struct Timer {
    task: JoinHandle<()>,
}

impl Timer {
    /// Stop the timer. A timer that has already fired stops quietly.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Pid {
    /// Deliver `msg` to this process after `timeout_ms` milliseconds.
    ///
    /// Delivery is a non-blocking send: if the process is gone or its
    /// mailbox full by then, the message is dropped.
    pub fn send_after<T: Term>(&self, msg: T, timeout_ms: u64) -> Timer {
        let pid = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            let _ = pid.send(msg);
        });
        Timer { task }
    }

    /// Run `f` after `timeout_ms` milliseconds.
    pub fn run_after<F>(&self, f: F, timeout_ms: u64) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            f();
        });
        Timer { task }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::UsrMsg;
    use std::sync::Weak;

    #[derive(Debug, Clone, PartialEq)]
    struct Poke;

    #[tokio::test(start_paused = true)]
    async fn test_send_after_delivers_once() {
        let (pid, mut mb) = Pid::new(1, 1, Weak::new(), 8, 8);
        let _timer = pid.send_after(Poke, 20);

        tokio::time::advance(Duration::from_millis(25)).await;
        match mb.usr.recv().await.unwrap() {
            UsrMsg::Cast(term) => assert!(term.is::<Poke>()),
            other => unreachable!("{other:?}"),
        }
        assert!(mb.usr.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_delivery() {
        let (pid, mut mb) = Pid::new(1, 1, Weak::new(), 8, 8);
        let timer = pid.send_after(Poke, 20);
        timer.stop();

        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(mb.usr.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_after_invokes_function() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let (pid, _mb) = Pid::new(1, 1, Weak::new(), 8, 8);

        let _timer = pid.run_after(move || {
            let _ = tx.send(());
        }, 10);

        tokio::time::advance(Duration::from_millis(15)).await;
        rx.await.unwrap();
    }
}
