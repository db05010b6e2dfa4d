//! The process driver: runs one process, start to teardown.
//!
//! The driver owns the mailbox receivers and the [`ProcessContext`]. Raw
//! processes spawned with [`Env::spawn`](crate::env::Env::spawn) receive
//! `&mut Driver` and pull messages through [`Driver::recv`], which services
//! the system channel with strict priority before handing out user
//! messages. The generic-server loop reuses the same plumbing.
//!
//! Teardown, in order: fire the exit signal, broadcast exit signals to
//! linked peers, notify monitors, drain pending system messages (answering
//! late link requests with a `no_proc` exit), then drop the mailboxes.

// Layer 1: Standard library imports
use std::any::Any;

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use futures::FutureExt;

// Layer 3: Internal module imports
use super::context::ProcessContext;
use super::pid::{Mailboxes, Pid};
use crate::error::ExitReason;
use crate::mailbox::Mailbox;
use crate::message::{ExitMsg, Info, ReplyTo, SysMsg, TermBox, UsrMsg};

/// Outcome of a raw process loop: `Err(reason)` terminates the process with
/// that reason, `Ok(())` with reason `normal`.
pub type ProcResult = Result<(), ExitReason>;

/// A user message handed out by [`Driver::recv`].
#[derive(Debug)]
pub enum Received {
    /// Asynchronous message from [`Pid::send`].
    Cast(TermBox),

    /// Synchronous request from [`Pid::call`] with its reply slot.
    Call {
        /// Request payload.
        req: TermBox,
        /// Reply slot; dropping it unreplied fails the caller with
        /// `no_proc`.
        reply: ReplyTo,
    },

    /// Notification: trapped exit, monitor-down, or a
    /// [`Pid::send_info`] payload.
    Info(Info),
}

/// Drives one process.
pub struct Driver {
    pub(crate) ctx: ProcessContext,
    pub(crate) usr: Mailbox<UsrMsg>,
    pub(crate) sys: Mailbox<SysMsg>,
}

impl Driver {
    pub(crate) fn new(ctx: ProcessContext, mailboxes: Mailboxes) -> Self {
        Self {
            ctx,
            usr: mailboxes.usr,
            sys: mailboxes.sys,
        }
    }

    /// Handle of the driven process.
    pub fn self_pid(&self) -> &Pid {
        self.ctx.self_pid()
    }

    /// The process context: links, monitors, trap-exit.
    pub fn context(&mut self) -> &mut ProcessContext {
        &mut self.ctx
    }

    /// Receive the next user message.
    ///
    /// System messages are consumed here, before any user message, and never
    /// surface to the loop; when one of them demands termination (a stop
    /// request, an untrapped exit) this returns `Err(reason)`, which the
    /// loop propagates with `?`.
    pub async fn recv(&mut self) -> Result<Received, ExitReason> {
        loop {
            // system channel has strict priority
            while let Some(msg) = self.sys.try_recv() {
                self.ctx.handle_sys_msg(msg)?;
            }

            tokio::select! {
                biased;
                msg = self.sys.recv() => match msg {
                    Some(msg) => self.ctx.handle_sys_msg(msg)?,
                    None => return Err(ExitReason::Normal),
                },
                msg = self.usr.recv() => match msg {
                    Some(UsrMsg::Cast(term)) => return Ok(Received::Cast(term)),
                    Some(UsrMsg::Call { req, reply }) => {
                        return Ok(Received::Call { req, reply })
                    }
                    Some(UsrMsg::Info(info)) => return Ok(Received::Info(info)),
                    None => return Err(ExitReason::Normal),
                },
            }
        }
    }

    /// Run a raw process loop to completion, then tear the process down.
    pub(crate) async fn run_process<F>(mut self, f: F, link_to: Option<Pid>)
    where
        F: for<'a> FnOnce(&'a mut Driver) -> BoxFuture<'a, ProcResult> + Send + 'static,
    {
        if let Some(parent) = link_to {
            self.ctx.link(&parent);
        }

        let outcome = std::panic::AssertUnwindSafe(f(&mut self))
            .catch_unwind()
            .await;

        let reason = match outcome {
            Ok(Ok(())) => ExitReason::Normal,
            Ok(Err(reason)) => reason,
            Err(panic) => ExitReason::Other(panic_message(panic)),
        };

        self.teardown(reason);
    }

    /// Final phase of every process, raw or generic-server.
    pub(crate) fn teardown(mut self, reason: ExitReason) {
        let pid = self.ctx.self_pid().clone();

        pid.mark_exited();

        for peer in self.ctx.take_links() {
            let _ = peer.send_sys(SysMsg::Exit(ExitMsg {
                from: Some(pid.clone()),
                reason: reason.clone(),
                link: true,
            }));
        }

        pid.fire_monitor_downs(&reason);

        // Answer link requests that raced with the death; anything else
        // pending is discarded with the mailboxes.
        while let Some(msg) = self.sys.try_recv() {
            if let SysMsg::Link(peer) = msg {
                let _ = peer.send_sys(SysMsg::Exit(ExitMsg {
                    from: Some(pid.clone()),
                    reason: ExitReason::NoProc,
                    link: true,
                }));
            }
        }
    }
}

/// Render a recovered panic payload as an exit-reason text.
pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Weak;
    use std::time::Duration;

    fn new_driver(id: u64) -> (Pid, Driver) {
        let (pid, mailboxes) = Pid::new(id, 1, Weak::new(), 8, 8);
        let ctx = ProcessContext::new(pid.clone(), None);
        (pid, Driver::new(ctx, mailboxes))
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Echo(u32);

    #[tokio::test]
    async fn test_echo_loop_round_trip() {
        let (pid, driver) = new_driver(1);
        tokio::spawn(driver.run_process(
            |p| {
                Box::pin(async move {
                    loop {
                        if let Received::Call { req, mut reply } = p.recv().await? {
                            let echo = req.downcast::<Echo>().map_err(|_| {
                                ExitReason::Other("unexpected request".into())
                            })?;
                            reply.reply(Echo(echo.0 + 1));
                        }
                    }
                })
            },
            None,
        ));

        let reply = pid.call(Echo(1)).await.unwrap();
        assert_eq!(*reply.downcast::<Echo>().unwrap(), Echo(2));

        pid.stop().await.unwrap();
        assert!(pid.alive().is_err());
    }

    #[tokio::test]
    async fn test_loop_error_becomes_exit_reason() {
        let (pid, driver) = new_driver(1);
        let task = tokio::spawn(driver.run_process(
            |p| {
                Box::pin(async move {
                    let _ = p.recv().await?;
                    Err(ExitReason::Other("done here".into()))
                })
            },
            None,
        ));

        pid.send(Echo(0)).unwrap();
        task.await.unwrap();
        assert!(!pid.is_alive());
    }

    #[tokio::test]
    async fn test_panic_in_loop_is_recovered() {
        let (pid, driver) = new_driver(1);
        let task = tokio::spawn(driver.run_process(
            |p| {
                Box::pin(async move {
                    let _ = p.recv().await?;
                    panic!("boom");
                })
            },
            None,
        ));

        pid.send(Echo(0)).unwrap();
        task.await.unwrap();
        assert!(!pid.is_alive());
    }

    #[tokio::test]
    async fn test_teardown_notifies_linked_peer() {
        let (peer, mut peer_mb) = Pid::new(9, 1, Weak::new(), 8, 8);
        let (_pid, mut driver) = new_driver(1);

        driver.ctx.link(&peer);
        let _ = peer_mb.sys.try_recv(); // the link request
        driver.teardown(ExitReason::Other("bad".into()));

        match peer_mb.sys.try_recv().unwrap() {
            SysMsg::Exit(exit) => {
                assert_eq!(exit.reason, ExitReason::Other("bad".into()));
                assert!(exit.link);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_teardown_answers_pending_link_with_no_proc() {
        let (pid, driver) = new_driver(1);
        let (requester, mut requester_mb) = Pid::new(9, 1, Weak::new(), 8, 8);

        pid.send_sys(SysMsg::Link(requester.clone())).unwrap();
        driver.teardown(ExitReason::Normal);

        match requester_mb.sys.try_recv().unwrap() {
            SysMsg::Exit(exit) => {
                assert_eq!(exit.reason, ExitReason::NoProc);
                assert_eq!(exit.from, Some(pid));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sys_priority_over_user_messages() {
        let (pid, driver) = new_driver(1);
        // queue a user message, then a stop; the stop must win
        pid.send(Echo(0)).unwrap();
        pid.send_sys(SysMsg::Stop(ExitReason::Normal)).unwrap();

        tokio::spawn(driver.run_process(
            |p| {
                Box::pin(async move {
                    loop {
                        let received = p.recv().await?;
                        // the loop should never see the cast
                        panic!("unexpected delivery: {received:?}");
                    }
                })
            },
            None,
        ));

        tokio::time::timeout(Duration::from_millis(200), pid.exited())
            .await
            .unwrap();
    }

    #[test]
    fn test_panic_message_forms() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_owned())), "boom");
        assert_eq!(panic_message(Box::new(17u8)), "panic");
    }
}
