//! Send and call primitives on process handles.
//!
//! All sends are non-blocking try-sends against bounded mailboxes; the
//! synchronous forms ([`Pid::call`], [`Pid::stop`], [`Pid::process_links`])
//! wait on a two-way select between the reply and the target's exit signal,
//! so a caller is never left hanging on a dead process.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use super::pid::Pid;
use crate::error::{ExitReason, RtError};
use crate::message::envelope::ReplyTo;
use crate::message::{ExitMsg, Info, SysMsg, Term, TermBox, UsrMsg};

impl Pid {
    /// Send an asynchronous message; the receiver sees it in `handle_cast`.
    ///
    /// # Errors
    ///
    /// [`RtError::ChannelFull`] when the user mailbox is at capacity,
    /// [`RtError::NoProc`] when the process has exited.
    pub fn send<T: Term>(&self, msg: T) -> Result<(), RtError> {
        self.send_term(Box::new(msg))
    }

    /// [`send`](Pid::send) for an already-boxed payload.
    pub fn send_term(&self, msg: TermBox) -> Result<(), RtError> {
        self.alive()?;
        self.usr_sender().try_send(UsrMsg::Cast(msg))
    }

    /// Send a notification; the receiver sees it in `handle_info` as
    /// [`Info::Message`].
    pub fn send_info<T: Term>(&self, msg: T) -> Result<(), RtError> {
        self.send_info_raw(Info::Message(Box::new(msg)))
    }

    pub(crate) fn send_info_raw(&self, info: Info) -> Result<(), RtError> {
        self.alive()?;
        self.usr_sender().try_send(UsrMsg::Info(info))
    }

    pub(crate) fn send_sys(&self, msg: SysMsg) -> Result<(), RtError> {
        self.alive()?;
        self.sys_sender().try_send(msg)
    }

    /// Synchronous request; the receiver sees it in `handle_call`.
    ///
    /// Waits for the reply or, failing that, the target's exit. An error
    /// value sent on the reply channel is unwrapped and returned as `Err`.
    ///
    /// # Errors
    ///
    /// Send errors as for [`send`](Pid::send); [`RtError::NoProc`] when the
    /// target exits before replying; any error the callee replied with.
    pub async fn call<T: Term>(&self, req: T) -> Result<TermBox, RtError> {
        self.call_term(Box::new(req)).await
    }

    /// [`call`](Pid::call) for an already-boxed payload.
    pub async fn call_term(&self, req: TermBox) -> Result<TermBox, RtError> {
        self.alive()?;

        let (tx, mut rx) = oneshot::channel();
        self.usr_sender().try_send(UsrMsg::Call {
            req,
            reply: ReplyTo::new(tx),
        })?;

        tokio::select! {
            biased;
            r = &mut rx => match r {
                Ok(reply) => reply,
                Err(_) => Err(RtError::NoProc),
            },
            _ = self.exited() => {
                // the reply may have raced with the exit signal
                match rx.try_recv() {
                    Ok(reply) => reply,
                    Err(_) => Err(RtError::NoProc),
                }
            }
        }
    }

    /// Ask the process to stop with reason `normal` and wait until it has.
    ///
    /// Returns `Ok` even though the process dies before replying; that is
    /// the contract of the stop request.
    ///
    /// # Errors
    ///
    /// [`RtError::NoProc`] when the process had already exited,
    /// [`RtError::ChannelFull`] when the system mailbox is saturated.
    pub async fn stop(&self) -> Result<(), RtError> {
        self.stop_reason(ExitReason::Normal).await
    }

    /// [`stop`](Pid::stop) with an explicit reason.
    pub async fn stop_reason(&self, reason: ExitReason) -> Result<(), RtError> {
        self.send_sys(SysMsg::Stop(reason))?;
        self.exited().await;
        Ok(())
    }

    /// Send an exit signal to this process from itself.
    ///
    /// Self-signals terminate the process unconditionally, trap-exit or not.
    pub fn exit(&self, reason: ExitReason) -> Result<(), RtError> {
        self.send_sys(SysMsg::Exit(ExitMsg {
            from: None,
            reason,
            link: false,
        }))
    }

    /// Send an exit signal from this process to another.
    ///
    /// Subject to the receiver's trap-exit flag and the propagation rules;
    /// see [`ExitReason`].
    ///
    /// # Errors
    ///
    /// [`RtError::BadArg`] when `to` is this process (use
    /// [`exit`](Pid::exit)); send errors otherwise.
    pub fn exit_reason(&self, to: &Pid, reason: ExitReason) -> Result<(), RtError> {
        if self == to {
            return Err(RtError::BadArg("use exit() to signal the current process"));
        }
        to.send_sys(SysMsg::Exit(ExitMsg {
            from: Some(self.clone()),
            reason,
            link: false,
        }))
    }

    /// Snapshot the process's link set.
    pub async fn process_links(&self) -> Result<Vec<Pid>, RtError> {
        self.alive()?;

        let (tx, mut rx) = oneshot::channel();
        self.send_sys(SysMsg::GetLinks(tx))?;

        tokio::select! {
            biased;
            r = &mut rx => r.map_err(|_| RtError::NoProc),
            _ = self.exited() => rx.try_recv().map_err(|_| RtError::NoProc),
        }
    }
}
