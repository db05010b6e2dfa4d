//! Per-process state and the system-message protocol.
//!
//! [`ProcessContext`] travels with a process for its whole life: it owns the
//! link set and the trap-exit flag, exposes link/monitor operations to user
//! code (generic-server callbacks receive `&mut ProcessContext`), and
//! implements the exit-propagation rules applied to every system message.

// Layer 1: Standard library imports
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

// Layer 2: Third-party crate imports
use chrono::Utc;

// Layer 3: Internal module imports
use super::pid::Pid;
use crate::error::{ExitReason, RtError};
use crate::message::{ExitMsg, Info, MonitorDown, SysMsg};
use crate::tracer::{TraceEvent, Tracer};
use crate::util::Ref;

pub(crate) const TAG_HANDLE_SYS: &str = "HandleSysMsg";

/// An in-flight trace observation; see [`ProcessContext::trace_enter`].
pub(crate) struct TraceSpan {
    arg: String,
    started: Instant,
}

/// The process-side state of one running process.
pub struct ProcessContext {
    pid: Pid,
    trap_exit: bool,
    links: Vec<Pid>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl ProcessContext {
    pub(crate) fn new(pid: Pid, tracer: Option<Arc<dyn Tracer>>) -> Self {
        Self {
            pid,
            trap_exit: false,
            links: Vec::new(),
            tracer,
        }
    }

    /// Handle of the process this context belongs to.
    pub fn self_pid(&self) -> &Pid {
        &self.pid
    }

    /// Redirect inbound exit signals to the user mailbox as
    /// [`Info::Exit`] messages instead of terminating this process.
    ///
    /// `kill` signals and self-signals still terminate unconditionally.
    pub fn set_trap_exit(&mut self, flag: bool) {
        self.trap_exit = flag;
    }

    /// Whether this process traps exits.
    pub fn trap_exit(&self) -> bool {
        self.trap_exit
    }

    /// Produce a fresh unique reference.
    ///
    /// # Errors
    ///
    /// [`RtError::NilPid`] when the owning environment is gone.
    pub fn make_ref(&self) -> Result<Ref, RtError> {
        self.pid.make_ref()
    }

    /// Link this process to `peer`.
    ///
    /// The link is recorded locally and mirrored on the peer through its
    /// system channel. If the peer is already gone, an exit signal with
    /// reason `no_proc` is queued to this process instead, exactly as if
    /// the freshly linked peer had died.
    pub fn link(&mut self, peer: &Pid) {
        if !self.add_link(peer) {
            return;
        }
        if peer.send_sys(SysMsg::Link(self.pid.clone())).is_err() {
            let _ = self.pid.send_sys(SysMsg::Exit(ExitMsg {
                from: Some(peer.clone()),
                reason: ExitReason::NoProc,
                link: true,
            }));
        }
    }

    /// Remove the link to `peer`, on both sides. Idempotent.
    pub fn unlink(&mut self, peer: &Pid) {
        if self.remove_link(peer) {
            let _ = peer.send_sys(SysMsg::Unlink(self.pid.clone()));
        }
    }

    /// Start monitoring `target`.
    ///
    /// When `target` dies this process receives one
    /// [`Info::MonitorDown`] carrying the returned reference. Monitoring an
    /// already-dead process delivers the notification immediately with
    /// reason `no_proc`.
    ///
    /// # Errors
    ///
    /// [`RtError::NilPid`] when the owning environment is gone.
    pub fn monitor(&self, target: &Pid) -> Result<Ref, RtError> {
        let reference = self.make_ref()?;

        match target.monitor_me(reference, self.pid.clone()) {
            Ok(()) => {
                self.pid.add_monitor_by_me(reference, target.clone());
            }
            Err(_) => {
                self.pid.deliver_monitor_down(MonitorDown {
                    reference,
                    from: target.clone(),
                    reason: ExitReason::NoProc,
                });
            }
        }

        Ok(reference)
    }

    /// Stop monitoring the process watched under `reference`. Idempotent.
    pub fn demonitor(&self, reference: Ref) {
        if let Some(target) = self.pid.remove_monitor_by_me(reference) {
            target.demonitor_me(reference);
        }
    }

    /// The tracer attached at spawn time, if any.
    pub fn tracer(&self) -> Option<&Arc<dyn Tracer>> {
        self.tracer.as_ref()
    }

    // ------------------------------------------------------------------
    // system-message protocol
    // ------------------------------------------------------------------

    /// Apply one system message.
    ///
    /// `Err(reason)` means the process must terminate with that reason.
    pub(crate) fn handle_sys_msg(&mut self, msg: SysMsg) -> Result<(), ExitReason> {
        let span = self.trace_enter(TAG_HANDLE_SYS, &msg);
        let result = self.dispatch_sys(msg);
        self.trace_exit(span, TAG_HANDLE_SYS, &result);
        result
    }

    fn dispatch_sys(&mut self, msg: SysMsg) -> Result<(), ExitReason> {
        match msg {
            SysMsg::Link(peer) => {
                self.add_link(&peer);
                Ok(())
            }
            SysMsg::Unlink(peer) => {
                self.remove_link(&peer);
                Ok(())
            }
            SysMsg::Exit(exit) => self.handle_exit(exit),
            SysMsg::GetLinks(reply) => {
                let _ = reply.send(self.links.clone());
                Ok(())
            }
            SysMsg::Stop(reason) => Err(reason),
        }
    }

    /// The exit-propagation rules.
    ///
    /// | reason   | trap? | action                              |
    /// |----------|-------|-------------------------------------|
    /// | `normal` | no    | ignore (terminate when self-signal) |
    /// | `normal` | yes   | forward as [`Info::Exit`]           |
    /// | `kill`   | any   | terminate with `killed`             |
    /// | other    | no    | terminate with the reason           |
    /// | other    | yes   | forward as [`Info::Exit`]           |
    fn handle_exit(&mut self, exit: ExitMsg) -> Result<(), ExitReason> {
        let was_linked = match (&exit.from, exit.link) {
            (Some(from), true) => self.remove_link(from),
            _ => false,
        };

        // drop link-teardown exits from processes we never linked
        if exit.link && !was_linked {
            return Ok(());
        }

        let from_self = exit.from.is_none();

        if !from_self && exit.reason.is_normal() && !self.trap_exit {
            return Ok(());
        }

        if !from_self && !exit.reason.is_kill() && self.trap_exit {
            let _ = self.pid.send_info_raw(Info::Exit {
                from: exit.from,
                reason: exit.reason,
            });
            return Ok(());
        }

        Err(exit.reason.propagates_as())
    }

    fn add_link(&mut self, peer: &Pid) -> bool {
        if *peer == self.pid || self.links.contains(peer) {
            return false;
        }
        self.links.push(peer.clone());
        true
    }

    fn remove_link(&mut self, peer: &Pid) -> bool {
        match self.links.iter().position(|p| p == peer) {
            Some(index) => {
                self.links.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_links(&mut self) -> Vec<Pid> {
        std::mem::take(&mut self.links)
    }

    // ------------------------------------------------------------------
    // tracing
    // ------------------------------------------------------------------

    pub(crate) fn trace_enter(&self, tag: &'static str, arg: &dyn Debug) -> Option<TraceSpan> {
        let tracer = self.tracer.as_ref()?;
        let span = TraceSpan {
            arg: format!("{arg:?}"),
            started: Instant::now(),
        };
        tracer.event(&TraceEvent::Call {
            pid: self.pid.to_string(),
            time: Utc::now(),
            tag,
            arg: span.arg.clone(),
        });
        Some(span)
    }

    pub(crate) fn trace_exit(&self, span: Option<TraceSpan>, tag: &'static str, result: &dyn Debug) {
        let (Some(span), Some(tracer)) = (span, self.tracer.as_ref()) else {
            return;
        };
        tracer.event(&TraceEvent::CallResult {
            pid: self.pid.to_string(),
            time: Utc::now(),
            tag,
            arg: span.arg,
            result: format!("{result:?}"),
            duration: span.started.elapsed(),
        });
    }
}
