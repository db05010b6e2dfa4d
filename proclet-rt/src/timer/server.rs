//! The timer server: one-shot and interval deliveries from a single
//! ordered table.

// Layer 1: Standard library imports
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::time::Instant;

// Layer 3: Internal module imports
use super::types::{CancelReq, SendAfterReq, SendIntervalReq, TimerEntry, TimerIndex, TimerKey};
use crate::env::Env;
use crate::error::RtError;
use crate::gen_server::{self, CallResult, CastResult, GenServer, InitResult};
use crate::message::{Info, ReplyTo, Term, TermBox};
use crate::process::{Pid, ProcessContext, SpawnOpts};
use crate::util::Ref;

/// Shortest armed timeout; due entries are drained instead of busy-waiting
/// on sub-clamp delays.
const MIN_TIMEOUT: Duration = Duration::from_micros(100);

/// Client handle to the environment's timer server.
///
/// The server is a named generic server; [`TimerServer::start`] is
/// spawn-or-locate, so every caller in an environment shares one instance.
///
/// Delivery guarantee: payloads are sent to the target's user mailbox with
/// a non-blocking send - a full mailbox drops that delivery. Interval
/// timers rearm relative to dispatch time (now + interval), so a stalled
/// timer server never produces a burst backlog.
///
/// # Example
/// ```rust,ignore
/// let timers = TimerServer::start(&env).await?;
/// let tick = timers.send_interval(30, &pid, Tick).await?;
/// // ...
/// timers.cancel(tick).await?;
/// ```
#[derive(Clone)]
pub struct TimerServer {
    pid: Pid,
}

impl TimerServer {
    /// Registered name of the timer server.
    pub const NAME: &'static str = "timer_server";

    /// Start the environment's timer server, or locate the running one.
    pub async fn start(env: &Env) -> Result<Self, RtError> {
        let opts = SpawnOpts::new()
            .with_name(Self::NAME)
            .with_spawn_or_locate();
        let pid = gen_server::start_opts(env, TimerGs::default(), (), opts).await?;
        Ok(Self { pid })
    }

    /// The timer server's pid.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Schedule one delivery of `msg` to `target` after `delay_ms`
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// [`RtError::BadArg`] for a zero delay; call errors when the timer
    /// server is down.
    pub async fn send_after<T: Term + Clone>(
        &self,
        delay_ms: u64,
        target: &Pid,
        msg: T,
    ) -> Result<Ref, RtError> {
        if delay_ms == 0 {
            return Err(RtError::BadArg("timer delay must be positive"));
        }
        let reply = self
            .pid
            .call(SendAfterReq {
                delay: Duration::from_millis(delay_ms),
                target: target.clone(),
                msg: Box::new(msg),
            })
            .await?;
        unwrap_ref(reply)
    }

    /// Schedule repeated delivery of `msg` to `target` every `every_ms`
    /// milliseconds.
    ///
    /// The timer server links itself to the target, so outstanding
    /// intervals are purged when the target dies.
    pub async fn send_interval<T: Term + Clone>(
        &self,
        every_ms: u64,
        target: &Pid,
        msg: T,
    ) -> Result<Ref, RtError> {
        if every_ms == 0 {
            return Err(RtError::BadArg("timer interval must be positive"));
        }
        let reply = self
            .pid
            .call(SendIntervalReq {
                every: Duration::from_millis(every_ms),
                target: target.clone(),
                msg: Box::new(msg),
            })
            .await?;
        unwrap_ref(reply)
    }

    /// Cancel a timer. Idempotent: cancelling an unknown or already-fired
    /// reference succeeds quietly.
    pub async fn cancel(&self, reference: Ref) -> Result<(), RtError> {
        self.pid.call(CancelReq { reference }).await?;
        Ok(())
    }
}

fn unwrap_ref(reply: TermBox) -> Result<Ref, RtError> {
    reply
        .downcast::<Ref>()
        .map(|reference| *reference)
        .map_err(|_| RtError::BadArg("unexpected timer server reply"))
}

/// Timer server state.
#[derive(Default)]
struct TimerGs {
    /// Ordered by (fire time, reference).
    timers: BTreeMap<TimerKey, TimerEntry>,
    /// Ref -> key index; also names the target for death purges.
    by_ref: HashMap<Ref, TimerIndex>,
}

impl TimerGs {
    fn insert(
        &mut self,
        reference: Ref,
        target: Pid,
        msg: Box<dyn crate::message::CloneTerm>,
        delay: Duration,
        interval: Option<Duration>,
    ) {
        let now = Instant::now();
        let key = TimerKey {
            when: now + delay,
            reference,
        };
        self.by_ref.insert(
            reference,
            TimerIndex {
                key,
                target: target.clone(),
            },
        );
        self.timers.insert(
            key,
            TimerEntry {
                target,
                msg,
                interval,
            },
        );
    }

    /// Dispatch every due entry, rearm intervals, and return the delay to
    /// the next fire time (zero when the table is empty, which leaves the
    /// inactivity timer disarmed).
    fn tick(&mut self) -> Duration {
        let now = Instant::now();

        while let Some((&key, _)) = self.timers.first_key_value() {
            if key.when > now {
                let until = key.when - now;
                return until.max(MIN_TIMEOUT);
            }

            let Some(entry) = self.timers.remove(&key) else {
                break;
            };

            // drop-on-full is the documented delivery guarantee
            let _ = entry.target.send_term(entry.msg.clone_term());

            match entry.interval {
                Some(every) => {
                    let key = TimerKey {
                        when: now + every,
                        reference: key.reference,
                    };
                    self.by_ref.insert(
                        key.reference,
                        TimerIndex {
                            key,
                            target: entry.target.clone(),
                        },
                    );
                    self.timers.insert(
                        key,
                        TimerEntry {
                            target: entry.target,
                            msg: entry.msg,
                            interval: entry.interval,
                        },
                    );
                }
                None => {
                    self.by_ref.remove(&key.reference);
                }
            }
        }

        Duration::ZERO
    }

    fn cancel(&mut self, reference: Ref) {
        if let Some(index) = self.by_ref.remove(&reference) {
            self.timers.remove(&index.key);
        }
    }

    /// Remove every timer aimed at `target`.
    fn purge_target(&mut self, target: &Pid) {
        let timers = &mut self.timers;
        self.by_ref.retain(|_, index| {
            if index.target == *target {
                timers.remove(&index.key);
                false
            } else {
                true
            }
        });
    }
}

#[async_trait]
impl GenServer for TimerGs {
    async fn init(&mut self, ctx: &mut ProcessContext, _args: TermBox) -> InitResult {
        // trap exits so dead interval targets surface as Info::Exit
        ctx.set_trap_exit(true);
        InitResult::Ok
    }

    async fn handle_call(
        &mut self,
        ctx: &mut ProcessContext,
        req: TermBox,
        _reply: &mut ReplyTo,
    ) -> CallResult {
        let req = match req.downcast::<SendAfterReq>() {
            Ok(after) => {
                let reference = match ctx.make_ref() {
                    Ok(reference) => reference,
                    Err(err) => return CallResult::Failure(err),
                };
                self.insert(reference, after.target, after.msg, after.delay, None);
                return CallResult::reply_timeout(reference, self.tick());
            }
            Err(req) => req,
        };

        let req = match req.downcast::<SendIntervalReq>() {
            Ok(interval) => {
                ctx.link(&interval.target);
                let reference = match ctx.make_ref() {
                    Ok(reference) => reference,
                    Err(err) => return CallResult::Failure(err),
                };
                self.insert(
                    reference,
                    interval.target,
                    interval.msg,
                    interval.every,
                    Some(interval.every),
                );
                return CallResult::reply_timeout(reference, self.tick());
            }
            Err(req) => req,
        };

        if let Ok(cancel) = req.downcast::<CancelReq>() {
            self.cancel(cancel.reference);
        }
        CallResult::reply_timeout((), self.tick())
    }

    async fn handle_info(&mut self, _ctx: &mut ProcessContext, info: Info) -> CastResult {
        if let Info::Exit {
            from: Some(target), ..
        } = info
        {
            self.purge_target(&target);
        }
        CastResult::NoReplyTimeout(self.tick())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Weak;

    #[derive(Debug, Clone, PartialEq)]
    struct Tick;

    fn target() -> (Pid, crate::process::pid::Mailboxes) {
        Pid::new(7, 1, Weak::new(), 8, 8)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_dispatches_due_entries() {
        let mut gs = TimerGs::default();
        let (pid, mut mb) = target();

        gs.insert(
            Ref::new(1, 1),
            pid.clone(),
            Box::new(Tick),
            Duration::from_millis(5),
            None,
        );
        assert!(!gs.tick().is_zero());
        assert!(mb.usr.try_recv().is_none());

        tokio::time::advance(Duration::from_millis(6)).await;
        assert!(gs.tick().is_zero()); // table drained
        assert!(mb.usr.try_recv().is_some());
        assert!(gs.by_ref.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_rearms_from_now() {
        let mut gs = TimerGs::default();
        let (pid, mut mb) = target();

        gs.insert(
            Ref::new(1, 1),
            pid.clone(),
            Box::new(Tick),
            Duration::from_millis(10),
            Some(Duration::from_millis(10)),
        );

        tokio::time::advance(Duration::from_millis(35)).await;
        let next = gs.tick();
        // one delivery, rearmed 10ms from dispatch, not three catch-ups
        assert!(mb.usr.try_recv().is_some());
        assert!(mb.usr.try_recv().is_none());
        assert!(!next.is_zero());
        assert_eq!(gs.timers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let mut gs = TimerGs::default();
        let (pid, _mb) = target();
        let reference = Ref::new(1, 1);

        gs.insert(
            reference,
            pid,
            Box::new(Tick),
            Duration::from_millis(10),
            None,
        );
        gs.cancel(reference);
        gs.cancel(reference);

        assert!(gs.timers.is_empty());
        assert!(gs.by_ref.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_target_drops_all_its_timers() {
        let mut gs = TimerGs::default();
        let (victim, _vmb) = target();
        let (other, _omb) = Pid::new(8, 1, Weak::new(), 8, 8);

        gs.insert(
            Ref::new(1, 1),
            victim.clone(),
            Box::new(Tick),
            Duration::from_millis(10),
            Some(Duration::from_millis(10)),
        );
        gs.insert(
            Ref::new(1, 2),
            other.clone(),
            Box::new(Tick),
            Duration::from_millis(10),
            None,
        );

        gs.purge_target(&victim);
        assert_eq!(gs.timers.len(), 1);
        assert_eq!(gs.by_ref.len(), 1);
    }
}
