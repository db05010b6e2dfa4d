//! Process handles.
//!
//! A [`Pid`] is the shared identity of one process: its id, the sending
//! halves of its two mailboxes, the exit signal, and the monitor tables.
//! Handles are cheap to clone; the receiving halves of the mailboxes are
//! owned exclusively by the process driver, which is also the only writer of
//! the exit signal.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::env::environment::EnvShared;
use crate::error::{ExitReason, RtError};
use crate::mailbox::{self, Mailbox, MailboxSender};
use crate::message::{Info, MonitorDown, SysMsg, UsrMsg};
use crate::util::Ref;

/// Hook invoked instead of mailbox delivery when a monitored process dies.
pub type MonitorDownHook = Arc<dyn Fn(&MonitorDown) + Send + Sync>;

/// Monitor bookkeeping, guarded by one per-process lock.
///
/// `dead` latches when the driver starts monitor fan-out; once latched no
/// new monitor can be installed, which is what makes the immediate
/// `no_proc` monitor-down for already-dead targets race-free.
#[derive(Default)]
struct MonitorTable {
    dead: bool,
    /// Ref -> observer: who watches this process.
    of_me: HashMap<Ref, Pid>,
    /// Ref -> observed: whom this process watches.
    by_me: HashMap<Ref, Pid>,
    down_hook: Option<MonitorDownHook>,
}

struct PidInner {
    id: u64,
    env_id: u32,
    env: Weak<EnvShared>,
    usr_tx: MailboxSender<UsrMsg>,
    sys_tx: MailboxSender<SysMsg>,
    exit: CancellationToken,
    monitors: Mutex<MonitorTable>,
}

/// The mailbox receivers handed to the process driver at spawn time.
pub(crate) struct Mailboxes {
    pub(crate) usr: Mailbox<UsrMsg>,
    pub(crate) sys: Mailbox<SysMsg>,
}

/// Shared handle to a process.
///
/// Compares equal iff `(env_id, id)` match; formats as `<0.{env}.{id}>`.
/// Cloning is an `Arc` bump. Dropping every clone does not stop the process;
/// use [`Pid::stop`](crate::process::Pid::stop) or exit signals for that.
#[derive(Clone)]
pub struct Pid {
    inner: Arc<PidInner>,
}

impl Pid {
    /// Create a process handle together with its mailbox receivers.
    pub(crate) fn new(
        id: u64,
        env_id: u32,
        env: Weak<EnvShared>,
        usr_chan_size: usize,
        sys_chan_size: usize,
    ) -> (Self, Mailboxes) {
        let (usr_tx, usr_rx) = mailbox::bounded(usr_chan_size);
        let (sys_tx, sys_rx) = mailbox::bounded(sys_chan_size);

        let pid = Self {
            inner: Arc::new(PidInner {
                id,
                env_id,
                env,
                usr_tx,
                sys_tx,
                exit: CancellationToken::new(),
                monitors: Mutex::new(MonitorTable::default()),
            }),
        };

        (
            pid,
            Mailboxes {
                usr: usr_rx,
                sys: sys_rx,
            },
        )
    }

    /// The process identifier within its environment.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The id of the owning environment.
    pub fn env_id(&self) -> u32 {
        self.inner.env_id
    }

    /// Check that the process has not exited.
    ///
    /// # Errors
    ///
    /// [`RtError::NoProc`] once the exit signal has fired.
    pub fn alive(&self) -> Result<(), RtError> {
        if self.inner.exit.is_cancelled() {
            Err(RtError::NoProc)
        } else {
            Ok(())
        }
    }

    /// Whether the process is still running.
    pub fn is_alive(&self) -> bool {
        !self.inner.exit.is_cancelled()
    }

    /// Suspend until the process exits. Returns immediately if it already
    /// has.
    pub async fn exited(&self) {
        self.inner.exit.cancelled().await;
    }

    /// Produce a fresh unique reference from the owning environment.
    ///
    /// # Errors
    ///
    /// [`RtError::NilPid`] when the environment has been torn down.
    pub fn make_ref(&self) -> Result<Ref, RtError> {
        Ok(self.env_shared()?.make_ref())
    }

    /// Non-owning handle to this process.
    pub fn downgrade(&self) -> WeakPid {
        WeakPid {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Install the monitor-down hook.
    ///
    /// When set, monitor-down notifications destined for this process are
    /// delivered by invoking the hook on the dying process's task instead of
    /// through the user mailbox. The registrar uses this to purge names
    /// without depending on mailbox capacity.
    pub fn set_monitor_down_hook(&self, hook: impl Fn(&MonitorDown) + Send + Sync + 'static) {
        self.inner.monitors.lock().down_hook = Some(Arc::new(hook));
    }

    // ------------------------------------------------------------------
    // crate-internal plumbing
    // ------------------------------------------------------------------

    pub(crate) fn env_shared(&self) -> Result<Arc<EnvShared>, RtError> {
        self.inner.env.upgrade().ok_or(RtError::NilPid)
    }

    pub(crate) fn usr_sender(&self) -> &MailboxSender<UsrMsg> {
        &self.inner.usr_tx
    }

    pub(crate) fn sys_sender(&self) -> &MailboxSender<SysMsg> {
        &self.inner.sys_tx
    }

    /// Fire the exit signal. Driver-only; idempotent.
    pub(crate) fn mark_exited(&self) {
        self.inner.exit.cancel();
    }

    /// Record `observer` as monitoring this process under `reference`.
    ///
    /// Fails with [`RtError::NoProc`] when this process is already past
    /// monitor fan-out, in which case the caller delivers the immediate
    /// `no_proc` monitor-down itself.
    pub(crate) fn monitor_me(&self, reference: Ref, observer: Pid) -> Result<(), RtError> {
        let mut table = self.inner.monitors.lock();
        if table.dead {
            return Err(RtError::NoProc);
        }
        table.of_me.insert(reference, observer);
        Ok(())
    }

    /// Remove a monitor on this process. Idempotent.
    pub(crate) fn demonitor_me(&self, reference: Ref) {
        self.inner.monitors.lock().of_me.remove(&reference);
    }

    /// Record that this process monitors `target` under `reference`.
    pub(crate) fn add_monitor_by_me(&self, reference: Ref, target: Pid) {
        self.inner.monitors.lock().by_me.insert(reference, target);
    }

    /// Drop the record of a monitor held by this process.
    pub(crate) fn remove_monitor_by_me(&self, reference: Ref) -> Option<Pid> {
        self.inner.monitors.lock().by_me.remove(&reference)
    }

    /// Latch the dead flag and notify every observer. Driver-only.
    ///
    /// Observers with a monitor-down hook are invoked inline; the rest get
    /// an [`Info::MonitorDown`] on their user channel, best effort - a full
    /// or closed mailbox drops the notification.
    pub(crate) fn fire_monitor_downs(&self, reason: &ExitReason) {
        let of_me = {
            let mut table = self.inner.monitors.lock();
            table.dead = true;
            table.by_me.clear();
            std::mem::take(&mut table.of_me)
        };

        for (reference, observer) in of_me {
            let down = MonitorDown {
                reference,
                from: self.clone(),
                reason: reason.clone(),
            };
            observer.deliver_monitor_down(down);
        }
    }

    /// Deliver a monitor-down notification to this (observer) process.
    pub(crate) fn deliver_monitor_down(&self, down: MonitorDown) {
        let hook = self.inner.monitors.lock().down_hook.clone();
        match hook {
            Some(hook) => hook(&down),
            None => {
                let _ = self
                    .usr_sender()
                    .try_send(UsrMsg::Info(Info::MonitorDown(down)));
            }
        }
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id && self.inner.env_id == other.inner.env_id
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.env_id.hash(state);
        self.inner.id.hash(state);
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}.{}>", self.inner.env_id, self.inner.id)
    }
}

// Pids read better as `<0.1.2>` than as a struct dump.
impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Non-owning process handle.
///
/// Useful for caches that must not keep process records alive. Upgrading
/// fails with [`RtError::NilPid`] once the last [`Pid`] clone is gone.
#[derive(Clone)]
pub struct WeakPid {
    inner: Weak<PidInner>,
}

impl WeakPid {
    /// Recover a strong handle.
    ///
    /// # Errors
    ///
    /// [`RtError::NilPid`] when the process records have been dropped.
    pub fn upgrade(&self) -> Result<Pid, RtError> {
        self.inner
            .upgrade()
            .map(|inner| Pid { inner })
            .ok_or(RtError::NilPid)
    }
}
