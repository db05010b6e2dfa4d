//! Environments: process groups with pid allocation and a name registry.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use super::actor::RegistrarServer;
use super::registry::RegState;
use crate::error::RtError;
use crate::gen_server::run::run_server;
use crate::process::driver::Driver;
use crate::process::pid::Mailboxes;
use crate::process::{Pid, ProcResult, ProcessContext, SpawnOpts};
use crate::util::Ref;

/// Mailbox capacities of the registrar process.
const REGISTRAR_USR_CHAN_SIZE: usize = 1024;
const REGISTRAR_SYS_CHAN_SIZE: usize = 512;

static ENV_SEQ: AtomicU32 = AtomicU32::new(0);

/// State shared between the [`Env`] handle, its pids (weakly), and the
/// registrar process.
pub(crate) struct EnvShared {
    id: u32,
    ref_seq: AtomicU64,
    registrar: OnceLock<Pid>,
    pub(crate) registry: RwLock<RegState>,
}

impl EnvShared {
    /// Mint the next unique reference. Wait-free.
    pub(crate) fn make_ref(&self) -> Ref {
        Ref::new(self.id, self.ref_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    /// The registrar's pid (proc-id 0). `None` only mid-construction.
    pub(crate) fn registrar(&self) -> Option<&Pid> {
        self.registrar.get()
    }
}

/// Result of a pid allocation.
pub(crate) enum Allocated {
    /// A fresh process; the caller owns the mailbox receivers.
    New(Pid, Mailboxes),
    /// Spawn-or-locate hit an existing registration; no process created.
    Existing(Pid),
}

/// A group of processes.
///
/// Owns pid allocation, the name registry, and the reference generator.
/// Cloning is cheap and every clone addresses the same environment. The
/// registrar process (pid `<0.{env}.0>`) is started eagerly; user processes
/// get ids from 1 upward.
///
/// Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct Env {
    shared: Arc<EnvShared>,
}

impl Env {
    /// Create an environment and start its registrar.
    pub fn new() -> Self {
        let shared = Arc::new(EnvShared {
            id: ENV_SEQ.fetch_add(1, Ordering::Relaxed) + 1,
            ref_seq: AtomicU64::new(0),
            registrar: OnceLock::new(),
            registry: RwLock::new(RegState::default()),
        });

        let (pid, mailboxes) = Pid::new(
            0,
            shared.id,
            Arc::downgrade(&shared),
            REGISTRAR_USR_CHAN_SIZE,
            REGISTRAR_SYS_CHAN_SIZE,
        );

        // Names are purged on the dying process's task, so registry
        // consistency never depends on the registrar's mailbox capacity.
        let weak = Arc::downgrade(&shared);
        pid.set_monitor_down_hook(move |down| {
            if let Some(shared) = weak.upgrade() {
                if let Some(registrar) = shared.registrar() {
                    registrar.remove_monitor_by_me(down.reference);
                }
                shared.registry.write().purge_by_ref(down.reference);
            }
        });

        let _ = shared.registrar.set(pid.clone());

        let driver = Driver::new(ProcessContext::new(pid, None), mailboxes);
        let (init_tx, _init_rx) = oneshot::channel();
        tokio::spawn(run_server(
            RegistrarServer,
            driver,
            Box::new(()),
            init_tx,
            None,
        ));

        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<EnvShared>) -> Self {
        Self { shared }
    }

    /// The unique id of this environment.
    pub fn id(&self) -> u32 {
        self.shared.id
    }

    /// Mint a unique reference. Successive references are strictly
    /// increasing.
    pub fn make_ref(&self) -> Ref {
        self.shared.make_ref()
    }

    // ------------------------------------------------------------------
    // spawning
    // ------------------------------------------------------------------

    /// Spawn a raw process running `f` with default options.
    ///
    /// The loop receives `&mut Driver` and pulls messages with
    /// [`Driver::recv`](crate::process::Driver::recv); returning
    /// `Err(reason)` (or panicking) terminates the process with that
    /// reason.
    ///
    /// # Example
    /// ```rust,ignore
    /// let pid = env.spawn(|p| {
    ///     Box::pin(async move {
    ///         loop {
    ///             match p.recv().await? {
    ///                 Received::Call { req, mut reply } => { reply.reply("pong"); }
    ///                 _ => {}
    ///             }
    ///         }
    ///     })
    /// })?;
    /// ```
    pub fn spawn<F>(&self, f: F) -> Result<Pid, RtError>
    where
        F: for<'a> FnOnce(&'a mut Driver) -> BoxFuture<'a, ProcResult> + Send + 'static,
    {
        self.spawn_opts(f, SpawnOpts::new())
    }

    /// Spawn a raw process with explicit [`SpawnOpts`].
    pub fn spawn_opts<F>(&self, f: F, opts: SpawnOpts) -> Result<Pid, RtError>
    where
        F: for<'a> FnOnce(&'a mut Driver) -> BoxFuture<'a, ProcResult> + Send + 'static,
    {
        let link_to = opts.link_to().cloned();
        let tracer = opts.tracer().cloned();

        match self.alloc_pid(&opts)? {
            Allocated::Existing(pid) => Ok(pid),
            Allocated::New(pid, mailboxes) => {
                let driver = Driver::new(ProcessContext::new(pid.clone(), tracer), mailboxes);
                tokio::spawn(driver.run_process(f, link_to));
                Ok(pid)
            }
        }
    }

    /// Spawn a raw process linked to `parent`.
    pub fn spawn_link<F>(&self, parent: &Pid, f: F) -> Result<Pid, RtError>
    where
        F: for<'a> FnOnce(&'a mut Driver) -> BoxFuture<'a, ProcResult> + Send + 'static,
    {
        self.spawn_opts(f, SpawnOpts::new().with_link_to(parent.clone()))
    }

    /// Allocate the next pid, honoring name registration and
    /// spawn-or-locate.
    pub(crate) fn alloc_pid(&self, opts: &SpawnOpts) -> Result<Allocated, RtError> {
        if opts.return_pid_if_registered() && opts.name().is_none() {
            return Err(RtError::NameEmpty);
        }
        if matches!(opts.name(), Some("")) {
            return Err(RtError::NameEmpty);
        }
        if matches!(opts.prefix(), Some("")) {
            return Err(RtError::PrefixEmpty);
        }

        let mut registry = self.shared.registry.write();

        if let Some(name) = opts.name() {
            if let Some(existing) = registry.lookup(opts.prefix(), name) {
                return if opts.return_pid_if_registered() {
                    Ok(Allocated::Existing(existing))
                } else {
                    Err(RtError::AlreadyReg)
                };
            }
        }

        let id = registry.next_pid + 1;
        let (pid, mailboxes) = Pid::new(
            id,
            self.shared.id,
            Arc::downgrade(&self.shared),
            opts.usr_chan_size(),
            opts.sys_chan_size(),
        );

        if let Some(name) = opts.name() {
            registry.register(opts.prefix(), name, pid.clone(), &self.shared)?;
        }

        registry.next_pid = id;
        Ok(Allocated::New(pid, mailboxes))
    }

    // ------------------------------------------------------------------
    // registry lookups
    // ------------------------------------------------------------------

    /// Find the process registered under `name`.
    ///
    /// # Errors
    ///
    /// [`RtError::NameEmpty`] for an empty name, [`RtError::NotReg`] on a
    /// miss.
    pub fn whereis(&self, name: &str) -> Result<Pid, RtError> {
        if name.is_empty() {
            return Err(RtError::NameEmpty);
        }
        self.shared
            .registry
            .read()
            .lookup(None, name)
            .ok_or(RtError::NotReg)
    }

    /// Find the process registered under `(prefix, name)`.
    pub fn whereis_prefix(&self, prefix: &str, name: &str) -> Result<Pid, RtError> {
        if name.is_empty() {
            return Err(RtError::NameEmpty);
        }
        if prefix.is_empty() {
            return Err(RtError::PrefixEmpty);
        }
        self.shared
            .registry
            .read()
            .lookup(Some(prefix), name)
            .ok_or(RtError::NotReg)
    }

    /// Copy of every registration under `prefix`.
    ///
    /// # Errors
    ///
    /// [`RtError::PrefixEmpty`] for an empty prefix, [`RtError::NotReg`]
    /// for an unknown one.
    pub fn whereare(&self, prefix: &str) -> Result<HashMap<String, Pid>, RtError> {
        if prefix.is_empty() {
            return Err(RtError::PrefixEmpty);
        }
        self.shared.registry.read().whereare(prefix)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Pid {
    /// Register this process under `name` in its environment.
    ///
    /// The registrar monitors the process and removes the name
    /// automatically when it dies.
    ///
    /// # Errors
    ///
    /// [`RtError::NameEmpty`], [`RtError::AlreadyReg`], or
    /// [`RtError::NilPid`] when the environment is gone.
    pub fn register(&self, name: &str) -> Result<(), RtError> {
        self.register_in(None, name)
    }

    /// Remove the `name` registration.
    ///
    /// # Errors
    ///
    /// [`RtError::NameEmpty`], [`RtError::NotReg`], or [`RtError::NilPid`].
    pub fn unregister(&self, name: &str) -> Result<(), RtError> {
        self.unregister_in(None, name)
    }

    /// Register this process under `name`, scoped by `prefix`.
    pub fn register_prefix(&self, prefix: &str, name: &str) -> Result<(), RtError> {
        if prefix.is_empty() {
            return Err(RtError::PrefixEmpty);
        }
        self.register_in(Some(prefix), name)
    }

    /// Remove the `(prefix, name)` registration.
    pub fn unregister_prefix(&self, prefix: &str, name: &str) -> Result<(), RtError> {
        if prefix.is_empty() {
            return Err(RtError::PrefixEmpty);
        }
        self.unregister_in(Some(prefix), name)
    }

    fn register_in(&self, prefix: Option<&str>, name: &str) -> Result<(), RtError> {
        if name.is_empty() {
            return Err(RtError::NameEmpty);
        }
        let shared = self.env_shared()?;
        let mut registry = shared.registry.write();
        registry.register(prefix, name, self.clone(), &shared)
    }

    fn unregister_in(&self, prefix: Option<&str>, name: &str) -> Result<(), RtError> {
        if name.is_empty() {
            return Err(RtError::NameEmpty);
        }
        let shared = self.env_shared()?;
        let mut registry = shared.registry.write();
        registry.unregister(prefix, name)
    }
}
