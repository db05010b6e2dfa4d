//! Spawn-time configuration.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::pid::Pid;
use crate::tracer::Tracer;

/// Default user mailbox capacity.
pub const DEFAULT_USR_CHAN_SIZE: usize = 16;

/// Default system mailbox capacity.
pub const DEFAULT_SYS_CHAN_SIZE: usize = 8;

/// Options for spawning a process.
///
/// Built fluently; every option has a default. A `name` (optionally scoped
/// by a `prefix`) registers the process atomically with its creation.
///
/// # Example
/// ```rust
/// use proclet_rt::SpawnOpts;
///
/// let opts = SpawnOpts::new()
///     .with_name("worker")
///     .with_prefix("pool-a")
///     .with_usr_channel_size(64);
/// assert_eq!(opts.name(), Some("worker"));
/// assert_eq!(opts.prefix(), Some("pool-a"));
/// ```
#[derive(Clone, Default)]
pub struct SpawnOpts {
    name: Option<String>,
    prefix: Option<String>,
    usr_chan_size: Option<usize>,
    sys_chan_size: Option<usize>,
    link_to: Option<Pid>,
    return_pid_if_registered: bool,
    tracer: Option<Arc<dyn Tracer>>,
}

impl SpawnOpts {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process under `name` at spawn time.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Scope the registered name under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Capacity of the user mailbox (default 16).
    pub fn with_usr_channel_size(mut self, size: usize) -> Self {
        self.usr_chan_size = Some(size);
        self
    }

    /// Capacity of the system mailbox (default 8).
    pub fn with_sys_channel_size(mut self, size: usize) -> Self {
        self.sys_chan_size = Some(size);
        self
    }

    /// Link the new process to `pid` as part of the spawn.
    pub fn with_link_to(mut self, pid: Pid) -> Self {
        self.link_to = Some(pid);
        self
    }

    /// Spawn-or-locate: when the name is already registered, return the
    /// existing pid instead of failing with `already_registered`. Requires a
    /// name.
    pub fn with_spawn_or_locate(mut self) -> Self {
        self.return_pid_if_registered = true;
        self
    }

    /// Attach a tracer observing every callback of the process.
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// The configured name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The configured prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Effective user mailbox capacity.
    pub fn usr_chan_size(&self) -> usize {
        self.usr_chan_size.unwrap_or(DEFAULT_USR_CHAN_SIZE)
    }

    /// Effective system mailbox capacity.
    pub fn sys_chan_size(&self) -> usize {
        self.sys_chan_size.unwrap_or(DEFAULT_SYS_CHAN_SIZE)
    }

    pub(crate) fn link_to(&self) -> Option<&Pid> {
        self.link_to.as_ref()
    }

    pub(crate) fn return_pid_if_registered(&self) -> bool {
        self.return_pid_if_registered
    }

    pub(crate) fn tracer(&self) -> Option<&Arc<dyn Tracer>> {
        self.tracer.as_ref()
    }
}

impl fmt::Debug for SpawnOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnOpts")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("usr_chan_size", &self.usr_chan_size())
            .field("sys_chan_size", &self.sys_chan_size())
            .field("link_to", &self.link_to)
            .field("return_pid_if_registered", &self.return_pid_if_registered)
            .field("tracer", &self.tracer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SpawnOpts::new();
        assert_eq!(opts.name(), None);
        assert_eq!(opts.prefix(), None);
        assert_eq!(opts.usr_chan_size(), DEFAULT_USR_CHAN_SIZE);
        assert_eq!(opts.sys_chan_size(), DEFAULT_SYS_CHAN_SIZE);
        assert!(!opts.return_pid_if_registered());
        assert!(opts.link_to().is_none());
        assert!(opts.tracer().is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let opts = SpawnOpts::new()
            .with_name("svc")
            .with_prefix("g1")
            .with_usr_channel_size(32)
            .with_sys_channel_size(4)
            .with_spawn_or_locate();

        assert_eq!(opts.name(), Some("svc"));
        assert_eq!(opts.prefix(), Some("g1"));
        assert_eq!(opts.usr_chan_size(), 32);
        assert_eq!(opts.sys_chan_size(), 4);
        assert!(opts.return_pid_if_registered());
    }

    #[test]
    fn test_debug_does_not_dump_tracer() {
        let opts = SpawnOpts::new().with_name("svc");
        let debug = format!("{opts:?}");
        assert!(debug.contains("svc"));
        assert!(debug.contains("tracer"));
    }
}
