//! Name registry state.
//!
//! One instance per environment, behind the environment's `RwLock`. Holds
//! the flat and prefix-scoped name maps plus the monitor bookkeeping that
//! ties every registered pid to exactly one monitor reference: when the pid
//! dies, one purge removes every name it held.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::environment::EnvShared;
use crate::error::RtError;
use crate::process::Pid;
use crate::util::Ref;

/// Rebuild the name maps after this many registrations to shed tombstone
/// capacity under heavy name churn.
const ROTATE_EVERY: u64 = 10_000;

/// One monitored pid's registration record.
struct RefReg {
    reference: Ref,
    /// Every (prefix, name) the pid is registered under.
    names: Vec<(Option<String>, String)>,
}

/// Registry state; see the module docs.
#[derive(Default)]
pub(crate) struct RegState {
    pub(crate) next_pid: u64,
    reg_name: HashMap<String, Pid>,
    reg_prefix: HashMap<String, HashMap<String, Pid>>,
    by_ref: HashMap<Ref, Pid>,
    by_pid: HashMap<Pid, RefReg>,
    registrations: u64,
}

impl RegState {
    /// Look a name up, optionally under a prefix.
    pub(crate) fn lookup(&self, prefix: Option<&str>, name: &str) -> Option<Pid> {
        match prefix {
            None => self.reg_name.get(name).cloned(),
            Some(prefix) => self
                .reg_prefix
                .get(prefix)
                .and_then(|names| names.get(name))
                .cloned(),
        }
    }

    /// Copy of the name map under `prefix`.
    pub(crate) fn whereare(&self, prefix: &str) -> Result<HashMap<String, Pid>, RtError> {
        self.reg_prefix
            .get(prefix)
            .cloned()
            .ok_or(RtError::NotReg)
    }

    /// Register `pid` under `(prefix, name)` and make sure one monitor
    /// covers it.
    ///
    /// # Errors
    ///
    /// [`RtError::AlreadyReg`] when the slot is taken.
    pub(crate) fn register(
        &mut self,
        prefix: Option<&str>,
        name: &str,
        pid: Pid,
        shared: &EnvShared,
    ) -> Result<(), RtError> {
        let slot_taken = self.lookup(prefix, name).is_some();
        if slot_taken {
            return Err(RtError::AlreadyReg);
        }

        match prefix {
            None => {
                self.reg_name.insert(name.to_owned(), pid.clone());
            }
            Some(prefix) => {
                self.reg_prefix
                    .entry(prefix.to_owned())
                    .or_default()
                    .insert(name.to_owned(), pid.clone());
            }
        }

        if !self.monitor_pid(&pid, prefix, name, shared) {
            // the pid died before the monitor latched; undo, the name was
            // never observably reachable
            self.remove_name(prefix, name);
            return Ok(());
        }

        self.registrations += 1;
        if self.registrations % ROTATE_EVERY == 0 {
            self.rotate();
        }

        Ok(())
    }

    /// Unregister `(prefix, name)`; drop the pid's monitor when this was
    /// its last name.
    ///
    /// # Errors
    ///
    /// [`RtError::NotReg`] when the slot is empty.
    pub(crate) fn unregister(&mut self, prefix: Option<&str>, name: &str) -> Result<(), RtError> {
        let pid = self.lookup(prefix, name).ok_or(RtError::NotReg)?;
        self.remove_name(prefix, name);
        self.demonitor_name(&pid, prefix, name, shared_registrar(&pid));
        Ok(())
    }

    /// Remove every registration of the pid monitored under `reference`.
    /// Idempotent; invoked from the registrar's monitor-down hook.
    pub(crate) fn purge_by_ref(&mut self, reference: Ref) {
        let Some(pid) = self.by_ref.remove(&reference) else {
            return;
        };
        if let Some(reg) = self.by_pid.remove(&pid) {
            for (prefix, name) in reg.names {
                self.remove_name(prefix.as_deref(), &name);
            }
        }
    }

    fn remove_name(&mut self, prefix: Option<&str>, name: &str) {
        match prefix {
            None => {
                self.reg_name.remove(name);
            }
            Some(prefix) => {
                if let Some(names) = self.reg_prefix.get_mut(prefix) {
                    names.remove(name);
                }
            }
        }
    }

    /// Install the registrar's monitor on `pid` if this is its first name;
    /// append the name to its record. Returns false when the pid is already
    /// dead.
    fn monitor_pid(
        &mut self,
        pid: &Pid,
        prefix: Option<&str>,
        name: &str,
        shared: &EnvShared,
    ) -> bool {
        let entry = (prefix.map(str::to_owned), name.to_owned());

        if let Some(reg) = self.by_pid.get_mut(pid) {
            reg.names.push(entry);
            return true;
        }

        let reference = shared.make_ref();
        let Some(registrar) = shared.registrar() else {
            return false;
        };
        if pid.monitor_me(reference, registrar.clone()).is_err() {
            return false;
        }
        registrar.add_monitor_by_me(reference, pid.clone());

        self.by_ref.insert(reference, pid.clone());
        self.by_pid.insert(
            pid.clone(),
            RefReg {
                reference,
                names: vec![entry],
            },
        );
        true
    }

    fn demonitor_name(&mut self, pid: &Pid, prefix: Option<&str>, name: &str, registrar: Option<Pid>) {
        let Some(reg) = self.by_pid.get_mut(pid) else {
            return;
        };

        if let Some(index) = reg
            .names
            .iter()
            .position(|(p, n)| p.as_deref() == prefix && n == name)
        {
            reg.names.swap_remove(index);
        }

        if reg.names.is_empty() {
            let reference = reg.reference;
            self.by_ref.remove(&reference);
            self.by_pid.remove(pid);
            if let Some(registrar) = registrar {
                registrar.remove_monitor_by_me(reference);
            }
            pid.demonitor_me(reference);
        }
    }

    /// Rebuild the name maps into fresh allocations of the same content.
    fn rotate(&mut self) {
        self.reg_name = std::mem::take(&mut self.reg_name).into_iter().collect();
        self.reg_prefix = std::mem::take(&mut self.reg_prefix)
            .into_iter()
            .map(|(prefix, names)| (prefix, names.into_iter().collect()))
            .collect();
        self.by_ref = std::mem::take(&mut self.by_ref).into_iter().collect();
    }
}

fn shared_registrar(pid: &Pid) -> Option<Pid> {
    pid.env_shared().ok().and_then(|shared| shared.registrar().cloned())
}
