//! Per-load ambient state: namescope, root slot and lifecycle signaler.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::BuildError;
use crate::instance::Instance;

// ── Lifecycle ─────────────────────────────────────────────────────────────

/// Host hooks around instance construction. Both default to no-ops.
pub trait LifecycleListener {
    /// Called right after the instance is created, before any member is set.
    fn instance_created(&self, _instance: &Instance) {}

    /// Called once the instance and its whole subtree are built.
    fn instance_completed(&self, _instance: &Instance) {}
}

pub type SharedListener = Arc<dyn LifecycleListener + Send + Sync>;

/// Fans lifecycle notifications out to every registered listener, in
/// registration order.
#[derive(Clone, Default)]
pub struct InstanceLifecycleSignaler {
    listeners: Vec<SharedListener>,
}

impl InstanceLifecycleSignaler {
    pub fn new(listeners: Vec<SharedListener>) -> Self {
        Self { listeners }
    }

    pub fn add(&mut self, listener: SharedListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn created(&self, instance: &Instance) {
        log::trace!("created {:?}", instance);
        for listener in &self.listeners {
            listener.instance_created(instance);
        }
    }

    pub fn completed(&self, instance: &Instance) {
        for listener in &self.listeners {
            listener.instance_completed(instance);
        }
    }
}

impl fmt::Debug for InstanceLifecycleSignaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceLifecycleSignaler").field("listeners", &self.listeners.len()).finish()
    }
}

// ── Namescope ─────────────────────────────────────────────────────────────

/// Named instances of one load, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Namescope {
    names: IndexMap<String, Instance>,
}

impl Namescope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` as `name`. An existing name is never overwritten.
    pub fn register(&mut self, name: impl Into<String>, instance: Instance) -> Result<(), BuildError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(BuildError::DuplicateName { name });
        }
        log::debug!("namescope: `{}` -> {:?}", name, instance);
        self.names.insert(name, instance);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.names.iter().map(|(n, i)| (n.as_str(), i))
    }
}

// ── BuildContext ──────────────────────────────────────────────────────────

/// State threaded through one construction pass. Create one per load.
#[derive(Debug, Default)]
pub struct BuildContext {
    pub namescope: Namescope,
    root: OnceCell<Instance>,
    pub signaler: InstanceLifecycleSignaler,
}

impl BuildContext {
    pub fn new(signaler: InstanceLifecycleSignaler) -> Self {
        Self { namescope: Namescope::new(), root: OnceCell::new(), signaler }
    }

    /// The first instance created in this pass, once there is one.
    pub fn root(&self) -> Option<&Instance> {
        self.root.get()
    }

    /// Fill the root slot. Returns `false` (and changes nothing) when it
    /// is already set.
    pub fn set_root(&self, instance: &Instance) -> bool {
        self.root.set(instance.clone()).is_ok()
    }

    pub(crate) fn into_namescope(self) -> Namescope {
        self.namescope
    }
}
