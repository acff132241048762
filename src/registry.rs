use alloc::vec::Vec;

use log::*;

use crate::debug_target::DebugTarget;
use crate::target::Target;

/// The set of targets known to the host, and the one currently selected.
pub struct TargetRegistry<T: Target> {
    targets: Vec<DebugTarget<T>>,
    current: Option<usize>,
}

impl<T: Target> Default for TargetRegistry<T> {
    fn default() -> Self {
        TargetRegistry::new()
    }
}

impl<T: Target> TargetRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        TargetRegistry {
            targets: Vec::new(),
            current: None,
        }
    }

    /// Register a target.
    ///
    /// A target with the same name is replaced (and returned). The first
    /// target to be registered becomes the current target.
    pub fn insert(&mut self, target: DebugTarget<T>) -> Option<DebugTarget<T>> {
        match self.position(target.name()) {
            Some(idx) => {
                debug!("replacing target {}", target.name());
                Some(core::mem::replace(&mut self.targets[idx], target))
            }
            None => {
                debug!("adding target {}", target.name());
                self.targets.push(target);
                if self.current.is_none() {
                    self.current = Some(self.targets.len() - 1);
                }
                None
            }
        }
    }

    /// Unregister a target.
    ///
    /// If it was the current target, no target is selected afterwards.
    pub fn remove(&mut self, name: &str) -> Option<DebugTarget<T>> {
        let idx = self.position(name)?;
        self.current = match self.current {
            Some(cur) if cur == idx => None,
            Some(cur) if cur > idx => Some(cur - 1),
            cur => cur,
        };
        Some(self.targets.remove(idx))
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<&DebugTarget<T>> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// Look up a target by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DebugTarget<T>> {
        self.targets.iter_mut().find(|t| t.name() == name)
    }

    /// Select the current target. Returns `false` if no such target exists.
    pub fn set_current(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.current = Some(idx);
                true
            }
            None => {
                warn!("no target named {}", name);
                false
            }
        }
    }

    /// The currently selected target.
    pub fn current(&self) -> Option<&DebugTarget<T>> {
        self.targets.get(self.current?)
    }

    /// The currently selected target.
    pub fn current_mut(&mut self) -> Option<&mut DebugTarget<T>> {
        self.targets.get_mut(self.current?)
    }

    /// All targets, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DebugTarget<T>> {
        self.targets.iter()
    }

    /// Names of all targets, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name())
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if no targets are registered.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.targets.iter().position(|t| t.name() == name)
    }
}
