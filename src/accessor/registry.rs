use std::collections::BTreeMap;

use log::{debug, warn};

use super::AccessorBinding;

/// Host registry of synthesized binding definitions.
///
/// Population is idempotent and order independent: repeated scans of
/// overlapping package sets converge on the same registry, and existing
/// definitions are never mutated or overwritten.
#[derive(Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<String, AccessorBinding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AccessorBinding> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccessorBinding)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.as_str(), binding))
    }

    /// Inserts `binding` unless its name is taken. An equivalent existing
    /// binding is left alone; a conflicting one is kept and the insert is
    /// skipped with a warning. Returns whether the binding was inserted.
    pub fn try_insert(&mut self, binding: AccessorBinding) -> bool {
        match self.bindings.get(binding.name()) {
            None => {
                debug!("registered accessor binding '{}'", binding.name());
                self.bindings.insert(binding.name().to_string(), binding);
                true
            }
            Some(existing) if existing.is_equivalent(&binding) => {
                debug!("accessor binding '{}' is already registered", binding.name());
                false
            }
            Some(_) => {
                warn!(
                    "skipping accessor binding '{}': the name is already taken by a different binding",
                    binding.name()
                );
                false
            }
        }
    }
}
