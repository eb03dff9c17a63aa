//! Name-keyed registries for components and pipelines.
//!
//! A [`Registry`] is the sole owner of every handle it holds. Keys are kept
//! in sorted order so listings are stable between calls.

use crate::component::BuiltinComponent;
use crate::pipeline::Pipeline;
use std::collections::BTreeMap;

/// Ordered name → handle map.
#[derive(Debug)]
pub struct Registry<T> {
    entries: BTreeMap<String, T>,
}

pub type ComponentRegistry = Registry<BuiltinComponent>;
pub type PipelineRegistry = Registry<Pipeline>;

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)
    }

    /// Insert a new handle. Returns the handle back if the name is taken.
    pub fn insert(&mut self, name: &str, handle: T) -> Result<(), T> {
        if self.entries.contains_key(name) {
            return Err(handle);
        }
        self.entries.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        self.entries.remove(name)
    }

    /// Snapshot of every name, independent of later mutation
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut registry = Registry::new();
        assert!(registry.insert("a", 1).is_ok());
        assert_eq!(registry.insert("a", 2), Err(2));
        assert_eq!(registry.get("a"), Some(&1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_snapshot_is_sorted_and_detached() {
        let mut registry = Registry::new();
        registry.insert("zeta", ()).unwrap();
        registry.insert("alpha", ()).unwrap();

        let names = registry.names();
        registry.remove("alpha");

        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(registry.names(), vec!["zeta".to_string()]);
    }
}
