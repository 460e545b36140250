//! Named resource registry

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Registry of named resource values
#[derive(Default)]
pub struct ResourceManager {
    entries: RwLock<HashMap<String, Value>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under a name, replacing any previous entry
    pub fn register(&self, name: impl Into<String>, value: Value) {
        self.entries.write().insert(name.into(), value);
    }

    /// Fetch a resource by name
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    /// Names of all registered resources, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}
