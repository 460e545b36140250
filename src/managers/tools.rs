//! Named tool registry
//!
//! Tools are plain callables taking a JSON argument value and producing a
//! JSON result. Failures propagate to the dispatcher, which surfaces them
//! to the client as error envelopes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

type ToolFn = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// Registry of named callable tools
#[derive(Default)]
pub struct ToolManager {
    entries: RwLock<HashMap<String, ToolFn>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under a name, replacing any previous entry
    pub fn register<F>(&self, name: impl Into<String>, tool: F)
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.entries.write().insert(name.into(), Arc::new(tool));
    }

    /// Invoke a tool by name; unknown names are an error.
    ///
    /// The registry lock is released before the tool runs, so a tool may
    /// itself register or call other tools.
    pub fn call(&self, name: &str, args: &Value) -> anyhow::Result<Value> {
        let tool = self
            .entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown_tool: {}", name))?;
        tool(args)
    }

    /// Names of all registered tools, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}
