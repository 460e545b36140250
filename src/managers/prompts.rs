//! Prompt template registry
//!
//! Templates carry `{placeholder}` markers filled from a JSON object of
//! parameters at render time. Every placeholder must be supplied; string
//! parameters are inserted verbatim, anything else as compact JSON.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap());

/// Registry of named prompt templates
#[derive(Default)]
pub struct PromptManager {
    entries: RwLock<HashMap<String, String>>,
}

impl PromptManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under an id, replacing any previous entry
    pub fn register(&self, id: impl Into<String>, template: impl Into<String>) {
        self.entries.write().insert(id.into(), template.into());
    }

    /// Render a template with the given parameters.
    ///
    /// Fails on an unknown id and on any placeholder without a matching
    /// parameter. A non-object `params` value counts as no parameters.
    pub fn render(&self, id: &str, params: &Value) -> anyhow::Result<String> {
        let template = self
            .entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown_prompt: {}", id))?;

        let empty = serde_json::Map::new();
        let params = params.as_object().unwrap_or(&empty);

        for caps in PLACEHOLDER.captures_iter(&template) {
            let key = &caps[1];
            if !params.contains_key(key) {
                anyhow::bail!("missing_parameter: {}", key);
            }
        }

        let rendered = PLACEHOLDER.replace_all(&template, |caps: &regex::Captures| {
            match params.get(&caps[1]) {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(), // every placeholder was checked above
            }
        });
        Ok(rendered.into_owned())
    }

    /// Ids of all registered templates, sorted
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
