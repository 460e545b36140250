//! Message dispatch boundary
//!
//! The server core never interprets messages itself; every decoded message
//! is handed to a [`Dispatcher`]. [`DefaultDispatcher`] provides the stock
//! semantics (echo, resource/tool/prompt lookups, unknown_type) and can be
//! wrapped or replaced entirely by the embedding application.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::managers::{PromptManager, ResourceManager, ToolManager};

/// Application boundary: turns one decoded message into at most one response.
///
/// Implementations own whatever shared state they need and are responsible
/// for synchronizing it; the server only ever calls `handle`. A returned
/// error is surfaced to the client as an error envelope and the connection
/// keeps serving.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Handle one decoded message; `None` means nothing is written this round.
    async fn handle(&self, message: Value) -> anyhow::Result<Option<Value>>;
}

/// Stock dispatcher over optional manager registries
#[derive(Default, Clone)]
pub struct DefaultDispatcher {
    resources: Option<Arc<ResourceManager>>,
    tools: Option<Arc<ToolManager>>,
    prompts: Option<Arc<PromptManager>>,
}

impl DefaultDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a resource registry
    pub fn with_resources(mut self, resources: Arc<ResourceManager>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Attach a tool registry
    pub fn with_tools(mut self, tools: Arc<ToolManager>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Attach a prompt registry
    pub fn with_prompts(mut self, prompts: Arc<PromptManager>) -> Self {
        self.prompts = Some(prompts);
        self
    }
}

#[async_trait]
impl Dispatcher for DefaultDispatcher {
    async fn handle(&self, message: Value) -> anyhow::Result<Option<Value>> {
        let response = match message.get("type").and_then(Value::as_str) {
            Some("echo") => {
                let payload = message.get("payload").cloned().unwrap_or(Value::Null);
                json!({"type": "echo", "payload": payload})
            }

            Some("resource") => match &self.resources {
                None => json!({"type": "error", "reason": "no_resources"}),
                Some(resources) => {
                    let name = required_str(&message, "name", "missing_or_invalid_name")?;
                    let resource = resources
                        .get(name)
                        .ok_or_else(|| anyhow::anyhow!("unknown_resource: {}", name))?;
                    json!({"type": "resource_response", "name": name, "resource": resource})
                }
            },

            Some("tool") => match &self.tools {
                None => json!({"type": "error", "reason": "no_tools"}),
                Some(tools) => {
                    let name = required_str(&message, "name", "missing_or_invalid_name")?;
                    let args = message.get("args").cloned().unwrap_or(Value::Null);
                    let result = tools.call(name, &args)?;
                    json!({"type": "tool_response", "name": name, "result": result})
                }
            },

            Some("prompt") => match &self.prompts {
                None => json!({"type": "error", "reason": "no_prompts"}),
                Some(prompts) => {
                    let prompt_id =
                        required_str(&message, "prompt_id", "missing_or_invalid_prompt_id")?;
                    let params = message.get("params").cloned().unwrap_or(Value::Null);
                    let text = prompts.render(prompt_id, &params)?;
                    json!({"type": "prompt_response", "prompt_id": prompt_id, "text": text})
                }
            },

            _ => json!({"type": "error", "reason": "unknown_type"}),
        };

        Ok(Some(response))
    }
}

/// Extract a required string field, failing with the given reason
fn required_str<'a>(message: &'a Value, field: &str, reason: &str) -> anyhow::Result<&'a str> {
    message
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("{}", reason))
}
