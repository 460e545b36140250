//! Wire dispatcher for rule messages
//!
//! Translates `{"type": "rule", ...}` requests into [`RuleStore`] queries and
//! hands everything else to a wrapped fallback dispatcher, so rule handling
//! layers on top of the stock message set instead of replacing it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatch::Dispatcher;
use crate::rules::store::RuleStore;

/// Dispatcher layering rule queries over an inner dispatcher
pub struct RuleDispatcher {
    store: Arc<RuleStore>,
    fallback: Arc<dyn Dispatcher>,
}

impl RuleDispatcher {
    pub fn new(store: Arc<RuleStore>, fallback: Arc<dyn Dispatcher>) -> Self {
        Self { store, fallback }
    }

    /// Shared store handle, for seeding facts after construction
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Handle one rule action. `None` means the action is not recognized
    /// here and the message should go to the fallback.
    fn handle_rule(&self, message: &Value) -> Option<Value> {
        let response = match str_field(message, "action")? {
            "descendants" => match str_field(message, "who") {
                Some(who) => json!({
                    "type": "rule_response",
                    "descendants": self.store.descendants_of(who),
                }),
                None => invalid("missing_or_invalid_who"),
            },
            "ancestors" => match str_field(message, "who") {
                Some(who) => json!({
                    "type": "rule_response",
                    "ancestors": self.store.ancestors_of(who),
                }),
                None => invalid("missing_or_invalid_who"),
            },
            "assign_role" => match (str_field(message, "role"), str_field(message, "who")) {
                (Some(role), Some(who)) => {
                    self.store.assign_role(role, who);
                    json!({"type": "rule_response", "assigned": true})
                }
                _ => invalid("missing_or_invalid_role_or_who"),
            },
            "has_role" => match (str_field(message, "role"), str_field(message, "who")) {
                (Some(role), Some(who)) => json!({
                    "type": "rule_response",
                    "has_role": self.store.has_role(role, who),
                }),
                _ => invalid("missing_or_invalid_role_or_who"),
            },
            _ => return None,
        };
        Some(response)
    }
}

#[async_trait]
impl Dispatcher for RuleDispatcher {
    async fn handle(&self, message: Value) -> anyhow::Result<Option<Value>> {
        if message.get("type").and_then(Value::as_str) == Some("rule") {
            if let Some(response) = self.handle_rule(&message) {
                return Ok(Some(response));
            }
        }
        self.fallback.handle(message).await
    }
}

fn str_field<'a>(message: &'a Value, key: &str) -> Option<&'a str> {
    message.get(key).and_then(Value::as_str)
}

/// Validation failures are ordinary responses, not dispatch failures
fn invalid(reason: &str) -> Value {
    json!({"type": "error", "reason": reason})
}
