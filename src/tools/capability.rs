//! Capability contract
//!
//! Anything the model can call: leaf tools and delegated agents alike.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{CallContext, ConversationLogger};
use crate::core::{Arguments, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;

/// A named unit of work the model may request
#[async_trait]
pub trait Capability: Send + Sync {
    /// Schema advertised to the model. Must be stable once started.
    fn declare(&self) -> CapabilityDeclaration;

    /// One-time initialization before the first call.
    ///
    /// A failure here aborts the owning agent's start.
    async fn start(
        &mut self,
        _ctx: &CallContext,
        _client: Arc<dyn ModelClient>,
        _logger: Arc<dyn ConversationLogger>,
    ) -> Result<()> {
        Ok(())
    }

    /// Perform the call.
    ///
    /// Every failure is reported in the payload; the engine resends it to the
    /// model as data.
    async fn call(&self, ctx: &CallContext, args: &Arguments) -> Payload;
}

/// Read a required string argument
pub fn string_arg<'a>(args: &'a Arguments, key: &str) -> std::result::Result<&'a str, String> {
    match args.get(key) {
        None => Err(format!("missing argument {:?}", key)),
        Some(value) => value
            .as_str()
            .ok_or_else(|| format!("invalid type for {:?}, got {}, expected string", key, value)),
    }
}

/// Read an optional string argument; `null` counts as absent
pub fn optional_string_arg<'a>(
    args: &'a Arguments,
    key: &str,
) -> std::result::Result<Option<&'a str>, String> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => string_arg(args, key).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_string_arg() {
        let a = args(json!({"question": "why?", "n": 3}));
        assert_eq!(string_arg(&a, "question").unwrap(), "why?");
        assert!(string_arg(&a, "n").unwrap_err().contains("expected string"));
        assert!(string_arg(&a, "other").unwrap_err().contains("missing"));
    }

    #[test]
    fn test_optional_string_arg() {
        let a = args(json!({"name": null, "description": "Passport"}));
        assert_eq!(optional_string_arg(&a, "name").unwrap(), None);
        assert_eq!(optional_string_arg(&a, "missing").unwrap(), None);
        assert_eq!(
            optional_string_arg(&a, "description").unwrap(),
            Some("Passport")
        );
    }
}
