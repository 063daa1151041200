//! Shared types used across b3 modules
//!
//! Contains the conversation parts exchanged with the model service, the
//! call request/response pair, and capability declarations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments of a call request, as decoded from the model
pub type Arguments = Map<String, Value>;

/// A call issued by the model instead of (or alongside) text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Name of the capability to invoke
    pub name: String,
    /// Correlation id chosen by the model service
    #[serde(default)]
    pub id: String,
    /// Decoded arguments
    #[serde(default)]
    pub arguments: Arguments,
}

impl CallRequest {
    /// Create a new call request
    pub fn new(name: impl Into<String>, id: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            id: id.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Result payload of a capability call.
///
/// Holds either an `"output"` or an `"error"` key. The two are exclusive by
/// convention only; nothing validates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(pub Map<String, Value>);

impl Payload {
    /// Successful payload
    pub fn output(value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert("output".to_string(), value.into());
        Self(map)
    }

    /// Failed payload, fed back to the model as data
    pub fn error(message: impl std::fmt::Display) -> Self {
        let mut map = Map::new();
        map.insert("error".to_string(), Value::String(message.to_string()));
        Self(map)
    }

    pub fn is_error(&self) -> bool {
        self.0.contains_key("error")
    }

    pub fn get_output(&self) -> Option<&Value> {
        self.0.get("output")
    }

    pub fn get_error(&self) -> Option<&str> {
        self.0.get("error").and_then(|v| v.as_str())
    }
}

/// The engine's reply to a [`CallRequest`]; `id` and `name` mirror the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub id: String,
    pub name: String,
    pub payload: Payload,
}

impl CallResponse {
    /// Correlate a payload with the request that produced it
    pub fn reply_to(request: &CallRequest, payload: Payload) -> Self {
        Self {
            id: request.id.clone(),
            name: request.name.clone(),
            payload,
        }
    }
}

/// Binary attachment with a declared media type
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One unit of content exchanged with the model
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Blob(Blob),
    Call(CallRequest),
    Response(CallResponse),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn blob(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Part::Blob(Blob {
            mime_type: mime_type.into(),
            data,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallRequest> {
        match self {
            Part::Call(c) => Some(c),
            _ => None,
        }
    }
}

/// Final content of an exchange
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Concatenate all text fragments, one per line
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One turn of model output.
///
/// A turn without call requests is terminal (a text turn); any call request
/// makes it a call turn that the engine must resolve.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Turn {
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Convenience constructor for a text-only turn
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Part::text(text)])
    }

    /// Convenience constructor for a turn carrying a single call
    pub fn call(name: impl Into<String>, id: impl Into<String>, arguments: Value) -> Self {
        Self::new(vec![Part::Call(CallRequest::new(name, id, arguments))])
    }

    pub fn is_terminal(&self) -> bool {
        !self.parts.iter().any(|p| matches!(p, Part::Call(_)))
    }

    pub fn calls(&self) -> impl Iterator<Item = &CallRequest> {
        self.parts.iter().filter_map(Part::as_call)
    }

    pub fn into_content(self) -> Content {
        Content::new(self.parts)
    }
}

/// Schema telling the model how to call a capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// Schema for the parameters (absent for argument-less capabilities)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// Optional hint on the result type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl CapabilityDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
            response: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_classification() {
        assert!(Turn::text("done").is_terminal());
        assert!(Turn::default().is_terminal());

        let turn = Turn::new(vec![
            Part::text("looking"),
            Part::Call(CallRequest::new("ListFiles", "1", json!({}))),
        ]);
        assert!(!turn.is_terminal());
        assert_eq!(turn.calls().count(), 1);
    }

    #[test]
    fn test_payload_shapes() {
        let ok = Payload::output(json!(["a", "b"]));
        assert!(!ok.is_error());
        assert_eq!(ok.get_output(), Some(&json!(["a", "b"])));

        let err = Payload::error("file not found");
        assert!(err.is_error());
        assert_eq!(err.get_error(), Some("file not found"));
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({"error": "file not found"}));
    }

    #[test]
    fn test_reply_mirrors_request() {
        let req = CallRequest::new("ReadFile", "call-7", json!({"file_id": "x"}));
        let resp = CallResponse::reply_to(&req, Payload::output("text"));
        assert_eq!(resp.id, "call-7");
        assert_eq!(resp.name, "ReadFile");
    }

    #[test]
    fn test_non_object_arguments_are_empty() {
        let req = CallRequest::new("ListFiles", "1", json!(null));
        assert!(req.arguments.is_empty());
        assert_eq!(req.get_string("missing"), None);
    }

    #[test]
    fn test_content_text_joins_fragments() {
        let content = Content::new(vec![
            Part::text("first"),
            Part::blob("image/png", vec![1, 2]),
            Part::text("second"),
        ]);
        assert_eq!(content.text(), "first\nsecond");
        assert_eq!(Content::default().text(), "");
    }
}
