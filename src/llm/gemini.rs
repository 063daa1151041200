//! Google Gemini provider
//!
//! Talks to the Generative Language API `generateContent` endpoint. The API is
//! stateless, so [`GeminiSession`] keeps the `contents` history itself and
//! replays it on every send.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::{B3Error, CallRequest, Config, Part, Result, Turn};
use crate::llm::traits::{Facility, GenerationConfig, ModelClient, ModelSession};

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gemini.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini.api_key.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn create_session(
        &self,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Box<dyn ModelSession>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| B3Error::config("GEMINI_API_KEY not set"))?;

        debug!(model, tools = config.declarations.len(), "creating Gemini session");

        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            url: format!("{}/v1beta/models/{}:generateContent", self.base_url, model),
            api_key,
            model: model.to_string(),
            system_instruction: config.system_instruction.clone(),
            tools: tools_to_wire(&config),
            temperature: config.temperature,
            history: Vec::new(),
        }))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Stateful Gemini chat
pub struct GeminiSession {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    system_instruction: Option<String>,
    tools: Option<Value>,
    temperature: Option<f32>,
    history: Vec<Value>,
}

impl GeminiSession {
    fn request_body(&self, contents: &[Value]) -> Value {
        let mut body = json!({ "contents": contents });
        if let Some(ref instruction) = self.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        if let Some(ref tools) = self.tools {
            body["tools"] = tools.clone();
        }
        if let Some(temperature) = self.temperature {
            body["generationConfig"] = json!({ "temperature": temperature });
        }
        body
    }
}

#[async_trait]
impl ModelSession for GeminiSession {
    async fn send(&mut self, parts: Vec<Part>) -> Result<Turn> {
        let user = json!({
            "role": "user",
            "parts": parts.iter().map(part_to_wire).collect::<Vec<_>>(),
        });

        let mut contents = self.history.clone();
        contents.push(user.clone());
        let body = self.request_body(&contents);

        debug!(model = %self.model, history = self.history.len(), "sending Gemini request");

        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(B3Error::model(format!("Gemini API error ({}): {}", status, text)));
        }

        let response: Value = resp.json().await?;
        let model_content = response["candidates"][0]["content"].clone();

        // History only grows once the exchange succeeded.
        self.history.push(user);
        if model_content.is_object() {
            let mut model_content = model_content.clone();
            model_content["role"] = json!("model");
            self.history.push(model_content);
        }

        parse_turn(&response)
    }

    fn checkpoint(&self) -> usize {
        self.history.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        if checkpoint < self.history.len() {
            debug!(
                model = %self.model,
                dropped = self.history.len() - checkpoint,
                "rolling back Gemini history"
            );
            self.history.truncate(checkpoint);
        }
    }
}

/// Convert an internal part to the Gemini `parts` item
pub fn part_to_wire(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "text": text }),
        Part::Blob(blob) => json!({
            "inlineData": {
                "mimeType": blob.mime_type,
                "data": BASE64.encode(&blob.data),
            }
        }),
        Part::Call(call) => {
            let mut fc = json!({ "name": call.name, "args": call.arguments });
            if !call.id.is_empty() {
                fc["id"] = json!(call.id);
            }
            json!({ "functionCall": fc })
        }
        Part::Response(resp) => {
            let mut fr = json!({ "name": resp.name, "response": resp.payload });
            if !resp.id.is_empty() {
                fr["id"] = json!(resp.id);
            }
            json!({ "functionResponse": fr })
        }
    }
}

/// Build the `tools` section: function declarations plus enabled facilities
pub fn tools_to_wire(config: &GenerationConfig) -> Option<Value> {
    let mut tools = Vec::new();

    if !config.declarations.is_empty() {
        let declarations: Vec<Value> = config
            .declarations
            .iter()
            .map(|d| {
                let mut decl = json!({ "name": d.name, "description": d.description });
                if let Some(ref params) = d.parameters {
                    decl["parameters"] = params.clone();
                }
                if let Some(ref response) = d.response {
                    decl["response"] = response.clone();
                }
                decl
            })
            .collect();
        tools.push(json!({ "functionDeclarations": declarations }));
    }

    for facility in &config.facilities {
        match facility {
            Facility::GoogleSearch => tools.push(json!({ "googleSearch": {} })),
        }
    }

    if tools.is_empty() {
        None
    } else {
        Some(Value::Array(tools))
    }
}

/// Extract the first candidate of a `generateContent` response as a turn.
///
/// A response without candidates or parts is an empty turn, not an error.
pub fn parse_turn(response: &Value) -> Result<Turn> {
    if let Some(feedback) = response.get("promptFeedback") {
        if let Some(reason) = feedback.get("blockReason").and_then(|r| r.as_str()) {
            return Err(B3Error::model(format!("prompt blocked: {}", reason)));
        }
    }

    let parts = match response["candidates"][0]["content"]["parts"].as_array() {
        Some(parts) => parts,
        None => return Ok(Turn::default()),
    };

    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        if part.get("thought").and_then(|t| t.as_bool()) == Some(true) {
            continue;
        }
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            out.push(Part::text(text));
        } else if let Some(fc) = part.get("functionCall") {
            let name = fc["name"]
                .as_str()
                .ok_or_else(|| B3Error::model("functionCall without a name"))?;
            let id = fc.get("id").and_then(|i| i.as_str()).unwrap_or_default();
            let args = match fc.get("args") {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            out.push(Part::Call(CallRequest {
                name: name.to_string(),
                id: id.to_string(),
                arguments: args,
            }));
        }
    }

    Ok(Turn::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallResponse, CapabilityDeclaration, Payload};

    #[test]
    fn test_parse_text_turn() {
        let response = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "You have 3 files" }] } }]
        });
        let turn = parse_turn(&response).unwrap();
        assert!(turn.is_terminal());
        assert_eq!(turn.into_content().text(), "You have 3 files");
    }

    #[test]
    fn test_parse_call_turn_skips_thoughts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "pondering", "thought": true },
                { "text": "Let me look." },
                { "functionCall": { "id": "1", "name": "ListFiles", "args": {} } }
            ] } }]
        });
        let turn = parse_turn(&response).unwrap();
        assert_eq!(turn.parts.len(), 2);
        let call = turn.calls().next().unwrap();
        assert_eq!(call.name, "ListFiles");
        assert_eq!(call.id, "1");
    }

    #[test]
    fn test_parse_empty_response() {
        let turn = parse_turn(&json!({ "candidates": [] })).unwrap();
        assert!(turn.parts.is_empty());
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(parse_turn(&response).is_err());
    }

    #[test]
    fn test_rollback_drops_later_exchanges() {
        let mut session = GeminiSession {
            client: Client::new(),
            url: String::new(),
            api_key: String::new(),
            model: "m".to_string(),
            system_instruction: None,
            tools: None,
            temperature: None,
            history: vec![json!({ "role": "user" }), json!({ "role": "model" })],
        };
        let mark = session.checkpoint();
        session.history.push(json!({ "role": "user" }));
        session.history.push(json!({ "role": "model", "parts": [{ "functionCall": {} }] }));

        session.rollback(mark);
        assert_eq!(session.history.len(), 2);
        session.rollback(5);
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn test_response_wire_format() {
        let req = CallRequest::new("ListFiles", "1", json!({}));
        let resp = CallResponse::reply_to(&req, Payload::output(json!(["a.pdf"])));
        assert_eq!(
            part_to_wire(&Part::Response(resp)),
            json!({ "functionResponse": { "id": "1", "name": "ListFiles", "response": { "output": ["a.pdf"] } } })
        );
    }

    #[test]
    fn test_blob_is_base64() {
        let wire = part_to_wire(&Part::blob("text/plain", b"hi".to_vec()));
        assert_eq!(wire["inlineData"]["data"], "aGk=");
        assert_eq!(wire["inlineData"]["mimeType"], "text/plain");
    }

    #[test]
    fn test_tools_section() {
        let config = GenerationConfig {
            declarations: vec![CapabilityDeclaration::new("ListFiles", "List files")],
            ..Default::default()
        }
        .facility(Facility::GoogleSearch);
        let tools = tools_to_wire(&config).unwrap();
        assert_eq!(tools[0]["functionDeclarations"][0]["name"], "ListFiles");
        assert!(tools[0]["functionDeclarations"][0].get("parameters").is_none());
        assert!(tools[1].get("googleSearch").is_some());

        assert!(tools_to_wire(&GenerationConfig::default()).is_none());
    }
}
