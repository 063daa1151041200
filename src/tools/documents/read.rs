use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, B3Error, CapabilityDeclaration, Part, Payload, Result};
use crate::llm::{GenerationConfig, ModelClient};
use crate::store::DocumentStore;
use crate::tools::capability::string_arg;
use crate::tools::Capability;

/// System instruction of the one-shot analysis session
pub const ANALYSIS_INSTRUCTION: &str = "\
Read the file provided to you, and extract a good name and description.
A good name reflects the administrative nature of the document.
A good description describes:
  - the administrative nature of the document.
  - the administrative purpose of such a document.
  - the content of the file. If the file contains personal data (ID number, name, personal dates, expiration dates) they
    must be extracted and listed in the description.";

const ANALYSIS_REQUEST: &str =
    "Provide a detailed description of that file content. Start with the document nature and abstract description.";

/// Reads a document and has a dedicated session describe it
pub struct ReadFileTool {
    store: Arc<dyn DocumentStore>,
    model: String,
    client: Option<Arc<dyn ModelClient>>,
    logger: Arc<dyn ConversationLogger>,
}

impl ReadFileTool {
    /// `model` is used for the analysis sessions
    pub fn new(store: Arc<dyn DocumentStore>, model: impl Into<String>) -> Self {
        Self {
            store,
            model: model.into(),
            client: None,
            logger: Arc::new(NullLogger),
        }
    }

    async fn analyze(&self, ctx: &CallContext, file_id: &str) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| B3Error::session("ReadFile used before start"))?;

        let (data, mime_type) = self.store.content(file_id).await?;

        let mut session = client
            .create_session(
                &self.model,
                GenerationConfig::with_instruction(ANALYSIS_INSTRUCTION),
            )
            .await?;

        let parts = vec![Part::text(ANALYSIS_REQUEST), Part::blob(mime_type, data)];
        let turn = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(B3Error::Cancelled),
            turn = session.send(parts) => turn?,
        };

        let text = turn.into_content().text();
        if text.is_empty() {
            return Err(B3Error::model("received empty response from analysis"));
        }
        Ok(text)
    }
}

#[async_trait]
impl Capability for ReadFileTool {
    fn declare(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new(
            "ReadFile",
            "Reads and extracts the full detailed content of a single, specific file. \
             Use this when you need to perform a deep analysis of a document, \
             especially one that has a missing or incomplete description.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "file_id": {
                    "type": "string",
                    "description": "The unique ID of the file to read."
                }
            },
            "required": ["file_id"]
        }))
    }

    async fn start(
        &mut self,
        _ctx: &CallContext,
        client: Arc<dyn ModelClient>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Result<()> {
        self.client = Some(client);
        self.logger = logger;
        Ok(())
    }

    async fn call(&self, ctx: &CallContext, args: &Arguments) -> Payload {
        let file_id = match string_arg(args, "file_id") {
            Ok(id) => id,
            Err(e) => return report(&self.logger, "ReadFile", Payload::error(e)),
        };

        self.logger
            .log_question("ReadFile", &format!("Read file with ID: {}", file_id));

        let payload = match self.analyze(ctx, file_id).await {
            Ok(text) => {
                self.logger.log_response(
                    "ReadFile",
                    "Successfully extracted and analyzed file content.",
                );
                Payload::output(text)
            }
            Err(e) => Payload::error(format!("analyzing {}: {}", file_id, e)),
        };
        report(&self.logger, "ReadFile", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Turn;
    use crate::llm::ScriptedClient;
    use crate::store::LocalStore;

    async fn tool(client: &ScriptedClient) -> (tempfile::TempDir, ReadFileTool) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "B3", "B4");
        store.ensure_folders().await.unwrap();
        tokio::fs::write(dir.path().join("B3/id.txt"), b"Jane Doe, born 1980")
            .await
            .unwrap();

        let mut tool = ReadFileTool::new(Arc::new(store), "reader");
        tool.start(
            &CallContext::new(),
            Arc::new(client.clone()),
            Arc::new(NullLogger),
        )
        .await
        .unwrap();
        (dir, tool)
    }

    fn args(id: &str) -> Arguments {
        json!({ "file_id": id }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_read_sends_blob_to_analysis_session() {
        let client =
            ScriptedClient::new().script("reader", vec![Turn::text("Identity card of Jane Doe")]);
        let (_dir, tool) = tool(&client).await;

        let payload = tool.call(&CallContext::new(), &args("B3/id.txt")).await;
        assert_eq!(
            payload.get_output().and_then(|v| v.as_str()),
            Some("Identity card of Jane Doe")
        );

        let sent = client.sent("reader");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0][1],
            Part::blob("text/plain", b"Jane Doe, born 1980".to_vec())
        );
        let configs = client.configs("reader");
        assert_eq!(
            configs[0].system_instruction.as_deref(),
            Some(ANALYSIS_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn test_unknown_file_and_empty_analysis() {
        let client = ScriptedClient::new().script("reader", vec![Turn::default()]);
        let (_dir, tool) = tool(&client).await;

        assert!(tool.call(&CallContext::new(), &args("B3/nope.pdf")).await.is_error());

        let payload = tool.call(&CallContext::new(), &args("B3/id.txt")).await;
        assert!(payload.get_error().unwrap().contains("empty response"));

        let bad = json!({ "file_id": 7 }).as_object().cloned().unwrap();
        assert!(tool.call(&CallContext::new(), &bad).await.is_error());
    }
}
