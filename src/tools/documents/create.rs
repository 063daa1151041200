use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;
use crate::store::{DocumentStore, Folder};
use crate::tools::capability::{optional_string_arg, string_arg};
use crate::tools::Capability;

/// Drafts a Markdown document in the workspace
pub struct CreateDocTool {
    store: Arc<dyn DocumentStore>,
    logger: Arc<dyn ConversationLogger>,
}

impl CreateDocTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            logger: Arc::new(NullLogger),
        }
    }

    async fn create(&self, args: &Arguments) -> Payload {
        let name = match string_arg(args, "output_name") {
            Ok(n) if !n.is_empty() => n,
            _ => return Payload::error("missing required 'output_name' argument"),
        };
        let content = match string_arg(args, "markdown_content") {
            Ok(c) if !c.is_empty() => c,
            _ => return Payload::error("missing required 'markdown_content' argument"),
        };
        let description = match optional_string_arg(args, "description") {
            Ok(d) => d.unwrap_or_default(),
            Err(e) => return Payload::error(e),
        };

        let file_name = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{}.md", name)
        };

        self.logger.log_question(
            "CreateDoc",
            &format!("Creating new document named '{}'", file_name),
        );

        let workspace = self.store.folder_name(Folder::Workspace);
        match self
            .store
            .create(
                Folder::Workspace,
                &file_name,
                description,
                "text/markdown",
                content.as_bytes().to_vec(),
            )
            .await
        {
            Ok(file) => {
                let output = format!(
                    "Successfully created new document '{}' (ID: {}) in {} folder.",
                    file.name, file.id, workspace
                );
                self.logger.log_response("CreateDoc", &output);
                Payload::output(output)
            }
            Err(e) => Payload::error(e),
        }
    }
}

#[async_trait]
impl Capability for CreateDocTool {
    fn declare(&self) -> CapabilityDeclaration {
        let workspace = self.store.folder_name(Folder::Workspace);
        CapabilityDeclaration::new(
            "CreateDoc",
            format!(
                "Creates a new document in the {workspace} folder from Markdown text. \
                 This is useful for drafting letters or other documents that require further editing."
            ),
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "output_name": {
                    "type": "string",
                    "description": "The file name for the new document."
                },
                "markdown_content": {
                    "type": "string",
                    "description": "The Markdown content of the document."
                },
                "description": {
                    "type": "string",
                    "description": "What the document is for."
                }
            },
            "required": ["output_name", "markdown_content"]
        }))
    }

    async fn start(
        &mut self,
        _ctx: &CallContext,
        _client: Arc<dyn ModelClient>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Result<()> {
        self.logger = logger;
        Ok(())
    }

    async fn call(&self, _ctx: &CallContext, args: &Arguments) -> Payload {
        let payload = self.create(args).await;
        report(&self.logger, "CreateDoc", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    #[tokio::test]
    async fn test_creates_markdown_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path(), "B3", "B4"));
        store.ensure_folders().await.unwrap();
        let tool = CreateDocTool::new(store.clone());

        let args = json!({
            "output_name": "letter",
            "markdown_content": "# Dear Sir",
            "description": "Cover letter"
        });
        let payload = tool.call(&CallContext::new(), args.as_object().unwrap()).await;
        assert!(payload
            .get_output()
            .and_then(|v| v.as_str())
            .unwrap()
            .contains("(ID: B4/letter.md)"));

        let written = tokio::fs::read_to_string(dir.path().join("B4/letter.md"))
            .await
            .unwrap();
        assert_eq!(written, "# Dear Sir");
        let files = store.list(Folder::Workspace).await.unwrap();
        assert_eq!(files[0].description.as_deref(), Some("Cover letter"));
    }

    #[tokio::test]
    async fn test_requires_content() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CreateDocTool::new(Arc::new(LocalStore::new(dir.path(), "B3", "B4")));
        let args = json!({ "output_name": "letter" });
        let payload = tool.call(&CallContext::new(), args.as_object().unwrap()).await;
        assert!(payload.get_error().unwrap().contains("markdown_content"));
    }
}
