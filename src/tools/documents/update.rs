use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;
use crate::store::DocumentStore;
use crate::tools::capability::{optional_string_arg, string_arg};
use crate::tools::Capability;

/// Saves a better name and/or description for a file
pub struct UpdateFileTool {
    store: Arc<dyn DocumentStore>,
    logger: Arc<dyn ConversationLogger>,
}

impl UpdateFileTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            logger: Arc::new(NullLogger),
        }
    }

    async fn update(&self, args: &Arguments) -> Payload {
        let file_id = match string_arg(args, "file_id") {
            Ok(id) => id,
            Err(e) => return Payload::error(e),
        };
        // Empty strings mean "leave unchanged".
        let name = match optional_string_arg(args, "name") {
            Ok(n) => n.filter(|n| !n.is_empty()),
            Err(e) => return Payload::error(e),
        };
        let description = match optional_string_arg(args, "description") {
            Ok(d) => d.filter(|d| !d.is_empty()),
            Err(e) => return Payload::error(e),
        };

        if name.is_none() && description.is_none() {
            return Payload::error("update tool called without 'name' or 'description' to update.");
        }

        let mut updates = Vec::new();
        if let Some(name) = name {
            updates.push(format!("name to '{}'", name));
        }
        if description.is_some() {
            updates.push("description".to_string());
        }
        self.logger.log_question(
            "UpdateFile",
            &format!("Update file {}: set {}.", file_id, updates.join(" and ")),
        );

        match self.store.update_metadata(file_id, name, description).await {
            Ok(_) => {
                self.logger
                    .log_response("UpdateFile", "Successfully updated file metadata.");
                Payload::output(true)
            }
            Err(e) => Payload::error(e),
        }
    }
}

#[async_trait]
impl Capability for UpdateFileTool {
    fn declare(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new(
            "UpdateFile",
            "Updates the metadata (name and/or description) of a specific file. \
             After you have analyzed a file's content, use this tool to save your findings. \
             This permanently improves the knowledge base for all future conversations. \
             Returns true on success.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "file_id": { "type": "string", "description": "The unique ID of the file to modify." },
                "name": { "type": "string", "description": "The new name for the file." },
                "description": { "type": "string", "description": "The new text for the file's description." }
            },
            "required": ["file_id"]
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
        let payload = self.update(args).await;
        report(&self.logger, "UpdateFile", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Folder, LocalStore};

    #[tokio::test]
    async fn test_update_requires_name_or_description() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path(), "B3", "B4"));
        store.ensure_folders().await.unwrap();
        tokio::fs::write(dir.path().join("B3/scan.pdf"), b"%PDF").await.unwrap();
        let tool = UpdateFileTool::new(store.clone());
        let ctx = CallContext::new();

        let only_id = json!({ "file_id": "B3/scan.pdf", "name": "" });
        let payload = tool.call(&ctx, only_id.as_object().unwrap()).await;
        assert!(payload.get_error().unwrap().contains("without 'name' or 'description'"));

        let describe = json!({ "file_id": "B3/scan.pdf", "description": "Tax notice 2024" });
        let payload = tool.call(&ctx, describe.as_object().unwrap()).await;
        assert_eq!(payload.get_output(), Some(&json!(true)));

        let files = store.list(Folder::Archive).await.unwrap();
        assert_eq!(files[0].description.as_deref(), Some("Tax notice 2024"));
    }

    #[tokio::test]
    async fn test_update_unknown_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path(), "B3", "B4"));
        let tool = UpdateFileTool::new(store);
        let args = json!({ "file_id": "B3/none.pdf", "name": "x.pdf" });
        assert!(tool
            .call(&CallContext::new(), args.as_object().unwrap())
            .await
            .is_error());
    }
}
