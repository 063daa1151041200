use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;
use crate::store::DocumentStore;
use crate::tools::Capability;

/// Deletes workspace files
pub struct DeleteFilesTool {
    store: Arc<dyn DocumentStore>,
    logger: Arc<dyn ConversationLogger>,
}

impl DeleteFilesTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            logger: Arc::new(NullLogger),
        }
    }

    async fn delete(&self, args: &Arguments) -> Payload {
        let ids = match args.get("file_ids") {
            Some(Value::Array(ids)) if !ids.is_empty() => ids,
            _ => return Payload::error("missing or invalid 'file_ids' argument"),
        };

        let mut file_ids = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            match id.as_str() {
                Some(id) => file_ids.push(id),
                None => return Payload::error(format!("invalid file_id at index {}: not a string", i)),
            }
        }

        self.logger.log_question(
            "DeleteFiles",
            &format!(
                "Attempting to delete {} file(s): {}",
                file_ids.len(),
                file_ids.join(", ")
            ),
        );

        let mut deleted = 0;
        let mut warnings = Vec::new();
        for id in file_ids {
            match self.store.delete(id).await {
                Ok(()) => deleted += 1,
                Err(e) => warnings.push(format!("could not delete file {}: {}", id, e)),
            }
        }

        let mut output = format!("Successfully deleted {} file(s).", deleted);
        if !warnings.is_empty() {
            output = format!("{} Warnings: {}", output, warnings.join("; "));
        }
        self.logger.log_response("DeleteFiles", &output);
        Payload::output(output)
    }
}

#[async_trait]
impl Capability for DeleteFilesTool {
    fn declare(&self) -> CapabilityDeclaration {
        let workspace = self.store.folder_name(crate::store::Folder::Workspace);
        CapabilityDeclaration::new(
            "DeleteFiles",
            format!(
                "Permanently deletes one or more files from the {workspace} folder. \
                 This action is irreversible. Files outside the {workspace} folder are never deleted."
            ),
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "file_ids": {
                    "type": "array",
                    "description": "The unique IDs of the files to delete.",
                    "items": { "type": "string" }
                }
            },
            "required": ["file_ids"]
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
        let payload = self.delete(args).await;
        report(&self.logger, "DeleteFiles", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    #[tokio::test]
    async fn test_delete_reports_per_file_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "B3", "B4");
        store.ensure_folders().await.unwrap();
        tokio::fs::write(dir.path().join("B3/tax.pdf"), b"%PDF").await.unwrap();
        tokio::fs::write(dir.path().join("B4/draft.txt"), b"Dear").await.unwrap();
        let tool = DeleteFilesTool::new(Arc::new(store));

        let args = json!({ "file_ids": ["B4/draft.txt", "B3/tax.pdf"] });
        let payload = tool.call(&CallContext::new(), args.as_object().unwrap()).await;
        let output = payload.get_output().and_then(|v| v.as_str()).unwrap();
        assert!(output.starts_with("Successfully deleted 1 file(s). Warnings: could not delete file B3/tax.pdf"));

        assert!(!dir.path().join("B4/draft.txt").exists());
        assert!(dir.path().join("B3/tax.pdf").exists());
    }

    #[tokio::test]
    async fn test_delete_validates_ids() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DeleteFilesTool::new(Arc::new(LocalStore::new(dir.path(), "B3", "B4")));
        let ctx = CallContext::new();

        let empty = json!({ "file_ids": [] });
        assert!(tool.call(&ctx, empty.as_object().unwrap()).await.is_error());

        let mixed = json!({ "file_ids": ["B4/a.txt", 3] });
        let payload = tool.call(&ctx, mixed.as_object().unwrap()).await;
        assert!(payload.get_error().unwrap().contains("index 1"));
    }
}
