use std::sync::Arc;

use async_trait::async_trait;

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;
use crate::store::{DocumentStore, Folder};
use crate::tools::Capability;

/// Index of every file in one folder of the store
pub struct ListFilesTool {
    store: Arc<dyn DocumentStore>,
    folder: Folder,
    logger: Arc<dyn ConversationLogger>,
}

impl ListFilesTool {
    /// `ListFiles`: the archive folder
    pub fn archive(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, Folder::Archive)
    }

    /// `ListWorkspace`: the workspace folder
    pub fn workspace(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, Folder::Workspace)
    }

    fn new(store: Arc<dyn DocumentStore>, folder: Folder) -> Self {
        Self {
            store,
            folder,
            logger: Arc::new(NullLogger),
        }
    }

    fn name(&self) -> &'static str {
        match self.folder {
            Folder::Archive => "ListFiles",
            Folder::Workspace => "ListWorkspace",
        }
    }
}

#[async_trait]
impl Capability for ListFilesTool {
    fn declare(&self) -> CapabilityDeclaration {
        let folder = self.store.folder_name(self.folder);
        let description = match self.folder {
            Folder::Archive => format!(
                "Fetches the most up-to-date index of all files in the user's {folder} folder. \
                 Call this at the beginning of a new conversation or if you suspect the user \
                 may have added or changed files. For each file you get its unique ID (to \
                 communicate with other tools), a human meaningful name (to communicate with \
                 the user) and a description of the document nature, purpose and content."
            ),
            Folder::Workspace => format!(
                "Fetches the index of all files in the {folder} working folder, where drafts, \
                 downloaded forms and generated documents are kept. Same format as ListFiles."
            ),
        };
        CapabilityDeclaration::new(self.name(), description)
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

    async fn call(&self, _ctx: &CallContext, _args: &Arguments) -> Payload {
        let folder = self.store.folder_name(self.folder);
        self.logger.log_question(
            self.name(),
            &format!("Fetch file list from {} folder.", folder),
        );

        let payload = match self.store.list(self.folder).await {
            Ok(files) => match serde_json::to_value(&files) {
                Ok(value) => {
                    self.logger
                        .log_response(self.name(), &format!("Found {} files.", files.len()));
                    Payload::output(value)
                }
                Err(e) => Payload::error(e),
            },
            Err(e) => Payload::error(e),
        };
        report(&self.logger, self.name(), payload)
    }
}
