use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::report;
use crate::agent::{CallContext, ConversationLogger, NullLogger};
use crate::core::{Arguments, B3Error, CapabilityDeclaration, Payload, Result};
use crate::llm::ModelClient;
use crate::store::{DocumentStore, File, Folder};
use crate::tools::capability::string_arg;
use crate::tools::Capability;

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Fetches a public document (typically an official form) into the workspace
pub struct DownloadFileTool {
    store: Arc<dyn DocumentStore>,
    http: Client,
    logger: Arc<dyn ConversationLogger>,
}

impl DownloadFileTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            store,
            http,
            logger: Arc::new(NullLogger),
        }
    }

    async fn fetch(&self, uri: &Url) -> Result<(Vec<u8>, String)> {
        let resp = self.http.get(uri.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(B3Error::Other(format!(
                "failed to download file: received status code {}",
                resp.status().as_u16()
            )));
        }

        // The media type comes from the response, never from the name.
        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = resp.bytes().await?.to_vec();
        Ok((data, mime_type))
    }

    async fn download(&self, ctx: &CallContext, args: &Arguments) -> Payload {
        let uri = match string_arg(args, "uri") {
            Ok(u) if !u.is_empty() => u,
            _ => return Payload::error("missing or invalid 'uri' argument"),
        };
        let name = match string_arg(args, "name") {
            Ok(n) if !n.is_empty() => n,
            _ => return Payload::error("missing required 'name' argument"),
        };
        let description = match string_arg(args, "description") {
            Ok(d) if !d.is_empty() => d,
            _ => return Payload::error("missing required 'description' argument"),
        };

        let url = match Url::parse(uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => return Payload::error(format!("unsupported URI scheme '{}'", url.scheme())),
            Err(e) => return Payload::error(format!("invalid URI {}: {}", uri, e)),
        };

        self.logger.log_question(
            "DownloadFile",
            &format!("Download from {} to create file '{}'.", url, name),
        );

        let fetched = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Payload::error("download cancelled"),
            fetched = self.fetch(&url) => fetched,
        };
        let (data, mime_type) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => return Payload::error(format!("failed to download file from {}: {}", url, e)),
        };

        match self
            .store
            .create(Folder::Workspace, name, description, &mime_type, data)
            .await
        {
            Ok(file) => {
                let output = self.saved_message(&file);
                self.logger.log_response("DownloadFile", &output);
                Payload::output(output)
            }
            Err(e) => Payload::error(format!("failed to save file: {}", e)),
        }
    }

    fn saved_message(&self, file: &File) -> String {
        format!(
            "Successfully downloaded and saved file '{}' (ID: {}) to {} folder.",
            file.name,
            file.id,
            self.store.folder_name(Folder::Workspace)
        )
    }
}

#[async_trait]
impl Capability for DownloadFileTool {
    fn declare(&self) -> CapabilityDeclaration {
        let workspace = self.store.folder_name(Folder::Workspace);
        CapabilityDeclaration::new(
            "DownloadFile",
            format!(
                "Downloads a file from a given URI and saves it into the {workspace} folder. \
                 Use this to fetch external documents like official forms needed for an \
                 administrative procedure."
            ),
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "uri": { "type": "string", "description": "The public URI of the file to download." },
                "name": { "type": "string", "description": "The file name for the new document." },
                "description": { "type": "string", "description": "A detailed description of the new file, explaining its purpose." }
            },
            "required": ["uri", "name", "description"]
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

    async fn call(&self, ctx: &CallContext, args: &Arguments) -> Payload {
        let payload = self.download(ctx, args).await;
        report(&self.logger, "DownloadFile", payload)
    }
}
