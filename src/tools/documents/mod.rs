//! Document tools - capabilities over the document store
//!
//! Each tool reports what it does through the conversation logger and turns
//! every failure into an error payload.

mod create;
mod delete;
mod download;
mod list;
mod read;
mod update;

pub use create::CreateDocTool;
pub use delete::DeleteFilesTool;
pub use download::DownloadFileTool;
pub use list::ListFilesTool;
pub use read::{ReadFileTool, ANALYSIS_INSTRUCTION};
pub use update::UpdateFileTool;

use std::sync::Arc;

use crate::agent::ConversationLogger;
use crate::core::Payload;

/// Log an error payload under the tool's name and pass it through
fn report(logger: &Arc<dyn ConversationLogger>, tool: &str, payload: Payload) -> Payload {
    if let Some(error) = payload.get_error() {
        logger.log_response(tool, &format!("Error: {}", error));
    }
    payload
}
