//! Ready-made agents
//!
//! `B3` is the assistant the user talks to. It curates the document store
//! itself and delegates administrative questions to `AdminExpert`.

use std::sync::Arc;

use crate::agent::delegate::DelegatedAgent;
use crate::agent::orchestrator::Agent;
use crate::core::{Config, Result};
use crate::llm::Facility;
use crate::store::{DocumentStore, Folder};
use crate::tools::documents::{
    CreateDocTool, DeleteFilesTool, DownloadFileTool, ListFilesTool, ReadFileTool, UpdateFileTool,
};

const B3_INSTRUCTION: &str = "\
You are B3, a personal data assistant that lives in the user's terminal.
Your mission is to help the user by deeply understanding the documents they have stored in their '{archive}' folder.
Use ListFiles to see the current list of files, ReadFile to read a specific file, and UpdateFile to curate the list of documents.
Your primary workflow is to list, read, and then update to continuously enrich your knowledge base about the primary user personal data.

When a file has no description and appears to have been scanned recently, read it and create a meaningful description that:
 - accurately describes the nature of the document (passport, french identity card)
 - contains directly readable personal data: e.g. full name, identification numbers (like tax ID, security number), addresses, important dates.
 - relates those data with the primary user. It could be their full name or their daughter's full name, or their mother's full name.
Look for apparent conflicts (like multiple identities, or addresses), try to figure out the possible resolution, but ask the user to confirm, and record the solution
in the file metadata (file name and/or description).

The '{workspace}' folder is your working area: download official forms into it with DownloadFile, draft letters with CreateDoc,
list it with ListWorkspace and clean it up with DeleteFiles. Never try to delete anything else.
Ask AdminExpert whenever the user needs help with an administrative procedure.";

const ADMIN_EXPERT_INSTRUCTION: &str = "\
You are a world-class administrative assistant, an expert in navigating bureaucracy.
Your primary role is to help users achieve their administrative goals by providing clear, actionable plans.

When a user asks for help with a specific task (e.g., 'how do I register for unemployment?', 'what do I need to get a new passport?'),
help them with a plan:
  1. Use Google Search to find the most current, official procedures for the user's specific request and location if provided.
  2. Synthesize this information into a step-by-step plan.
  3. For each step, clearly list the required documents.
  4. Present the final plan in a clear, easy-to-follow format.";

/// Expert on administrative procedures, grounded with web search
pub fn admin_expert(config: &Config) -> Result<Agent> {
    Agent::builder(
        "AdminExpert",
        "An expert on administrative procedures and paperwork.",
    )
    .model(&config.models.expert)
    .instruction(ADMIN_EXPERT_INSTRUCTION)
    .facility(Facility::GoogleSearch)
    .dispatch(config.agent.dispatch)
    .build()
}

/// The top-level personal data assistant
pub fn b3_agent(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Agent> {
    let instruction = B3_INSTRUCTION
        .replace("{archive}", store.folder_name(Folder::Archive))
        .replace("{workspace}", store.folder_name(Folder::Workspace));

    Agent::builder("B3", "A personal data assistant for the user's documents.")
        .model(&config.models.primary)
        .instruction(instruction)
        .dispatch(config.agent.dispatch)
        .capability(ListFilesTool::archive(Arc::clone(&store)))
        .capability(ListFilesTool::workspace(Arc::clone(&store)))
        .capability(ReadFileTool::new(Arc::clone(&store), &config.models.expert))
        .capability(UpdateFileTool::new(Arc::clone(&store)))
        .capability(DeleteFilesTool::new(Arc::clone(&store)))
        .capability(CreateDocTool::new(Arc::clone(&store)))
        .capability(DownloadFileTool::new(Arc::clone(&store)))
        .capability(DelegatedAgent::new(admin_expert(config)?))
        .build()
}
