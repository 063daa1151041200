//! Document store - where the user's documents live
//!
//! The archive folder holds the user's curated documents. The workspace folder
//! holds drafts and downloads, and is the only place files may be deleted.

mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// One document as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Unique identifier, used by the other capabilities
    pub id: String,
    /// Human meaningful name
    pub name: String,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// What the document is and what it contains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The two folders a store exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Folder {
    /// Curated personal documents ("B3")
    Archive,
    /// Scratch space for drafts and downloads ("B4")
    Workspace,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Display name of a folder
    fn folder_name(&self, folder: Folder) -> &str;

    /// Every file in the folder and its subfolders
    async fn list(&self, folder: Folder) -> Result<Vec<File>>;

    /// Raw bytes and media type of a file
    async fn content(&self, id: &str) -> Result<(Vec<u8>, String)>;

    /// Rename a file and/or replace its description
    async fn update_metadata(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<File>;

    /// Create a new file at the root of `folder`
    async fn create(
        &self,
        folder: Folder,
        name: &str,
        description: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<File>;

    /// Permanently delete a file. Refused outside the workspace folder.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Whether `id` names an existing file inside `folder`
    async fn contains(&self, folder: Folder, id: &str) -> Result<bool>;
}
