//! Document store backed by a local directory.
//!
//! Layout under the root: one directory per folder. A file id is the folder
//! name followed by the path inside it (`B3/id/passport.pdf`). Descriptions are
//! kept in a `.b3meta.json` sidecar at the top of each folder.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::config::StoreConfig;
use crate::core::{B3Error, Result};
use crate::store::{DocumentStore, File, Folder};

const META_FILE: &str = ".b3meta.json";

type Metadata = BTreeMap<String, String>;

/// Directory-backed [`DocumentStore`]
pub struct LocalStore {
    root: PathBuf,
    archive: String,
    workspace: String,
    /// Serializes sidecar read-modify-write cycles
    meta_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(
        root: impl Into<PathBuf>,
        archive: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            archive: archive.into(),
            workspace: workspace.into(),
            meta_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.archive_folder.clone(),
            config.workspace_folder.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create both folders if missing
    pub async fn ensure_folders(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.folder_dir(Folder::Archive)).await?;
        tokio::fs::create_dir_all(self.folder_dir(Folder::Workspace)).await?;
        Ok(())
    }

    fn folder_dir(&self, folder: Folder) -> PathBuf {
        self.root.join(self.folder_name(folder))
    }

    /// Split an id into its folder and the path inside that folder
    fn resolve(&self, id: &str) -> Result<(Folder, PathBuf)> {
        let path = Path::new(id);
        let mut components = path.components();

        let folder = match components.next() {
            Some(Component::Normal(first)) if first == self.archive.as_str() => Folder::Archive,
            Some(Component::Normal(first)) if first == self.workspace.as_str() => {
                Folder::Workspace
            }
            _ => {
                return Err(B3Error::store(format!(
                    "file {} is not in the {} or {} folder",
                    id, self.archive, self.workspace
                )))
            }
        };

        let relative = components.as_path().to_path_buf();
        let valid = !relative.as_os_str().is_empty()
            && relative.components().all(|c| match c {
                Component::Normal(part) => !part.to_string_lossy().starts_with('.'),
                _ => false,
            });
        if !valid {
            return Err(B3Error::store(format!("invalid file id {}", id)));
        }

        Ok((folder, relative))
    }

    fn make_id(&self, folder: Folder, relative: &Path) -> String {
        format!("{}/{}", self.folder_name(folder), meta_key(relative))
    }

    fn entry(
        &self,
        folder: Folder,
        relative: &Path,
        metadata: &std::fs::Metadata,
        meta: &Metadata,
    ) -> File {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        File {
            id: self.make_id(folder, relative),
            name: relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            modified,
            description: meta.get(&meta_key(relative)).cloned(),
        }
    }

    async fn existing_file(&self, folder: Folder, relative: &Path, id: &str) -> Result<PathBuf> {
        let path = self.folder_dir(folder).join(relative);
        match tokio::fs::metadata(&path).await {
            Ok(md) if md.is_file() => Ok(path),
            _ => Err(B3Error::store(format!("file {} not found", id))),
        }
    }

    async fn load_meta(&self, folder: Folder) -> Result<Metadata> {
        let path = self.folder_dir(folder).join(META_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_meta(&self, folder: Folder, meta: &Metadata) -> Result<()> {
        let path = self.folder_dir(folder).join(META_FILE);
        tokio::fs::write(&path, serde_json::to_vec_pretty(meta)?).await?;
        Ok(())
    }
}

/// Sidecar key: the path inside the folder with `/` separators
fn meta_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(B3Error::store(format!("invalid file name {:?}", name)));
    }
    Ok(())
}

/// Append an extension matching `mime_type` when the name has none
fn with_extension(name: &str, mime_type: &str) -> String {
    if Path::new(name).extension().is_some() {
        return name.to_string();
    }
    match mime_guess::get_mime_extensions_str(mime_type).and_then(|exts| exts.first()) {
        Some(ext) => format!("{}.{}", name, ext),
        None => name.to_string(),
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn folder_name(&self, folder: Folder) -> &str {
        match folder {
            Folder::Archive => &self.archive,
            Folder::Workspace => &self.workspace,
        }
    }

    async fn list(&self, folder: Folder) -> Result<Vec<File>> {
        let base = self.folder_dir(folder);
        if !tokio::fs::try_exists(&base).await.unwrap_or(false) {
            return Err(B3Error::store(format!(
                "'{}' folder not found in {}. Please create it and try again",
                self.folder_name(folder),
                self.root.display()
            )));
        }

        let meta = self.load_meta(folder).await?;
        let mut files = Vec::new();
        let mut to_scan = VecDeque::from([PathBuf::new()]);

        while let Some(dir) = to_scan.pop_front() {
            let mut entries = tokio::fs::read_dir(base.join(&dir)).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_name = entry.file_name();
                if file_name.to_string_lossy().starts_with('.') {
                    continue;
                }
                let relative = dir.join(&file_name);
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    to_scan.push_back(relative);
                } else if file_type.is_file() {
                    let metadata = entry.metadata().await?;
                    files.push(self.entry(folder, &relative, &metadata, &meta));
                }
            }
        }

        files.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(folder = self.folder_name(folder), count = files.len(), "listed files");
        Ok(files)
    }

    async fn content(&self, id: &str) -> Result<(Vec<u8>, String)> {
        let (folder, relative) = self.resolve(id)?;
        let path = self.existing_file(folder, &relative, id).await?;
        let data = tokio::fs::read(&path).await?;
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok((data, mime_type))
    }

    async fn update_metadata(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<File> {
        let (folder, mut relative) = self.resolve(id)?;
        let mut path = self.existing_file(folder, &relative, id).await?;

        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta(folder).await?;

        if let Some(name) = name {
            validate_name(name)?;
            let renamed = relative.with_file_name(name);
            if renamed != relative {
                let target = self.folder_dir(folder).join(&renamed);
                if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                    return Err(B3Error::store(format!(
                        "cannot rename {}: {} already exists",
                        id,
                        self.make_id(folder, &renamed)
                    )));
                }
                tokio::fs::rename(&path, &target).await?;
                if let Some(previous) = meta.remove(&meta_key(&relative)) {
                    meta.insert(meta_key(&renamed), previous);
                }
                relative = renamed;
                path = target;
            }
        }

        if let Some(description) = description {
            meta.insert(meta_key(&relative), description.to_string());
        }
        self.save_meta(folder, &meta).await?;

        let metadata = tokio::fs::metadata(&path).await?;
        Ok(self.entry(folder, &relative, &metadata, &meta))
    }

    async fn create(
        &self,
        folder: Folder,
        name: &str,
        description: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<File> {
        validate_name(name)?;
        let relative = PathBuf::from(with_extension(name, mime_type));
        let base = self.folder_dir(folder);
        let path = base.join(&relative);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(B3Error::store(format!(
                "could not create file '{}': {} already exists",
                name,
                self.make_id(folder, &relative)
            )));
        }

        tokio::fs::create_dir_all(&base).await?;
        tokio::fs::write(&path, data).await?;

        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta(folder).await?;
        if !description.is_empty() {
            meta.insert(meta_key(&relative), description.to_string());
            self.save_meta(folder, &meta).await?;
        }

        let metadata = tokio::fs::metadata(&path).await?;
        Ok(self.entry(folder, &relative, &metadata, &meta))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (folder, relative) = self.resolve(id)?;
        if folder != Folder::Workspace {
            return Err(B3Error::store(format!(
                "safety check failed: file {} is not in the {} folder and will not be deleted",
                id, self.workspace
            )));
        }

        let path = self.existing_file(folder, &relative, id).await?;
        tokio::fs::remove_file(&path).await?;

        let _guard = self.meta_lock.lock().await;
        let mut meta = self.load_meta(folder).await?;
        if meta.remove(&meta_key(&relative)).is_some() {
            self.save_meta(folder, &meta).await?;
        }
        Ok(())
    }

    async fn contains(&self, folder: Folder, id: &str) -> Result<bool> {
        let (found, relative) = match self.resolve(id) {
            Ok(resolved) => resolved,
            Err(_) => return Ok(false),
        };
        if found != folder {
            return Ok(false);
        }
        Ok(self.existing_file(folder, &relative, id).await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "B3", "B4");
        store.ensure_folders().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_list_is_recursive_and_skips_hidden() {
        let (dir, store) = store().await;
        let b3 = dir.path().join("B3");
        tokio::fs::create_dir_all(b3.join("id")).await.unwrap();
        tokio::fs::write(b3.join("tax.pdf"), b"%PDF").await.unwrap();
        tokio::fs::write(b3.join("id/passport.jpg"), b"jpg").await.unwrap();
        tokio::fs::write(b3.join(".hidden"), b"x").await.unwrap();

        let files = store.list(Folder::Archive).await.unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["B3/id/passport.jpg", "B3/tax.pdf"]);
        assert_eq!(files[0].name, "passport.jpg");
        assert_eq!(files[0].description, None);
    }

    #[tokio::test]
    async fn test_missing_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path(), "B3", "B4");
        let err = store.list(Folder::Archive).await.unwrap_err();
        assert!(err.to_string().contains("'B3' folder not found"));
    }

    #[tokio::test]
    async fn test_update_metadata_renames_and_describes() {
        let (dir, store) = store().await;
        tokio::fs::write(dir.path().join("B3/scan001.pdf"), b"%PDF").await.unwrap();

        let file = store
            .update_metadata("B3/scan001.pdf", None, Some("French passport of Jane Doe"))
            .await
            .unwrap();
        assert_eq!(file.description.as_deref(), Some("French passport of Jane Doe"));

        let file = store
            .update_metadata("B3/scan001.pdf", Some("passport.pdf"), None)
            .await
            .unwrap();
        assert_eq!(file.id, "B3/passport.pdf");
        assert_eq!(file.description.as_deref(), Some("French passport of Jane Doe"));

        let files = store.list(Folder::Archive).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "B3/passport.pdf");
        assert!(store.content("B3/scan001.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_content_guesses_mime_type() {
        let (dir, store) = store().await;
        tokio::fs::write(dir.path().join("B3/notes.txt"), b"hello").await.unwrap();
        let (data, mime) = store.content("B3/notes.txt").await.unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(mime, "text/plain");
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let (_dir, store) = store().await;
        assert!(store.content("B3/../secret.txt").await.is_err());
        assert!(store.content("/etc/passwd").await.is_err());
        assert!(store.content("B3/.b3meta.json").await.is_err());
        assert!(store.delete("B4/../B3/tax.pdf").await.is_err());
        assert!(!store.contains(Folder::Archive, "Other/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_only_in_workspace() {
        let (dir, store) = store().await;
        tokio::fs::write(dir.path().join("B3/tax.pdf"), b"%PDF").await.unwrap();

        let err = store.delete("B3/tax.pdf").await.unwrap_err();
        assert!(err.to_string().contains("safety check failed"));
        assert!(store.contains(Folder::Archive, "B3/tax.pdf").await.unwrap());

        let created = store
            .create(Folder::Workspace, "draft", "Draft letter", "text/plain", b"Dear".to_vec())
            .await
            .unwrap();
        assert!(created.id.starts_with("B4/draft."));
        assert_eq!(created.description.as_deref(), Some("Draft letter"));

        store.delete(&created.id).await.unwrap();
        assert!(!store.contains(Folder::Workspace, &created.id).await.unwrap());
        assert!(store.list(Folder::Workspace).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_and_bad_names() {
        let (_dir, store) = store().await;
        store
            .create(Folder::Workspace, "form.pdf", "", "application/pdf", vec![1])
            .await
            .unwrap();
        assert!(store
            .create(Folder::Workspace, "form.pdf", "", "application/pdf", vec![2])
            .await
            .is_err());
        assert!(store
            .create(Folder::Workspace, "../escape.txt", "", "text/plain", vec![])
            .await
            .is_err());
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("form.pdf", "application/pdf"), "form.pdf");
        assert_eq!(with_extension("form", "application/pdf"), "form.pdf");
        assert_eq!(with_extension("blob", "application/x-nothing-known"), "blob");
    }
}
