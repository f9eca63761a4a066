//! Document service: the collaborator the tree talks to for listings,
//! deletes, uploads, folder creation and export links.
//!
//! The tree never calls a service directly. It emits `Command`s that the
//! app turns into calls on an `Arc<dyn DocumentService>`.

pub mod local;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::{LocalDocumentStore, StoreOptions};

/// Entry type string used by the service for directories.
pub const DIRECTORY_TYPE: &str = "directory";

/// Path of the export endpoint, relative to the service base URL.
pub const EXPORT_ENDPOINT: &str = "/desktop/api2/doc/export";

/// Opaque identifier assigned by the service.
///
/// Serialized untagged so that numeric ids stay JSON numbers in export links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Numeric(u64),
    Named(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Numeric(n) => write!(f, "{}", n),
            DocumentId::Named(s) => f.write_str(s),
        }
    }
}

/// Raw description of one directory entry, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDefinition {
    /// Full path of the entry, e.g. `/reports/q1`. The root is `/`.
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub absolute_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl EntryDefinition {
    /// Minimal directory definition with no id.
    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, DIRECTORY_TYPE)
    }

    /// Minimal definition of the given type with no id.
    pub fn new(path: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            name: path.into(),
            entry_type: entry_type.into(),
            id: None,
            absolute_url: None,
            description: None,
            last_modified: None,
            size: None,
        }
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.absolute_url = Some(url.into());
        self
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == DIRECTORY_TYPE
    }
}

/// Response of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub directory: EntryDefinition,
    #[serde(default)]
    pub documents: Vec<EntryDefinition>,
    #[serde(default)]
    pub parent: Option<EntryDefinition>,
}

/// Upload form payload: which local file goes into which directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub directory: String,
    pub file: PathBuf,
}

/// Upload progress callback, called with `(bytes_loaded, bytes_total)`.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Errors reported by a document service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The operations the tree needs from a document store.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// List the entries of the directory at `path`.
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ServiceError>;

    /// Delete the document with the given id.
    async fn delete_document(&self, id: &DocumentId) -> Result<(), ServiceError>;

    /// Upload a file, reporting progress through `on_progress`.
    async fn upload_document(
        &self,
        form: &UploadForm,
        on_progress: ProgressFn,
    ) -> Result<(), ServiceError>;

    /// Create a folder called `name` inside `path`.
    async fn create_folder(&self, path: &str, name: &str) -> Result<(), ServiceError>;

    /// Build a navigable export link for the given ids.
    fn export_url(&self, ids: &[DocumentId]) -> Result<String, ServiceError>;
}

/// Build `{base}/desktop/api2/doc/export?documents=<json ids>`.
///
/// One id is still encoded as a one-element list.
pub fn build_export_url(base: &str, ids: &[DocumentId]) -> Result<String, ServiceError> {
    let json = serde_json::to_string(ids)?;
    Ok(format!(
        "{}{}?documents={}",
        base.trim_end_matches('/'),
        EXPORT_ENDPOINT,
        urlencoding::encode(&json)
    ))
}
