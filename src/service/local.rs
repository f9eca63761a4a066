//! Document store backed by a directory on disk.
//!
//! Store paths are `/`-separated and relative to the store root; `/` is the
//! root itself. Ids are the store paths, so a listing's ids can be handed
//! straight back to `delete_document`.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{
    build_export_url, DirectoryListing, DocumentId, DocumentService, EntryDefinition,
    ProgressFn, ServiceError, UploadForm, DIRECTORY_TYPE,
};

/// Entry type reported for anything that is not a directory.
pub const FILE_TYPE: &str = "file";

/// Chunk size used when copying uploads.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Sort criteria for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Alphabetical (case-insensitive), default.
    Name,
    /// By file size (largest first).
    Size,
    /// By modification time (newest first).
    Modified,
}

impl SortBy {
    /// Parse sort_by from config string.
    pub fn parse(s: &str) -> Self {
        match s {
            "size" => SortBy::Size,
            "modified" => SortBy::Modified,
            _ => SortBy::Name,
        }
    }
}

/// Listing and export behaviour of a local store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub sort_by: SortBy,
    pub dirs_first: bool,
    pub show_hidden: bool,
    pub export_base_url: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sort_by: SortBy::Name,
            dirs_first: true,
            show_hidden: false,
            export_base_url: "http://localhost:8888".to_string(),
        }
    }
}

/// A `DocumentService` serving the contents of one local directory.
pub struct LocalDocumentStore {
    root: PathBuf,
    options: StoreOptions,
}

impl LocalDocumentStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn new(root: &Path, options: StoreOptions) -> Result<Self, ServiceError> {
        let root = root
            .canonicalize()
            .map_err(|e| map_io(e, &root.display().to_string()))?;
        if !root.is_dir() {
            return Err(ServiceError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root, options })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem, rejecting anything but plain
    /// path segments.
    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let mut resolved = self.root.clone();
        for segment in segments(path) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(ServiceError::InvalidPath(path.to_string()));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn definition(&self, store_path: String, fs_path: &Path, meta: &Metadata) -> EntryDefinition {
        let entry_type = if meta.is_dir() {
            DIRECTORY_TYPE
        } else {
            FILE_TYPE
        };
        let mut definition = EntryDefinition::new(store_path.clone(), entry_type)
            .with_id(DocumentId::Named(store_path))
            .with_url(format!("file://{}", fs_path.display()));
        definition.size = (!meta.is_dir()).then(|| meta.len());
        definition.last_modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs().to_string());
        definition
    }
}

#[async_trait]
impl DocumentService for LocalDocumentStore {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ServiceError> {
        let store_path = normalize(path);
        let dir = self.resolve(&store_path)?;
        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| map_io(e, &store_path))?;
        if !meta.is_dir() {
            return Err(ServiceError::InvalidPath(format!(
                "{} is not a directory",
                store_path
            )));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| map_io(e, &store_path))?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !self.options.show_hidden && name.starts_with('.') {
                continue;
            }
            // Broken symlinks and unreadable entries are skipped.
            let entry_meta = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(_) => continue,
            };
            let modified = entry_meta.modified().ok();
            let definition =
                self.definition(join(&store_path, &name), &entry.path(), &entry_meta);
            entries.push((definition, modified));
        }
        sort_entries(&mut entries, self.options.sort_by, self.options.dirs_first);

        let parent = match parent_of(&store_path) {
            Some(parent_path) => {
                let parent_dir = self.resolve(&parent_path)?;
                let parent_meta = tokio::fs::metadata(&parent_dir).await?;
                Some(self.definition(parent_path, &parent_dir, &parent_meta))
            }
            None => None,
        };

        debug!("listed {} ({} entries)", store_path, entries.len());
        Ok(DirectoryListing {
            directory: self.definition(store_path, &dir, &meta),
            documents: entries.into_iter().map(|(d, _)| d).collect(),
            parent,
        })
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), ServiceError> {
        let store_path = match id {
            DocumentId::Named(path) => normalize(path),
            DocumentId::Numeric(n) => return Err(ServiceError::NotFound(n.to_string())),
        };
        if store_path == "/" {
            return Err(ServiceError::Forbidden("the store root cannot be deleted".into()));
        }
        let target = self.resolve(&store_path)?;
        let meta = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(|e| map_io(e, &store_path))?;
        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed.map_err(|e| map_io(e, &store_path))?;
        info!("deleted {}", store_path);
        Ok(())
    }

    async fn upload_document(
        &self,
        form: &UploadForm,
        on_progress: ProgressFn,
    ) -> Result<(), ServiceError> {
        let dir = self.resolve(&form.directory)?;
        if !dir.is_dir() {
            return Err(ServiceError::NotFound(form.directory.clone()));
        }
        let file_name = form
            .file
            .file_name()
            .ok_or_else(|| ServiceError::InvalidPath(form.file.display().to_string()))?;
        let dest = resolve_collision(&dir.join(file_name));

        let source_label = form.file.display().to_string();
        let mut source = tokio::fs::File::open(&form.file)
            .await
            .map_err(|e| map_io(e, &source_label))?;
        let total = source.metadata().await?.len();
        let mut target = tokio::fs::File::create(&dest).await?;

        on_progress(0, total);
        let mut loaded = 0u64;
        let mut buf = vec![0u8; UPLOAD_CHUNK_BYTES];
        let copied: Result<(), io::Error> = async {
            loop {
                let n = source.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                target.write_all(&buf[..n]).await?;
                loaded += n as u64;
                on_progress(loaded, total);
            }
            target.flush().await
        }
        .await;

        if let Err(e) = copied {
            drop(target);
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e.into());
        }
        info!("uploaded {} to {}", source_label, dest.display());
        Ok(())
    }

    async fn create_folder(&self, path: &str, name: &str) -> Result<(), ServiceError> {
        validate_name(name)?;
        let dir = self.resolve(path)?;
        let target = dir.join(name);
        let label = join(&normalize(path), name);
        tokio::fs::create_dir(&target).await.map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ServiceError::AlreadyExists(label.clone()),
            _ => map_io(e, &label),
        })?;
        info!("created folder {}", label);
        Ok(())
    }

    fn export_url(&self, ids: &[DocumentId]) -> Result<String, ServiceError> {
        build_export_url(&self.options.export_base_url, ids)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Canonical store path: leading `/`, no empty segments, no trailing `/`.
pub fn normalize(path: &str) -> String {
    let joined: Vec<&str> = segments(path).collect();
    format!("/{}", joined.join("/"))
}

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

fn parent_of(store_path: &str) -> Option<String> {
    if store_path == "/" {
        return None;
    }
    let idx = store_path.rfind('/')?;
    Some(normalize(&store_path[..idx]))
}

fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(ServiceError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn map_io(err: io::Error, path: &str) -> ServiceError {
    match err.kind() {
        io::ErrorKind::NotFound => ServiceError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => ServiceError::Forbidden(path.to_string()),
        _ => ServiceError::Io(err),
    }
}

fn sort_entries(
    entries: &mut [(EntryDefinition, Option<SystemTime>)],
    sort_by: SortBy,
    dirs_first: bool,
) {
    entries.sort_by(|(a, a_modified), (b, b_modified)| {
        let mut cmp = std::cmp::Ordering::Equal;

        if dirs_first {
            cmp = b.is_directory().cmp(&a.is_directory());
        }

        cmp.then_with(|| match sort_by {
            SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortBy::Size => b.size.cmp(&a.size),
            SortBy::Modified => b_modified.cmp(a_modified),
        })
    });
}

/// Resolve a name collision by appending `_copy`, `_copy2`, etc.
///
/// Returns a path that does not exist yet in the destination directory.
pub fn resolve_collision(dest: &Path) -> PathBuf {
    if !dest.exists() {
        return dest.to_path_buf();
    }

    let parent = dest.parent().unwrap_or(Path::new("."));
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().to_string());

    for i in 1..=1000 {
        let suffix = if i == 1 {
            "_copy".to_string()
        } else {
            format!("_copy{}", i)
        };
        let new_name = match &ext {
            Some(e) => format!("{}{}.{}", stem, suffix, e),
            None => format!("{}{}", stem, suffix),
        };
        let candidate = parent.join(&new_name);
        if !candidate.exists() {
            return candidate;
        }
    }

    dest.to_path_buf()
}
