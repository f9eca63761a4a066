use std::fmt;

use crate::service::EntryDefinition;

/// Arena key of a node. Ids are never reused within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node is in its listing lifecycle.
///
/// `Error` is terminal for a load attempt: the node was loaded, but the
/// listing failed. Only an explicit invalidation moves it back to `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Error,
}

/// Progress of the last upload started from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

/// One file or directory entry in the tree.
#[derive(Debug, Clone)]
pub struct FileTreeNode {
    pub id: NodeId,
    /// Last path segment; empty for the tree root.
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub definition: EntryDefinition,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub load_state: LoadState,
    pub selected: bool,
    /// Nodes staged for the next delete confirmation, in order.
    pub pending_deletion: Vec<NodeId>,
    pub upload_state: UploadState,
    /// Upload progress in percent, for display only.
    pub upload_progress: u8,
}

impl FileTreeNode {
    /// Build a node from an entry definition. No I/O happens here.
    pub fn new(id: NodeId, definition: EntryDefinition, parent: Option<NodeId>) -> Self {
        let path = definition.name.clone();
        let name = match path.rfind('/') {
            Some(idx) => path[idx + 1..].to_string(),
            None => path.clone(),
        };
        Self {
            id,
            name,
            path,
            is_directory: definition.is_directory(),
            definition,
            parent,
            children: Vec::new(),
            load_state: LoadState::Unloaded,
            selected: false,
            pending_deletion: Vec::new(),
            upload_state: UploadState::Idle,
            upload_progress: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// True once a load attempt finished, successfully or not.
    pub fn loaded(&self) -> bool {
        matches!(self.load_state, LoadState::Loaded | LoadState::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.load_state == LoadState::Error
    }

    pub fn uploading(&self) -> bool {
        self.upload_state == UploadState::Uploading
    }

    /// True once an upload attempt finished, successfully or not.
    pub fn upload_complete(&self) -> bool {
        matches!(self.upload_state, UploadState::Succeeded | UploadState::Failed)
    }

    pub fn upload_failed(&self) -> bool {
        self.upload_state == UploadState::Failed
    }

    /// Display label: the name, or `/` for the root.
    pub fn label(&self) -> &str {
        if self.is_root() {
            "/"
        } else {
            &self.name
        }
    }
}

/// Percentage of `loaded` over `total`, rounded to the nearest integer.
pub fn upload_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
