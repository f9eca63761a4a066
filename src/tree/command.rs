use crate::service::{DocumentId, UploadForm};

use super::node::NodeId;

/// A side effect requested by the tree.
///
/// The tree never performs I/O itself; the app runs each command against the
/// document service and feeds the outcome back through the matching
/// completion method (`load_finished`, `delete_finished`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the directory at `path`; complete with `FileTree::load_finished`.
    List { node: NodeId, path: String },
    /// Delete one staged entry; complete with `FileTree::delete_finished`.
    Delete {
        stager: NodeId,
        target: NodeId,
        id: DocumentId,
    },
    /// Upload a file into the node's directory; complete with
    /// `FileTree::upload_finished`.
    Upload { node: NodeId, form: UploadForm },
    /// Create a folder in the node's directory; complete with
    /// `FileTree::folder_created`.
    CreateFolder {
        node: NodeId,
        path: String,
        name: String,
    },
    /// Export (download) the given documents.
    Export(Vec<DocumentId>),
    /// Hand a resource URL to the host.
    Navigate(String),
}
