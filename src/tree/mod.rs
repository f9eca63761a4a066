//! Lazily-loaded document tree.
//!
//! Nodes live in an arena owned by [`FileTree`] and refer to their parent by
//! [`NodeId`]. Loading, deleting, uploading and exporting are modelled as a
//! state machine that hands its I/O back to the caller as [`Command`]s.

pub mod command;
pub mod node;
pub mod state;

pub use command::Command;
pub use node::{FileTreeNode, LoadState, NodeId, UploadState};
pub use state::FileTree;
