use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, warn};

use crate::service::{DirectoryListing, EntryDefinition, ServiceError, UploadForm};

use super::command::Command;
use super::node::{upload_percent, FileTreeNode, LoadState, NodeId, UploadState};

/// Arena of tree nodes plus the active-directory pointer.
///
/// Every operation updates node state and returns the side effect it needs
/// as a [`Command`]; completions come back through the `*_finished` methods.
pub struct FileTree {
    nodes: HashMap<NodeId, FileTreeNode>,
    active: NodeId,
    next_id: usize,
}

impl FileTree {
    /// Create a tree holding one unloaded node, which becomes active.
    pub fn new(definition: EntryDefinition) -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            active: NodeId(0),
            next_id: 0,
        };
        tree.active = tree.insert(definition, None);
        tree
    }

    fn insert(&mut self, definition: EntryDefinition, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes
            .insert(id, FileTreeNode::new(id, definition, parent));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&FileTreeNode> {
        self.nodes.get(&id)
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn active(&self) -> NodeId {
        self.active
    }

    pub fn active_node(&self) -> Option<&FileTreeNode> {
        self.nodes.get(&self.active)
    }

    /// Children of a node, empty until its first successful load.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors of `id`, topmost first, excluding `id` itself.
    pub fn breadcrumbs(&self, id: NodeId) -> Vec<NodeId> {
        let mut crumbs = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            crumbs.push(parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        crumbs.reverse();
        crumbs
    }

    // ── Open / load ──────────────────────────────────────────────────────

    /// Directories become active and load on first open; files navigate.
    pub fn open(&mut self, id: NodeId) -> Option<Command> {
        let node = self.nodes.get(&id)?;
        if node.is_directory {
            let needs_load = node.load_state == LoadState::Unloaded;
            self.active = id;
            if needs_load {
                return self.load(id);
            }
            None
        } else {
            node.definition.absolute_url.clone().map(Command::Navigate)
        }
    }

    /// Start a listing fetch.
    ///
    /// No-op while a fetch is in flight, and after a failed fetch until
    /// [`FileTree::invalidate`] resets the node.
    pub fn load(&mut self, id: NodeId) -> Option<Command> {
        let node = self.nodes.get_mut(&id)?;
        if !node.is_directory {
            return None;
        }
        match node.load_state {
            LoadState::Loading => return None,
            LoadState::Error => {
                debug!("{} ({}) failed earlier, not reloading", id, node.path);
                return None;
            }
            LoadState::Unloaded | LoadState::Loaded => {}
        }
        node.load_state = LoadState::Loading;
        debug!("{} loading {}", id, node.path);
        Some(Command::List {
            node: id,
            path: node.path.clone(),
        })
    }

    /// Reset a node to `Unloaded` so the next load fetches again.
    pub fn invalidate(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.load_state != LoadState::Loading {
                node.load_state = LoadState::Unloaded;
            }
        }
    }

    /// Apply the outcome of a `Command::List`.
    ///
    /// When the active node is replaced by a fresh child for the same path,
    /// returns the load for that child.
    pub fn load_finished(
        &mut self,
        id: NodeId,
        result: Result<DirectoryListing, ServiceError>,
    ) -> Option<Command> {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!("dropping listing for discarded node {}", id);
            return None;
        };

        let listing = match result {
            Ok(listing) => listing,
            Err(e) => {
                warn!("listing {} failed: {}", node.path, e);
                node.load_state = LoadState::Error;
                return None;
            }
        };

        node.definition = listing.directory;
        node.load_state = LoadState::Loaded;
        let stale = std::mem::take(&mut node.children);
        let needs_parent = node.parent.is_none();

        // Nodes that were given `id` as a synthetic parent before it loaded.
        let mut adopted: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parent == Some(id) && !stale.contains(&n.id))
            .map(|n| n.id)
            .collect();

        let mut discarded = Vec::new();
        for child in stale {
            self.discard_subtree(child, &mut discarded);
        }

        let children: Vec<NodeId> = listing
            .documents
            .into_iter()
            .map(|definition| {
                let reused = adopted.iter().position(|a| {
                    self.nodes.get(a).is_some_and(|n| n.path == definition.name)
                });
                match reused {
                    Some(idx) => {
                        let kept = adopted.swap_remove(idx);
                        if let Some(node) = self.nodes.get_mut(&kept) {
                            node.definition = definition;
                        }
                        kept
                    }
                    None => self.insert(definition, Some(id)),
                }
            })
            .collect();
        for orphan in adopted {
            self.discard_subtree(orphan, &mut discarded);
        }

        let mut follow_up = None;
        if let Some(active_path) = discarded
            .iter()
            .find(|(discarded_id, _)| *discarded_id == self.active)
            .map(|(_, path)| path.clone())
        {
            let replacement = children
                .iter()
                .copied()
                .find(|c| self.nodes.get(c).is_some_and(|n| n.path == active_path));
            match replacement {
                Some(replacement) => {
                    debug!("{} replaced active {}", replacement, active_path);
                    self.active = replacement;
                    follow_up = self.load(replacement);
                }
                None => self.active = id,
            }
        }

        let parent = match (needs_parent, listing.parent) {
            (true, Some(parent_def)) => Some(self.insert(parent_def, None)),
            _ => None,
        };

        if let Some(node) = self.nodes.get_mut(&id) {
            debug!("{} loaded {} ({} children)", id, node.path, children.len());
            node.children = children;
            if parent.is_some() {
                node.parent = parent;
            }
        }
        follow_up
    }

    fn discard_subtree(&mut self, id: NodeId, discarded: &mut Vec<(NodeId, String)>) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.discard_subtree(child, discarded);
            }
            discarded.push((id, node.path));
        }
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Flip one node's selection. Parents and children are untouched.
    pub fn toggle_selected(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.selected = !node.selected;
        }
    }

    /// Unselect every child of `id`.
    pub fn clear_selection(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.selected = false;
            }
        }
    }

    /// Selected children of `id`, in listing order.
    pub fn selected_entries(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.nodes.get(c).is_some_and(|n| n.selected))
            .collect()
    }

    /// Targets of an action invoked on `id` itself: its selected children,
    /// or just `id` when nothing is selected.
    pub fn top_targets(&self, id: NodeId) -> Vec<NodeId> {
        let selected = self.selected_entries(id);
        if selected.is_empty() {
            vec![id]
        } else {
            selected
        }
    }

    /// Targets of an action invoked on an item of its parent's listing.
    ///
    /// Returns the node whose selection was consulted along with the targets.
    pub fn context_targets(&self, id: NodeId) -> Option<(NodeId, Vec<NodeId>)> {
        let node = self.nodes.get(&id)?;
        match node.parent {
            Some(parent) if node.selected => Some((parent, self.selected_entries(parent))),
            Some(parent) => Some((parent, vec![id])),
            None => Some((id, vec![id])),
        }
    }

    // ── Delete ───────────────────────────────────────────────────────────

    /// Stage `id`'s selection (or `id` itself). Returns the staging node.
    pub fn stage_top_delete(&mut self, id: NodeId) -> Option<NodeId> {
        let targets = self.top_targets(id);
        self.stage(id, targets)
    }

    /// Stage the item under the cursor (or its parent's selection when the
    /// item is part of it). Returns the staging node.
    pub fn stage_context_delete(&mut self, id: NodeId) -> Option<NodeId> {
        let (stager, targets) = self.context_targets(id)?;
        self.stage(stager, targets)
    }

    fn stage(&mut self, stager: NodeId, targets: Vec<NodeId>) -> Option<NodeId> {
        let node = self.nodes.get_mut(&stager)?;
        debug!("{} staged {} entries for deletion", stager, targets.len());
        node.pending_deletion = targets;
        Some(stager)
    }

    pub fn pending_deletion(&self, stager: NodeId) -> &[NodeId] {
        self.nodes
            .get(&stager)
            .map(|n| n.pending_deletion.as_slice())
            .unwrap_or(&[])
    }

    pub fn cancel_delete(&mut self, stager: NodeId) {
        if let Some(node) = self.nodes.get_mut(&stager) {
            node.pending_deletion.clear();
        }
    }

    /// Run a confirmed deletion: entries are deleted one at a time, in
    /// staging order.
    pub fn confirm_delete(&mut self, stager: NodeId) -> Option<Command> {
        let node = self.nodes.get(&stager)?;
        if node.pending_deletion.contains(&stager) {
            if let Some(parent) = node.parent {
                self.active = parent;
            }
        }
        self.next_delete(stager)
    }

    /// Apply the outcome of a `Command::Delete`.
    ///
    /// A failure drops the rest of the batch. Either way the active node is
    /// reloaded once the batch is over.
    pub fn delete_finished(
        &mut self,
        stager: NodeId,
        result: Result<(), ServiceError>,
    ) -> Option<Command> {
        match result {
            Ok(()) => self.next_delete(stager),
            Err(e) => {
                warn!("delete failed, aborting batch: {}", e);
                self.abort_delete(stager)
            }
        }
    }

    fn next_delete(&mut self, stager: NodeId) -> Option<Command> {
        let next = self.nodes.get_mut(&stager).and_then(|node| {
            if node.pending_deletion.is_empty() {
                None
            } else {
                Some(node.pending_deletion.remove(0))
            }
        });
        let Some(next) = next else {
            return self.load(self.active);
        };
        match self.nodes.get(&next).and_then(|n| n.definition.id.clone()) {
            Some(id) => Some(Command::Delete {
                stager,
                target: next,
                id,
            }),
            None => {
                warn!("{} has no document id, aborting batch", next);
                self.abort_delete(stager)
            }
        }
    }

    fn abort_delete(&mut self, stager: NodeId) -> Option<Command> {
        self.cancel_delete(stager);
        self.load(self.active)
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Start uploading `file` into directory `id`.
    pub fn begin_upload(&mut self, id: NodeId, file: PathBuf) -> Option<Command> {
        let node = self.nodes.get_mut(&id)?;
        if !node.is_directory {
            return None;
        }
        node.upload_state = UploadState::Uploading;
        node.upload_progress = 0;
        Some(Command::Upload {
            node: id,
            form: UploadForm {
                directory: node.path.clone(),
                file,
            },
        })
    }

    pub fn upload_progress(&mut self, id: NodeId, loaded: u64, total: u64) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.upload_progress = upload_percent(loaded, total);
        }
    }

    /// Apply the outcome of a `Command::Upload`; success reloads the node.
    pub fn upload_finished(&mut self, id: NodeId, result: Result<(), ServiceError>) -> Option<Command> {
        let node = self.nodes.get_mut(&id)?;
        match result {
            Ok(()) => {
                node.upload_state = UploadState::Succeeded;
                node.upload_progress = 100;
                self.load(id)
            }
            Err(e) => {
                warn!("upload into {} failed: {}", node.path, e);
                node.upload_state = UploadState::Failed;
                None
            }
        }
    }

    /// Reset upload flags once the result has been dismissed.
    pub fn close_upload(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.upload_state = UploadState::Idle;
            node.upload_progress = 0;
        }
    }

    // ── Download ─────────────────────────────────────────────────────────

    pub fn top_download(&self, id: NodeId) -> Option<Command> {
        self.export(self.top_targets(id))
    }

    pub fn context_download(&self, id: NodeId) -> Option<Command> {
        let node = self.nodes.get(&id)?;
        match node.parent {
            Some(parent) if node.selected => self.top_download(parent),
            _ => self.export(vec![id]),
        }
    }

    fn export(&self, targets: Vec<NodeId>) -> Option<Command> {
        let ids: Vec<_> = targets
            .iter()
            .filter_map(|t| self.nodes.get(t))
            .filter_map(|n| n.definition.id.clone())
            .collect();
        if ids.is_empty() {
            warn!("nothing to export: no target has a document id");
            return None;
        }
        Some(Command::Export(ids))
    }

    // ── Create directory ─────────────────────────────────────────────────

    pub fn create_directory(&self, id: NodeId, name: &str) -> Option<Command> {
        let node = self.nodes.get(&id)?;
        if !node.is_directory {
            return None;
        }
        Some(Command::CreateFolder {
            node: id,
            path: node.path.clone(),
            name: name.to_string(),
        })
    }

    /// Apply the outcome of a `Command::CreateFolder`; success reloads.
    pub fn folder_created(&mut self, id: NodeId, result: Result<(), ServiceError>) -> Option<Command> {
        match result {
            Ok(()) => self.load(id),
            Err(e) => {
                warn!("create folder in {} failed: {}", id, e);
                None
            }
        }
    }
}
