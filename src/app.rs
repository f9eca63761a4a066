use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::AppConfig;
use crate::event::{Event, ServiceEvent};
use crate::service::local::normalize;
use crate::service::{DocumentService, EntryDefinition, ProgressFn};
use crate::tree::{Command, FileTree, NodeId};

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    CreateDirectory,
    Upload,
    DeleteConfirm { stager: NodeId, targets: Vec<String> },
    UploadProgress { node: NodeId },
    Error { message: String },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
}

/// Main application state.
pub struct App {
    pub tree: FileTree,
    /// Index of the highlighted entry in the active listing.
    pub cursor: usize,
    pub scroll_offset: usize,
    pub should_quit: bool,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<(String, Instant)>,
    pub status_is_error: bool,
    pub confirm_delete: bool,
    pub open_links: bool,
    /// Path to highlight once the active listing arrives.
    pending_focus: Option<String>,
    service: Arc<dyn DocumentService>,
    event_tx: UnboundedSender<Event>,
}

impl App {
    /// Create an app showing `start_path`. Nothing is fetched until `start`.
    pub fn new(
        service: Arc<dyn DocumentService>,
        config: &AppConfig,
        event_tx: UnboundedSender<Event>,
    ) -> Self {
        let start = EntryDefinition::directory(normalize(config.start_path()));
        Self {
            tree: FileTree::new(start),
            cursor: 0,
            scroll_offset: 0,
            should_quit: false,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            status_is_error: false,
            confirm_delete: config.confirm_delete(),
            open_links: config.open_links(),
            pending_focus: None,
            service,
            event_tx,
        }
    }

    /// Open the start directory.
    pub fn start(&mut self) {
        let command = self.tree.open(self.tree.active());
        self.dispatch(command);
    }

    // ── Command dispatch ────────────────────────────────────────────────────

    /// Run a tree command. Service calls are spawned; their outcome comes
    /// back as `Event::Service` on the UI channel.
    pub fn dispatch(&mut self, command: Option<Command>) {
        let Some(command) = command else {
            return;
        };
        debug!("dispatch {:?}", command);
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();

        match command {
            Command::List { node, path } => {
                tokio::spawn(async move {
                    let result = service.list_directory(&path).await;
                    let _ = tx.send(Event::Service(ServiceEvent::Listed { node, result }));
                });
            }
            Command::Delete { stager, target, id } => {
                tokio::spawn(async move {
                    let result = service.delete_document(&id).await;
                    let _ = tx.send(Event::Service(ServiceEvent::Deleted {
                        stager,
                        target,
                        result,
                    }));
                });
            }
            Command::Upload { node, form } => {
                let progress_tx = tx.clone();
                let on_progress: ProgressFn = Box::new(move |loaded, total| {
                    let _ = progress_tx.send(Event::Service(ServiceEvent::UploadProgress {
                        node,
                        loaded,
                        total,
                    }));
                });
                tokio::spawn(async move {
                    let result = service.upload_document(&form, on_progress).await;
                    let _ = tx.send(Event::Service(ServiceEvent::Uploaded { node, result }));
                });
            }
            Command::CreateFolder { node, path, name } => {
                tokio::spawn(async move {
                    let result = service.create_folder(&path, &name).await;
                    let _ = tx.send(Event::Service(ServiceEvent::FolderCreated {
                        node,
                        name,
                        result,
                    }));
                });
            }
            Command::Export(ids) => match self.service.export_url(&ids) {
                Ok(url) => self.navigate(url),
                Err(e) => self.set_error_message(format!("Export failed: {}", e)),
            },
            Command::Navigate(url) => self.navigate(url),
        }
    }

    fn navigate(&mut self, url: String) {
        info!("navigate to {}", url);
        if !self.open_links {
            self.set_status_message(url);
            return;
        }
        match open::that_detached(&url) {
            Ok(()) => self.set_status_message(format!("Opened {}", url)),
            Err(e) => {
                warn!("could not open {}: {}", url, e);
                self.set_error_message(format!("Could not open {}: {}", url, e));
            }
        }
    }

    /// Apply the outcome of a service call.
    pub fn handle_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Listed { node, result } => {
                if let Err(e) = &result {
                    if node == self.tree.active() {
                        self.set_error_message(format!("Could not list directory: {}", e));
                    }
                }
                let focus = self
                    .highlighted()
                    .and_then(|id| self.tree.get(id))
                    .map(|n| n.path.clone());
                let command = self.tree.load_finished(node, result);
                if command.is_some() {
                    // The active directory was rebuilt; its listing is refetched.
                    self.pending_focus = focus;
                } else if node == self.tree.active() {
                    self.restore_focus();
                }
                self.clamp_cursor();
                self.dispatch(command);
            }
            ServiceEvent::Deleted {
                stager,
                target,
                result,
            } => {
                let label = self
                    .tree
                    .get(target)
                    .map(|n| n.label().to_string())
                    .unwrap_or_default();
                match &result {
                    Ok(()) => self.set_status_message(format!("Deleted {}", label)),
                    Err(e) => self.set_error_message(format!("Delete of {} failed: {}", label, e)),
                }
                let command = self.tree.delete_finished(stager, result);
                self.dispatch(command);
            }
            ServiceEvent::UploadProgress {
                node,
                loaded,
                total,
            } => {
                self.tree.upload_progress(node, loaded, total);
            }
            ServiceEvent::Uploaded { node, result } => {
                match &result {
                    Ok(()) => self.set_status_message("Upload complete".to_string()),
                    Err(e) => self.set_error_message(format!("Upload failed: {}", e)),
                }
                let command = self.tree.upload_finished(node, result);
                if self.mode != AppMode::Dialog(DialogKind::UploadProgress { node }) {
                    self.tree.close_upload(node);
                }
                self.dispatch(command);
            }
            ServiceEvent::FolderCreated { node, name, result } => {
                match &result {
                    Ok(()) => self.set_status_message(format!("Created folder {}", name)),
                    Err(e) => self.set_error_message(format!("Could not create {}: {}", name, e)),
                }
                let command = self.tree.folder_created(node, result);
                self.dispatch(command);
            }
        }
    }

    // ── Listing navigation ──────────────────────────────────────────────────

    /// Children of the active directory.
    pub fn entries(&self) -> &[NodeId] {
        self.tree.children(self.tree.active())
    }

    /// The entry under the cursor.
    pub fn highlighted(&self) -> Option<NodeId> {
        self.entries().get(self.cursor).copied()
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        let len = self.entries().len();
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    /// Move selection up by one item.
    pub fn select_previous(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// Jump to the first item.
    pub fn select_first(&mut self) {
        self.cursor = 0;
    }

    /// Jump to the last item.
    pub fn select_last(&mut self) {
        let len = self.entries().len();
        if len > 0 {
            self.cursor = len - 1;
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.entries().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn restore_focus(&mut self) {
        let Some(path) = self.pending_focus.take() else {
            return;
        };
        if let Some(idx) = self
            .entries()
            .iter()
            .position(|id| self.tree.get(*id).is_some_and(|n| n.path == path))
        {
            self.cursor = idx;
        }
    }

    /// Update the scroll offset to ensure the highlighted entry is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + visible_height {
            self.scroll_offset = self.cursor - visible_height + 1;
        }
    }

    /// Open the highlighted entry: enter a directory or navigate to a file.
    pub fn open_highlighted(&mut self) {
        let Some(id) = self.highlighted() else {
            return;
        };
        let before = self.tree.active();
        let command = self.tree.open(id);
        if self.tree.active() != before {
            self.cursor = 0;
            self.scroll_offset = 0;
        }
        self.dispatch(command);
    }

    /// Open the parent of the active directory, keeping the cursor on the
    /// directory we came from.
    pub fn go_up(&mut self) {
        let Some(current) = self.tree.active_node() else {
            return;
        };
        let Some(parent) = current.parent else {
            return;
        };
        let came_from = current.path.clone();
        let command = self.tree.open(parent);
        self.cursor = 0;
        self.scroll_offset = 0;
        self.pending_focus = Some(came_from);
        if command.is_none() {
            self.restore_focus();
        }
        self.dispatch(command);
    }

    /// Invalidate and refetch the active directory.
    pub fn reload(&mut self) {
        let active = self.tree.active();
        self.tree.invalidate(active);
        let command = self.tree.load(active);
        self.dispatch(command);
    }

    // ── Selection ───────────────────────────────────────────────────────────

    pub fn toggle_highlighted(&mut self) {
        if let Some(id) = self.highlighted() {
            self.tree.toggle_selected(id);
        }
    }

    pub fn clear_selection(&mut self) {
        let active = self.tree.active();
        self.tree.clear_selection(active);
    }

    pub fn selected_count(&self) -> usize {
        self.tree.selected_entries(self.tree.active()).len()
    }

    // ── Delete ──────────────────────────────────────────────────────────────

    /// Delete the active directory's selection, or the directory itself.
    pub fn delete_top(&mut self) {
        let active = self.tree.active();
        if let Some(stager) = self.tree.stage_top_delete(active) {
            self.request_delete(stager);
        }
    }

    /// Delete the highlighted entry, or the selection it belongs to.
    pub fn delete_highlighted(&mut self) {
        let Some(id) = self.highlighted() else {
            return;
        };
        if let Some(stager) = self.tree.stage_context_delete(id) {
            self.request_delete(stager);
        }
    }

    fn request_delete(&mut self, stager: NodeId) {
        if !self.confirm_delete {
            self.run_delete(stager);
            return;
        }
        let targets = self
            .tree
            .pending_deletion(stager)
            .iter()
            .filter_map(|id| self.tree.get(*id))
            .map(|n| n.label().to_string())
            .collect();
        self.open_dialog(DialogKind::DeleteConfirm { stager, targets });
    }

    /// Start a staged deletion. Deleting the open directory moves the view
    /// to its parent; the reload after the batch focuses the deleted path
    /// if it survived.
    fn run_delete(&mut self, stager: NodeId) {
        let before = self.tree.active();
        let before_path = self.tree.active_node().map(|n| n.path.clone());
        let command = self.tree.confirm_delete(stager);
        if self.tree.active() != before {
            self.cursor = 0;
            self.scroll_offset = 0;
            self.pending_focus = before_path;
        }
        self.dispatch(command);
    }

    // ── Download ────────────────────────────────────────────────────────────

    pub fn download_top(&mut self) {
        let command = self.tree.top_download(self.tree.active());
        if command.is_none() {
            self.set_error_message("Nothing to download".to_string());
        }
        self.dispatch(command);
    }

    pub fn download_highlighted(&mut self) {
        let Some(id) = self.highlighted() else {
            return;
        };
        let command = self.tree.context_download(id);
        if command.is_none() {
            self.set_error_message("Nothing to download".to_string());
        }
        self.dispatch(command);
    }

    // ── Dialogs ─────────────────────────────────────────────────────────────

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    pub fn open_upload_dialog(&mut self) {
        let uploading = self.tree.active_node().is_some_and(|n| n.uploading());
        if uploading {
            self.set_error_message("An upload is already running here".to_string());
            return;
        }
        self.open_dialog(DialogKind::Upload);
    }

    pub fn open_create_dir_dialog(&mut self) {
        self.open_dialog(DialogKind::CreateDirectory);
    }

    /// Confirm the current dialog (Enter / `y`).
    pub fn submit_dialog(&mut self) {
        let AppMode::Dialog(kind) = self.mode.clone() else {
            return;
        };
        let input = self.dialog_state.input.trim().to_string();
        let active = self.tree.active();
        match kind {
            DialogKind::CreateDirectory => {
                self.close_dialog();
                if input.is_empty() {
                    return;
                }
                let command = self.tree.create_directory(active, &input);
                self.dispatch(command);
            }
            DialogKind::Upload => {
                if input.is_empty() {
                    self.close_dialog();
                    return;
                }
                let command = self.tree.begin_upload(active, PathBuf::from(input));
                self.open_dialog(DialogKind::UploadProgress { node: active });
                self.dispatch(command);
            }
            DialogKind::DeleteConfirm { stager, .. } => {
                self.close_dialog();
                self.run_delete(stager);
            }
            DialogKind::UploadProgress { .. } | DialogKind::Error { .. } => self.cancel_dialog(),
        }
    }

    /// Dismiss the current dialog (Esc / `n`).
    pub fn cancel_dialog(&mut self) {
        let AppMode::Dialog(kind) = self.mode.clone() else {
            return;
        };
        match kind {
            DialogKind::DeleteConfirm { stager, .. } => self.tree.cancel_delete(stager),
            DialogKind::UploadProgress { node } => {
                let finished = self.tree.get(node).is_some_and(|n| n.upload_complete());
                if finished {
                    self.tree.close_upload(node);
                }
            }
            _ => {}
        }
        self.close_dialog();
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let byte_pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..byte_pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    /// Move cursor left by one character.
    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
        }
    }

    /// Move cursor right by one character.
    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next_char) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next_char.len_utf8();
        }
    }

    // ── Status bar ──────────────────────────────────────────────────────────

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
        self.status_is_error = false;
    }

    /// Set an error status message with current timestamp.
    pub fn set_error_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
        self.status_is_error = true;
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Labels from the topmost ancestor down to the active directory.
    pub fn breadcrumb_labels(&self) -> Vec<String> {
        let active = self.tree.active();
        self.tree
            .breadcrumbs(active)
            .into_iter()
            .chain(std::iter::once(active))
            .filter_map(|id| self.tree.get(id))
            .map(|n| n.label().to_string())
            .collect()
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::service::{
        build_export_url, DirectoryListing, DocumentId, ServiceError, UploadForm,
    };

    /// In-memory service that records every call.
    #[derive(Default)]
    struct FakeService {
        listings: HashMap<String, DirectoryListing>,
        failing_deletes: HashSet<DocumentId>,
        fail_uploads: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl DocumentService for FakeService {
        async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ServiceError> {
            self.record(format!("list {}", path));
            self.listings
                .get(path)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(path.to_string()))
        }

        async fn delete_document(&self, id: &DocumentId) -> Result<(), ServiceError> {
            self.record(format!("delete {}", id));
            if self.failing_deletes.contains(id) {
                return Err(ServiceError::Forbidden(id.to_string()));
            }
            Ok(())
        }

        async fn upload_document(
            &self,
            form: &UploadForm,
            on_progress: ProgressFn,
        ) -> Result<(), ServiceError> {
            self.record(format!("upload {} -> {}", form.file.display(), form.directory));
            on_progress(5, 10);
            if self.fail_uploads {
                return Err(ServiceError::Forbidden("read-only".into()));
            }
            on_progress(10, 10);
            Ok(())
        }

        async fn create_folder(&self, path: &str, name: &str) -> Result<(), ServiceError> {
            self.record(format!("mkdir {} {}", path, name));
            if name == "taken" {
                return Err(ServiceError::AlreadyExists(name.to_string()));
            }
            Ok(())
        }

        fn export_url(&self, ids: &[DocumentId]) -> Result<String, ServiceError> {
            build_export_url("http://docs", ids)
        }
    }

    fn dir(path: &str, id: u64) -> EntryDefinition {
        EntryDefinition::directory(path).with_id(DocumentId::Numeric(id))
    }

    fn doc(path: &str, id: u64) -> EntryDefinition {
        EntryDefinition::new(path, "file").with_id(DocumentId::Numeric(id))
    }

    fn fake_service() -> FakeService {
        let mut service = FakeService::default();
        service.listings.insert(
            "/".to_string(),
            DirectoryListing {
                directory: dir("/", 1),
                documents: vec![dir("/a", 2), doc("/b", 3), doc("/c", 4)],
                parent: None,
            },
        );
        service.listings.insert(
            "/a".to_string(),
            DirectoryListing {
                directory: dir("/a", 2),
                documents: vec![doc("/a/x", 5)],
                parent: Some(dir("/", 1)),
            },
        );
        service
    }

    fn quiet_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.general.open_links = Some(false);
        config
    }

    fn setup(service: FakeService) -> (App, Arc<FakeService>, UnboundedReceiver<Event>) {
        setup_with(service, quiet_config())
    }

    fn setup_with(
        service: FakeService,
        config: AppConfig,
    ) -> (App, Arc<FakeService>, UnboundedReceiver<Event>) {
        let service = Arc::new(service);
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(service.clone(), &config, tx);
        (app, service, rx)
    }

    /// Feed service events back into the app until the channel goes quiet.
    async fn pump(app: &mut App, rx: &mut UnboundedReceiver<Event>) {
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
        {
            if let Event::Service(event) = event {
                app.handle_service_event(event);
            }
        }
    }

    fn entry_names(app: &App) -> Vec<String> {
        app.entries()
            .iter()
            .map(|id| app.tree.get(*id).unwrap().name.clone())
            .collect()
    }

    #[tokio::test]
    async fn start_lists_the_start_directory() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /"]);
        assert_eq!(entry_names(&app), vec!["a", "b", "c"]);
        assert_eq!(app.breadcrumb_labels(), vec!["/"]);
    }

    #[tokio::test]
    async fn open_directory_then_go_up_restores_cursor() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.open_highlighted();
        pump(&mut app, &mut rx).await;
        assert_eq!(entry_names(&app), vec!["x"]);
        assert_eq!(app.breadcrumb_labels(), vec!["/", "a"]);

        app.go_up();
        pump(&mut app, &mut rx).await;
        assert_eq!(entry_names(&app), vec!["a", "b", "c"]);
        assert_eq!(app.cursor, 0);
        // The root was already loaded, so going up fetched nothing.
        assert_eq!(service.calls(), vec!["list /", "list /a"]);
    }

    #[tokio::test]
    async fn start_below_root_attaches_parent() {
        let mut config = quiet_config();
        config.general.start_path = Some("/a".to_string());
        let (mut app, service, mut rx) = setup_with(fake_service(), config);
        app.start();
        pump(&mut app, &mut rx).await;
        assert_eq!(app.breadcrumb_labels(), vec!["/", "a"]);

        app.go_up();
        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /a", "list /"]);
        assert_eq!(entry_names(&app), vec!["a", "b", "c"]);
        assert_eq!(app.cursor, 0);
    }

    #[tokio::test]
    async fn confirmed_delete_runs_in_order_and_reloads() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.toggle_highlighted();
        app.select_last();
        app.toggle_highlighted();
        app.delete_top();
        assert!(matches!(
            &app.mode,
            AppMode::Dialog(DialogKind::DeleteConfirm { targets, .. })
                if targets == &vec!["a".to_string(), "c".to_string()]
        ));

        app.submit_dialog();
        pump(&mut app, &mut rx).await;
        assert_eq!(
            service.calls(),
            vec!["list /", "delete 2", "delete 4", "list /"]
        );
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[tokio::test]
    async fn failed_delete_skips_the_rest_of_the_batch() {
        let mut service = fake_service();
        service.failing_deletes.insert(DocumentId::Numeric(2));
        let (mut app, service, mut rx) = setup(service);
        app.start();
        pump(&mut app, &mut rx).await;

        app.toggle_highlighted();
        app.select_next();
        app.toggle_highlighted();
        app.delete_highlighted();
        app.submit_dialog();
        pump(&mut app, &mut rx).await;

        assert_eq!(service.calls(), vec!["list /", "delete 2", "list /"]);
        assert!(app.status_is_error);
    }

    /// `/a` with two children, so the cursor can sit off the first row.
    fn wide_service() -> FakeService {
        let mut service = fake_service();
        service.listings.insert(
            "/a".to_string(),
            DirectoryListing {
                directory: dir("/a", 2),
                documents: vec![doc("/a/x", 5), doc("/a/y", 6)],
                parent: Some(dir("/", 1)),
            },
        );
        service
    }

    #[tokio::test]
    async fn root_reload_refetches_the_open_subdirectory() {
        let (mut app, service, mut rx) = setup(wide_service());
        app.start();
        pump(&mut app, &mut rx).await;
        let root = app.tree.active();

        app.open_highlighted();
        pump(&mut app, &mut rx).await;
        app.select_last();
        assert_eq!(app.cursor, 1);

        app.handle_service_event(ServiceEvent::Uploaded {
            node: root,
            result: Ok(()),
        });
        pump(&mut app, &mut rx).await;

        assert_eq!(service.calls(), vec!["list /", "list /a", "list /", "list /a"]);
        assert_eq!(app.breadcrumb_labels(), vec!["/", "a"]);
        assert!(app.tree.active_node().unwrap().loaded());
        assert_eq!(entry_names(&app), vec!["x", "y"]);
        assert_eq!(app.cursor, 1);
    }

    #[tokio::test]
    async fn going_up_from_start_reuses_the_start_node() {
        let mut config = quiet_config();
        config.general.start_path = Some("/a".to_string());
        let (mut app, _service, mut rx) = setup_with(wide_service(), config);
        app.start();
        pump(&mut app, &mut rx).await;
        let start = app.tree.active();

        app.go_up();
        pump(&mut app, &mut rx).await;
        assert!(app.tree.children(app.tree.active()).contains(&start));
        // Root, its three entries and the two children of /a.
        assert_eq!(app.tree.len(), 6);

        app.open_highlighted();
        pump(&mut app, &mut rx).await;
        assert_eq!(app.tree.active(), start);
        assert_eq!(entry_names(&app), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn deleting_the_open_directory_resets_the_cursor() {
        let mut service = wide_service();
        service.listings.insert(
            "/".to_string(),
            DirectoryListing {
                directory: dir("/", 1),
                documents: vec![doc("/b", 3), dir("/a", 2), doc("/c", 4)],
                parent: None,
            },
        );
        service.failing_deletes.insert(DocumentId::Numeric(2));
        let (mut app, service, mut rx) = setup(service);
        app.start();
        pump(&mut app, &mut rx).await;
        let root = app.tree.active();

        app.select_next();
        app.open_highlighted();
        pump(&mut app, &mut rx).await;
        app.select_last();
        assert_eq!(app.cursor, 1);

        app.delete_top();
        app.submit_dialog();
        assert_eq!(app.tree.active(), root);
        assert_eq!(app.cursor, 0);
        assert_eq!(app.scroll_offset, 0);

        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /", "list /a", "delete 2", "list /"]);
        // The directory survived the failed delete and keeps the focus.
        assert_eq!(entry_names(&app), vec!["b", "a", "c"]);
        assert_eq!(app.cursor, 1);
    }

    #[tokio::test]
    async fn cancelled_delete_issues_nothing() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.delete_highlighted();
        app.cancel_dialog();
        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /"]);
        assert!(app.tree.pending_deletion(app.tree.active()).is_empty());
    }

    #[tokio::test]
    async fn delete_without_confirmation_runs_immediately() {
        let mut config = quiet_config();
        config.general.confirm_delete = Some(false);
        let (mut app, service, mut rx) = setup_with(fake_service(), config);
        app.start();
        pump(&mut app, &mut rx).await;

        app.select_last();
        app.delete_highlighted();
        assert_eq!(app.mode, AppMode::Normal);
        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /", "delete 4", "list /"]);
    }

    #[tokio::test]
    async fn download_selection_shows_export_link() {
        let (mut app, _service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.toggle_highlighted();
        app.select_last();
        app.toggle_highlighted();
        app.download_top();
        let (msg, _) = app.status_message.clone().unwrap();
        assert_eq!(msg, "http://docs/desktop/api2/doc/export?documents=%5B2%2C4%5D");

        app.select_next();
        app.clear_selection();
        app.select_previous();
        app.download_highlighted();
        let (msg, _) = app.status_message.clone().unwrap();
        assert_eq!(msg, "http://docs/desktop/api2/doc/export?documents=%5B3%5D");
    }

    #[tokio::test]
    async fn upload_success_reloads_and_reports_complete() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.open_upload_dialog();
        for c in "/tmp/report.csv".chars() {
            app.dialog_input_char(c);
        }
        app.submit_dialog();
        let root = app.tree.active();
        assert_eq!(
            app.mode,
            AppMode::Dialog(DialogKind::UploadProgress { node: root })
        );
        pump(&mut app, &mut rx).await;

        let node = app.tree.get(root).unwrap();
        assert!(node.upload_complete());
        assert!(!node.upload_failed());
        assert_eq!(node.upload_progress, 100);
        assert_eq!(
            service.calls(),
            vec!["list /", "upload /tmp/report.csv -> /", "list /"]
        );

        app.cancel_dialog();
        assert!(!app.tree.get(root).unwrap().upload_complete());
    }

    #[tokio::test]
    async fn upload_failure_sets_both_flags() {
        let mut service = fake_service();
        service.fail_uploads = true;
        let (mut app, service, mut rx) = setup(service);
        app.start();
        pump(&mut app, &mut rx).await;

        app.open_upload_dialog();
        app.dialog_input_char('f');
        app.submit_dialog();
        pump(&mut app, &mut rx).await;

        let node = app.tree.active_node().unwrap();
        assert!(node.upload_complete());
        assert!(node.upload_failed());
        assert!(!node.uploading());
        assert_eq!(node.upload_progress, 50);
        assert_eq!(service.calls(), vec!["list /", "upload f -> /"]);
    }

    #[tokio::test]
    async fn create_folder_reloads_on_success_only() {
        let (mut app, service, mut rx) = setup(fake_service());
        app.start();
        pump(&mut app, &mut rx).await;

        app.open_create_dir_dialog();
        for c in "new".chars() {
            app.dialog_input_char(c);
        }
        app.submit_dialog();
        pump(&mut app, &mut rx).await;

        app.open_create_dir_dialog();
        for c in "taken".chars() {
            app.dialog_input_char(c);
        }
        app.submit_dialog();
        pump(&mut app, &mut rx).await;

        assert_eq!(
            service.calls(),
            vec!["list /", "mkdir / new", "list /", "mkdir / taken"]
        );
        assert!(app.status_is_error);
    }

    #[tokio::test]
    async fn load_failure_is_reported_and_reload_retries() {
        let (mut app, service, mut rx) = setup(FakeService::default());
        app.start();
        pump(&mut app, &mut rx).await;
        assert!(app.tree.active_node().unwrap().has_errors());
        assert!(app.status_is_error);

        app.reload();
        pump(&mut app, &mut rx).await;
        assert_eq!(service.calls(), vec!["list /", "list /"]);
    }

    #[test]
    fn dialog_input_editing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(FakeService::default()), &quiet_config(), tx);
        app.open_dialog(DialogKind::CreateDirectory);
        app.dialog_input_char('a');
        app.dialog_input_char('é');
        app.dialog_input_char('c');
        app.dialog_move_cursor_left();
        app.dialog_delete_char();
        assert_eq!(app.dialog_state.input, "ac");
        assert_eq!(app.dialog_state.cursor_position, 1);
        app.dialog_move_cursor_right();
        assert_eq!(app.dialog_state.cursor_position, 2);
        app.dialog_move_cursor_right();
        assert_eq!(app.dialog_state.cursor_position, 2);
        app.close_dialog();
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.dialog_state.input.is_empty());
    }

    #[test]
    fn clear_expired_status_removes_old() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(FakeService::default()), &quiet_config(), tx);
        app.set_status_message("fresh".to_string());
        app.clear_expired_status();
        assert!(app.status_message.is_some());
        app.status_message = Some((
            "old".to_string(),
            Instant::now() - std::time::Duration::from_secs(5),
        ));
        app.clear_expired_status();
        assert!(app.status_message.is_none());
    }
}
