//! The shell app orchestrator.
//!
//! [`ShellApp`] owns the workspace (directory, listing, editor buffer, file
//! binding and transcript) and wires together the file sync engine, the
//! terminal controller and the session manager. Three kinds of activity
//! share it: the front end's input/render calls, the reconcile thread and
//! the session drain tasks. They only meet inside short critical sections on
//! the workspace lock; disk reads and writes, directory listings and process
//! launches all happen with the lock released.

pub mod sync_loop;
pub mod workspace;

use crate::config::Config;
use crate::environment::Environment;
use crate::error::Result;
use crate::model::buffer::Buffer;
use crate::model::filesystem::FileSystem;
use crate::model::listing::{self, DirectoryListing, EntryKind};
use crate::services::file_sync::{FileBinding, FileSync, SyncAction};
use crate::services::terminal::{
    ProcessLauncher, SessionManager, SessionSettings, SessionStatus, TerminalController,
};
use crate::services::time_source::SharedTimeSource;
use crate::view::{RenderSurface, WorkspaceView};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use sync_loop::SyncLoop;
use tokio::runtime::Handle;
use workspace::{Workspace, WorkspaceState};

pub struct ShellApp {
    workspace: Arc<Workspace>,
    fs: Arc<dyn FileSystem>,
    file_sync: FileSync,
    sessions: SessionManager,
    controller: Mutex<TerminalController>,
    sync_loop: Mutex<Option<SyncLoop>>,
    config: Config,
    env: Environment,
}

impl ShellApp {
    /// Build the app rooted at `initial_dir`.
    ///
    /// Failing to list the initial directory is fatal: there is no prior
    /// state to fall back to.
    pub fn new(
        config: Config,
        env: Environment,
        initial_dir: PathBuf,
        fs: Arc<dyn FileSystem>,
        launcher: Arc<dyn ProcessLauncher>,
        runtime: Handle,
    ) -> Result<Self> {
        let listing = DirectoryListing::read(fs.as_ref(), &initial_dir)?;

        let mut transcript = Buffer::from_text(config.terminal.prompt.clone());
        transcript.move_caret_to_end();

        let workspace = Arc::new(Workspace::new(WorkspaceState {
            dir: initial_dir,
            listing,
            editor: Buffer::new(),
            binding: None,
            transcript,
        }));

        let sessions = SessionManager::new(
            launcher,
            runtime,
            workspace.clone(),
            SessionSettings::new(&config.terminal, &env),
        );

        tracing::info!("Workspace ready in {:?}", workspace.lock().dir);

        Ok(Self {
            file_sync: FileSync::new(fs.clone(), config.sync.tab_width),
            controller: Mutex::new(TerminalController::new(config.terminal.prompt_marker.clone())),
            sync_loop: Mutex::new(None),
            workspace,
            fs,
            sessions,
            config,
            env,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn session_status(&self) -> SessionStatus {
        self.sessions.status()
    }

    pub fn current_dir(&self) -> PathBuf {
        self.workspace.lock().dir.clone()
    }

    pub fn listing(&self) -> DirectoryListing {
        self.workspace.lock().listing.clone()
    }

    pub fn binding(&self) -> Option<FileBinding> {
        self.workspace.lock().binding.clone()
    }

    pub fn editor_text(&self) -> String {
        self.workspace.lock().editor.text().to_string()
    }

    pub fn transcript_text(&self) -> String {
        self.workspace.lock().transcript.text().to_string()
    }

    fn report(&self, message: &str) {
        self.workspace.lock().transcript.append(message);
    }

    /// Resolve `relative_target` against the current directory and switch to
    /// it. On failure the previous listing stays and the error is reported
    /// in the transcript.
    pub fn navigate(&self, relative_target: &Path) -> Result<()> {
        let dir = self.current_dir();
        match listing::navigate(self.fs.as_ref(), &dir, relative_target) {
            Ok(listing) => {
                tracing::debug!("Navigated to {:?}", listing.dir);
                let mut state = self.workspace.lock();
                state.dir = listing.dir.clone();
                state.listing = listing;
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Navigation to {:?} failed: {}", relative_target, e);
                self.report(&format!("err listing {}\n", e));
                Err(e)
            }
        }
    }

    /// Open `path` (relative to the current directory) in the editor,
    /// replacing the previous binding. On failure nothing changes.
    pub fn open_file(&self, path: &Path) -> Result<()> {
        let dir = self.current_dir();
        let path = self.fs.resolve_abs(&dir, path);

        match self.file_sync.open(&path) {
            Ok((content, fingerprint)) => {
                tracing::info!("Opened {:?}", path);
                let mut state = self.workspace.lock();
                state.editor = Buffer::from_text(content);
                state.binding = Some(FileBinding::new(path, fingerprint));
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Open of {:?} failed: {}", path, e);
                self.report(&format!("err opening {}\n", e));
                Err(e)
            }
        }
    }

    /// Activate listing entry `index`: directories are entered, files are
    /// opened. Indices past the end are ignored.
    pub fn activate(&self, index: usize) -> Result<()> {
        let entry = self.workspace.lock().listing.get(index).cloned();
        let Some(entry) = entry else {
            tracing::debug!("Ignoring activation of missing entry {}", index);
            return Ok(());
        };

        match entry.kind {
            EntryKind::Directory => self.navigate(entry.relative_path()),
            EntryKind::File => self.open_file(entry.relative_path()),
        }
    }

    /// Apply a user edit to the editor buffer.
    pub fn edit_editor(&self, edit: impl FnOnce(&mut Buffer)) {
        edit(&mut self.workspace.lock().editor);
    }

    /// Type `text` into the transcript at the caret, as keystrokes.
    ///
    /// Every completed line is shown to the terminal controller; submitted
    /// commands are dispatched after the lock is released, each superseding
    /// the one before. Returns the byte range the text now occupies.
    pub fn type_text(&self, text: &str) -> Range<usize> {
        let mut commands = Vec::new();
        let (dir, range) = {
            let mut state = self.workspace.lock();
            let mut controller = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
            let start = state.transcript.selection().start;
            for piece in text.split_inclusive('\n') {
                state.transcript.insert(piece);
                if let Some(command) = controller.observe(&state.transcript) {
                    commands.push(command);
                }
            }
            (state.dir.clone(), start..start + text.len())
        };

        for command in commands {
            // Launch failures are already reported in the transcript.
            let _ = self.sessions.supersede(&dir, &command);
        }
        range
    }

    /// One tick of the reconcile loop: refresh the listing, then sync the
    /// editor buffer with its file.
    pub fn reconcile_tick(&self) -> Option<SyncAction> {
        if self.config.sync.refresh_listing {
            self.refresh_listing();
        }

        let (mut binding, snapshot) = {
            let state = self.workspace.lock();
            (state.binding.clone()?, state.editor.text().to_string())
        };

        let action = self.file_sync.reconcile(&mut binding, &snapshot);

        let mut state = self.workspace.lock();
        let still_bound = state
            .binding
            .as_ref()
            .is_some_and(|current| current.path == binding.path);
        if !still_bound {
            tracing::debug!("File switched during reconcile of {:?}", binding.path);
            return None;
        }

        match &action {
            SyncAction::Wrote => state.binding = Some(binding),
            SyncAction::WriteFailed(e) => {
                state.transcript.append(&format!("err writing: {}\n", e));
            }
            SyncAction::Reload { content } => {
                // A local edit made during the read wins; it is written on
                // the next tick.
                if state.editor.text() == snapshot {
                    state.editor.replace_all(content.clone());
                    state.binding = Some(binding);
                }
            }
            SyncAction::Unchanged | SyncAction::ReadSkipped => {}
        }
        Some(action)
    }

    fn refresh_listing(&self) {
        let dir = self.current_dir();
        match DirectoryListing::read(self.fs.as_ref(), &dir) {
            Ok(listing) => {
                let mut state = self.workspace.lock();
                if state.dir == dir {
                    state.listing = listing;
                }
            }
            Err(e) => tracing::debug!("Listing refresh failed: {}", e),
        }
    }

    /// Start the reconcile thread. It holds only a weak reference, so it
    /// ends on its own once the app is dropped.
    pub fn start_sync_loop(self: &Arc<Self>, time: SharedTimeSource) -> std::io::Result<()> {
        let app = Arc::downgrade(self);
        let sync = SyncLoop::spawn(self.config.sync.poll_interval(), time, move || {
            match app.upgrade() {
                Some(app) => {
                    app.reconcile_tick();
                    true
                }
                None => false,
            }
        })?;

        let previous = self
            .sync_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(sync);
        if let Some(mut previous) = previous {
            previous.stop();
        }
        Ok(())
    }

    /// Present a snapshot of the workspace. The lock is released before the
    /// surface runs.
    pub fn render(&self, surface: &mut dyn RenderSurface) {
        let view = self.view();
        surface.present(&view);
    }

    pub fn view(&self) -> WorkspaceView {
        self.workspace.lock().view()
    }

    /// Stop the reconcile thread and interrupt the running command.
    pub fn shutdown(&self) {
        let sync = self
            .sync_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut sync) = sync {
            sync.stop();
        }
        self.sessions.interrupt();
        tracing::info!("Shut down");
    }
}
