//! Desktop state container. Owns the file system, window stack, security
//! state and challenge state; the TUI only talks to it through these methods.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use super::calculator::Calculator;
use super::ctf;
use super::explorer::{self, DeleteRequest, Explorer, OpenAction};
use super::notepad::{self, Notepad};
use super::paint::Paint;
use super::path;
use super::security::{Protection, SecurityCenter};
use super::shell::{Shell, ShellOutcome};
use super::store::{FileRecord, Store, VfsResult};
use super::vfs::VirtualFs;
use super::window::{AppKind, WindowData, WindowManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityTab {
    #[default]
    Protection,
    Quarantine,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityView {
    pub tab: SecurityTab,
    pub selected: usize,
}

/// Per-window application state.
#[derive(Debug, Clone)]
pub enum AppState {
    Explorer(Explorer),
    Notepad(Notepad),
    Paint(Paint),
    Calculator(Calculator),
    Terminal(Shell),
    Security(SecurityView),
}

pub struct DesktopContext<S: Store> {
    pub fs: VirtualFs<S>,
    pub windows: WindowManager,
    pub security: SecurityCenter,
    apps: HashMap<u64, AppState>,
    desktop_files: Vec<FileRecord>,
    desktop_dirty: Rc<Cell<bool>>,
    flag_revealed: bool,
    crashed: bool,
    crash_at: Option<Instant>,
    status: Option<String>,
}

/// Put the flagged file back so the challenge can be played again.
fn seed_flagged_file<S: Store>(fs: &mut VirtualFs<S>) -> VfsResult<()> {
    if !fs.exists(ctf::FLAGGED_PATH)? {
        fs.write(ctf::FLAGGED_PATH, ctf::FLAGGED_CONTENT, "text/plain")?;
    }
    Ok(())
}

impl<S: Store> DesktopContext<S> {
    /// Initialize the file system, make sure the flagged file is present and
    /// load the security state.
    pub fn new(mut fs: VirtualFs<S>) -> VfsResult<Self> {
        fs.initialize()?;
        seed_flagged_file(&mut fs)?;
        let security = SecurityCenter::load(&mut fs)?;

        let desktop_dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&desktop_dirty);
        fs.on_change(explorer::DESKTOP_DIR, move || flag.set(true));

        let mut ctx = Self {
            fs,
            windows: WindowManager::new(),
            security,
            apps: HashMap::new(),
            desktop_files: Vec::new(),
            desktop_dirty,
            flag_revealed: false,
            crashed: false,
            crash_at: None,
            status: None,
        };
        ctx.refresh_desktop()?;
        Ok(ctx)
    }

    pub fn desktop_files(&self) -> &[FileRecord] {
        &self.desktop_files
    }

    pub fn refresh_desktop(&mut self) -> VfsResult<()> {
        self.desktop_files = self.fs.list(explorer::DESKTOP_DIR)?;
        self.desktop_dirty.set(false);
        Ok(())
    }

    pub fn flag_revealed(&self) -> bool {
        self.flag_revealed
    }

    pub fn dismiss_flag(&mut self) {
        self.flag_revealed = false;
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    pub fn crash_pending(&self) -> bool {
        self.crash_at.is_some()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Poll timers and pending refreshes. Called once per event-loop turn.
    pub fn tick(&mut self, now: Instant) -> VfsResult<()> {
        if self.crash_at.is_some_and(|at| now >= at) {
            self.crash_at = None;
            self.trigger_system_crash();
        }
        if self.desktop_dirty.get() {
            self.refresh_desktop()?;
            self.refresh_explorers()?;
        }
        Ok(())
    }

    fn refresh_explorers(&mut self) -> VfsResult<()> {
        for app in self.apps.values_mut() {
            if let AppState::Explorer(ex) = app {
                ex.refresh(&self.fs)?;
            }
        }
        Ok(())
    }

    // ---- windows -------------------------------------------------------

    pub fn open_app(&mut self, app: AppKind, data: WindowData) -> VfsResult<u64> {
        let state = self.build_state(app, &data)?;
        let id = self.windows.open(app, data);
        self.apps.insert(id, state);
        Ok(id)
    }

    fn build_state(&self, app: AppKind, data: &WindowData) -> VfsResult<AppState> {
        Ok(match app {
            AppKind::Explorer => {
                let mut ex = Explorer::new(data.initial_path.as_deref());
                ex.refresh(&self.fs)?;
                AppState::Explorer(ex)
            }
            AppKind::Notepad => AppState::Notepad(Notepad::open(&self.fs, data.file_path.clone())?),
            AppKind::Paint => AppState::Paint(Paint::open(&self.fs, data.file_path.clone())?),
            AppKind::Calculator => AppState::Calculator(Calculator::new()),
            AppKind::Terminal => AppState::Terminal(Shell::new()),
            AppKind::Security => AppState::Security(SecurityView::default()),
        })
    }

    pub fn close_window(&mut self, id: u64) {
        self.windows.close(id);
        self.apps.remove(&id);
    }

    pub fn activate_from_taskbar(&mut self, app: AppKind) -> VfsResult<u64> {
        let id = self.windows.activate_from_taskbar(app);
        if !self.apps.contains_key(&id) {
            let state = self.build_state(app, &WindowData::default())?;
            self.apps.insert(id, state);
        }
        Ok(id)
    }

    pub fn app(&self, id: u64) -> Option<&AppState> {
        self.apps.get(&id)
    }

    pub fn app_mut(&mut self, id: u64) -> Option<&mut AppState> {
        self.apps.get_mut(&id)
    }

    /// Window state together with the file system, for operations that need both.
    pub fn app_and_fs(&mut self, id: u64) -> Option<(&mut AppState, &mut VirtualFs<S>)> {
        self.apps.get_mut(&id).map(|app| (app, &mut self.fs))
    }

    /// Open a desktop icon: folders browse, text opens Notepad, images open Paint.
    pub fn open_file(&mut self, rec: &FileRecord) -> VfsResult<Option<u64>> {
        let (app, data) = if rec.is_folder() {
            (AppKind::Explorer, WindowData::folder(&rec.path))
        } else if rec.mime_starts_with("text/") {
            (AppKind::Notepad, WindowData::file(&rec.path, &rec.name))
        } else if rec.mime_starts_with("image/") {
            (AppKind::Paint, WindowData::file(&rec.path, &rec.name))
        } else {
            return Ok(None);
        };
        self.open_app(app, data).map(Some)
    }

    // ---- challenge -----------------------------------------------------

    pub fn check_ctf_condition(&mut self, deleted_path: &str) {
        if ctf::is_flagged_deletion(deleted_path) {
            tracing::info!(path = deleted_path, "flagged file deleted, flag revealed");
            self.flag_revealed = true;
        }
    }

    pub fn delete_from_desktop(&mut self, file_path: &str) -> VfsResult<()> {
        self.fs.delete(file_path)?;
        self.check_ctf_condition(file_path);
        self.refresh_desktop()?;
        self.set_status(format!("{} deleted", path::file_name(file_path)));
        Ok(())
    }

    pub fn explorer_request_delete(&self, id: u64) -> DeleteRequest {
        match self.apps.get(&id) {
            Some(AppState::Explorer(ex)) => ex.request_delete(),
            _ => DeleteRequest::Nothing,
        }
    }

    /// Carry out a delete the user confirmed in an Explorer window.
    pub fn explorer_confirm_delete(&mut self, id: u64, target: &str) -> VfsResult<()> {
        let Some(AppState::Explorer(ex)) = self.apps.get_mut(&id) else {
            return Ok(());
        };
        self.fs.delete(target)?;
        let counts = ex.deletes_count_for_flag();
        ex.refresh(&self.fs)?;
        if counts {
            self.check_ctf_condition(target);
        }
        self.refresh_desktop()?;
        self.set_status(format!("{} deleted", path::file_name(target)));
        Ok(())
    }

    /// Activate the selected Explorer entry, opening a new window when it is a file.
    pub fn explorer_open_selected(&mut self, id: u64) -> VfsResult<()> {
        let Some(AppState::Explorer(ex)) = self.apps.get_mut(&id) else {
            return Ok(());
        };
        match ex.open_selected(&self.fs)? {
            OpenAction::OpenWindow(app, data) => {
                self.open_app(app, data)?;
            }
            OpenAction::None => self.set_status("No application is associated with this file"),
            OpenAction::Navigated => {}
        }
        Ok(())
    }

    /// Submit the terminal's input line and act on what the command did.
    pub fn run_terminal(&mut self, id: u64, now: Instant) -> VfsResult<ShellOutcome> {
        let Some(AppState::Terminal(shell)) = self.apps.get_mut(&id) else {
            return Ok(ShellOutcome::None);
        };
        let outcome = shell.submit(&mut self.fs);
        if outcome == ShellOutcome::CrashScheduled {
            self.crash_at = Some(now + ctf::CRASH_DELAY);
        }
        self.refresh_explorers()?;
        Ok(outcome)
    }

    pub fn trigger_system_crash(&mut self) {
        tracing::warn!("system crash triggered");
        self.crashed = true;
    }

    /// Start over as after a restart: windows, per-window state and challenge
    /// flags are dropped, the persisted store is kept.
    pub fn reload_system(&mut self) -> VfsResult<()> {
        tracing::info!("reloading system");
        self.windows.close_all();
        self.apps.clear();
        self.flag_revealed = false;
        self.crashed = false;
        self.crash_at = None;
        self.status = None;
        self.security = SecurityCenter::load(&mut self.fs)?;
        seed_flagged_file(&mut self.fs)?;
        self.refresh_desktop()
    }

    // ---- app commands --------------------------------------------------

    pub fn save_notepad(&mut self, id: u64) -> VfsResult<()> {
        let Some(AppState::Notepad(pad)) = self.apps.get_mut(&id) else {
            return Ok(());
        };
        let msg = if pad.save(&mut self.fs)? {
            notepad::SAVED
        } else {
            notepad::NO_PATH_ERROR
        };
        self.set_status(msg);
        Ok(())
    }

    pub fn save_paint(&mut self, id: u64, now_ms: i64) -> VfsResult<()> {
        let Some(AppState::Paint(paint)) = self.apps.get_mut(&id) else {
            return Ok(());
        };
        let target = paint.save(&mut self.fs, now_ms)?;
        self.set_status(format!("Saved to {}", path::display(&target)));
        Ok(())
    }

    pub fn toggle_protection(&mut self, p: Protection) -> VfsResult<()> {
        self.security.toggle(&mut self.fs, p)
    }

    pub fn restore_from_quarantine(&mut self, item_id: &str) -> VfsResult<()> {
        if self.security.restore_from_quarantine(&mut self.fs, item_id)? {
            self.set_status("Item restored");
        } else {
            self.set_status("Original file no longer exists");
        }
        Ok(())
    }

    pub fn delete_from_quarantine(&mut self, item_id: &str) -> VfsResult<()> {
        if self.security.delete_from_quarantine(&mut self.fs, item_id)? {
            self.set_status("Threat removed");
        }
        Ok(())
    }
}
