//! Desktop window bookkeeping: geometry, stacking and taskbar activation.
//!
//! Geometry is measured in terminal cells. The renderer clamps windows into
//! the visible desktop area; the manager itself only enforces the floor on
//! `y` and the minimum size.

use serde::{Deserialize, Serialize};

pub const FIRST_Z_INDEX: u64 = 1000;
pub const MIN_WINDOW_W: u16 = 24;
pub const MIN_WINDOW_H: u16 = 8;
const CASCADE_ORIGIN: (i32, i32) = (4, 1);
const CASCADE_STEP: (i32, i32) = (3, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppKind {
    Explorer,
    Security,
    Paint,
    Calculator,
    Notepad,
    Terminal,
}

impl AppKind {
    pub const ALL: [AppKind; 6] = [
        AppKind::Explorer,
        AppKind::Security,
        AppKind::Paint,
        AppKind::Calculator,
        AppKind::Notepad,
        AppKind::Terminal,
    ];

    pub fn default_title(self) -> &'static str {
        match self {
            AppKind::Explorer => "File Explorer",
            AppKind::Security => "Windows Security",
            AppKind::Paint => "Paint",
            AppKind::Calculator => "Calculator",
            AppKind::Notepad => "Notepad",
            AppKind::Terminal => "Terminal",
        }
    }

    pub fn default_size(self) -> (u16, u16) {
        match self {
            AppKind::Explorer => (72, 22),
            AppKind::Security => (64, 22),
            AppKind::Paint => (80, 26),
            AppKind::Calculator => (30, 18),
            AppKind::Notepad => (60, 20),
            AppKind::Terminal => (70, 20),
        }
    }

    pub fn taskbar_label(self) -> &'static str {
        match self {
            AppKind::Explorer => "Explorer",
            AppKind::Security => "Security",
            AppKind::Paint => "Paint",
            AppKind::Calculator => "Calc",
            AppKind::Notepad => "Notepad",
            AppKind::Terminal => "Terminal",
        }
    }
}

/// Extra data an app is opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowData {
    pub title: Option<String>,
    pub file_path: Option<String>,
    pub initial_path: Option<String>,
}

impl WindowData {
    pub fn file(path: &str, title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            file_path: Some(path.to_string()),
            initial_path: None,
        }
    }

    pub fn folder(path: &str) -> Self {
        Self {
            initial_path: Some(path.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinRect {
    pub x: i32,
    pub y: i32,
    pub w: u16,
    pub h: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub id: u64,
    pub app: AppKind,
    pub title: String,
    pub rect: WinRect,
    pub minimized: bool,
    pub maximized: bool,
    pub z_index: u64,
    pub data: WindowData,
}

/// Partial update applied by [`WindowManager::update`].
#[derive(Debug, Clone, Default)]
pub struct WindowPatch {
    pub title: Option<String>,
    pub rect: Option<WinRect>,
    pub minimized: Option<bool>,
    pub maximized: Option<bool>,
    pub data: Option<WindowData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy)]
enum DragAction {
    Move { dx: i32, dy: i32 },
    Resize { corner: ResizeCorner, origin: WinRect },
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    window_id: u64,
    action: DragAction,
}

#[derive(Debug)]
pub struct WindowManager {
    windows: Vec<WindowRecord>,
    next_id: u64,
    next_z: u64,
    dragging: Option<DragState>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    pub fn new() -> Self {
        Self {
            windows: Vec::new(),
            next_id: 1,
            next_z: FIRST_Z_INDEX,
            dragging: None,
        }
    }

    pub fn open(&mut self, app: AppKind, data: WindowData) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let n = self.windows.len() as i32;
        let (w, h) = app.default_size();
        let title = data
            .title
            .clone()
            .unwrap_or_else(|| app.default_title().to_string());
        let z_index = self.bump_z();
        self.windows.push(WindowRecord {
            id,
            app,
            title,
            rect: WinRect {
                x: CASCADE_ORIGIN.0 + n * CASCADE_STEP.0,
                y: CASCADE_ORIGIN.1 + n * CASCADE_STEP.1,
                w,
                h,
            },
            minimized: false,
            maximized: false,
            z_index,
            data,
        });
        tracing::debug!(id, ?app, "window opened");
        id
    }

    fn bump_z(&mut self) -> u64 {
        let z = self.next_z;
        self.next_z += 1;
        z
    }

    pub fn close(&mut self, id: u64) {
        self.windows.retain(|w| w.id != id);
        if self.dragging.is_some_and(|d| d.window_id == id) {
            self.dragging = None;
        }
    }

    pub fn close_all(&mut self) {
        self.windows.clear();
        self.dragging = None;
    }

    pub fn focus(&mut self, id: u64) {
        let z = self.next_z;
        if let Some(win) = self.get_mut(id) {
            win.z_index = z;
            win.minimized = false;
            self.next_z += 1;
        }
    }

    pub fn minimize(&mut self, id: u64) {
        if let Some(win) = self.get_mut(id) {
            win.minimized = !win.minimized;
        }
    }

    pub fn maximize(&mut self, id: u64) {
        if let Some(win) = self.get_mut(id) {
            win.maximized = !win.maximized;
        }
    }

    pub fn update(&mut self, id: u64, patch: WindowPatch) {
        let Some(win) = self.get_mut(id) else {
            return;
        };
        if let Some(title) = patch.title {
            win.title = title;
        }
        if let Some(rect) = patch.rect {
            win.rect = rect;
        }
        if let Some(minimized) = patch.minimized {
            win.minimized = minimized;
        }
        if let Some(maximized) = patch.maximized {
            win.maximized = maximized;
        }
        if let Some(data) = patch.data {
            win.data = data;
        }
    }

    pub fn begin_drag(&mut self, id: u64, px: u16, py: u16) {
        let Some(win) = self.get(id) else {
            return;
        };
        if win.maximized {
            return;
        }
        self.dragging = Some(DragState {
            window_id: id,
            action: DragAction::Move {
                dx: i32::from(px) - win.rect.x,
                dy: i32::from(py) - win.rect.y,
            },
        });
    }

    pub fn begin_resize(&mut self, id: u64, corner: ResizeCorner) {
        let Some(win) = self.get(id) else {
            return;
        };
        if win.maximized {
            return;
        }
        self.dragging = Some(DragState {
            window_id: id,
            action: DragAction::Resize {
                corner,
                origin: win.rect,
            },
        });
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Pointer moved while a move or resize gesture is active.
    pub fn drag_to(&mut self, px: u16, py: u16) {
        let Some(drag) = self.dragging else {
            return;
        };
        let Some(win) = self.get_mut(drag.window_id) else {
            return;
        };
        if win.maximized {
            return;
        }
        match drag.action {
            DragAction::Move { dx, dy } => {
                win.rect.x = i32::from(px) - dx;
                win.rect.y = (i32::from(py) - dy).max(0);
            }
            DragAction::Resize { corner, origin } => {
                win.rect = apply_corner_resize(origin, corner, px, py);
            }
        }
    }

    pub fn end_drag(&mut self) -> bool {
        self.dragging.take().is_some()
    }

    pub fn activate_from_taskbar(&mut self, app: AppKind) -> u64 {
        let visible = self
            .windows
            .iter()
            .filter(|w| w.app == app && !w.minimized)
            .max_by_key(|w| w.z_index)
            .map(|w| w.id);
        if let Some(id) = visible {
            self.focus(id);
            return id;
        }
        let minimized = self
            .windows
            .iter()
            .find(|w| w.app == app && w.minimized)
            .map(|w| w.id);
        if let Some(id) = minimized {
            self.focus(id);
            return id;
        }
        self.open(app, WindowData::default())
    }

    pub fn get(&self, id: u64) -> Option<&WindowRecord> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut WindowRecord> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub fn focused(&self) -> Option<&WindowRecord> {
        self.windows
            .iter()
            .filter(|w| !w.minimized)
            .max_by_key(|w| w.z_index)
    }

    pub fn focused_id(&self) -> Option<u64> {
        self.focused().map(|w| w.id)
    }

    /// Windows bottom to top.
    pub fn stacking_order(&self) -> Vec<&WindowRecord> {
        let mut out: Vec<&WindowRecord> = self.windows.iter().collect();
        out.sort_by_key(|w| w.z_index);
        out
    }

    /// Windows in the order they were opened, for the taskbar.
    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> impl Iterator<Item = &mut WindowRecord> {
        self.windows.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}

fn apply_corner_resize(origin: WinRect, corner: ResizeCorner, px: u16, py: u16) -> WinRect {
    let min_w = i32::from(MIN_WINDOW_W);
    let min_h = i32::from(MIN_WINDOW_H);

    let mut left = origin.x;
    let mut top = origin.y;
    let mut right = origin.x + i32::from(origin.w);
    let mut bottom = origin.y + i32::from(origin.h);

    let mx = i32::from(px);
    let my = i32::from(py);
    match corner {
        ResizeCorner::TopLeft => {
            left = mx.min(right - min_w);
            top = my.max(0).min(bottom - min_h);
        }
        ResizeCorner::TopRight => {
            right = (mx + 1).max(left + min_w);
            top = my.max(0).min(bottom - min_h);
        }
        ResizeCorner::BottomLeft => {
            left = mx.min(right - min_w);
            bottom = (my + 1).max(top + min_h);
        }
        ResizeCorner::BottomRight => {
            right = (mx + 1).max(left + min_w);
            bottom = (my + 1).max(top + min_h);
        }
    }

    WinRect {
        x: left,
        y: top,
        w: (right - left) as u16,
        h: (bottom - top) as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_assigns_titles_sizes_and_cascade() {
        let mut wm = WindowManager::new();
        let a = wm.open(AppKind::Explorer, WindowData::default());
        let b = wm.open(AppKind::Notepad, WindowData::file("C:/x.txt", "x.txt - Notepad"));
        let wa = wm.get(a).unwrap();
        let wb = wm.get(b).unwrap();
        assert_eq!(wa.title, "File Explorer");
        assert_eq!((wa.rect.w, wa.rect.h), AppKind::Explorer.default_size());
        assert_eq!(wb.title, "x.txt - Notepad");
        assert_eq!(wb.rect.x - wa.rect.x, CASCADE_STEP.0);
        assert_eq!(wa.z_index, FIRST_Z_INDEX);
        assert_eq!(wb.z_index, FIRST_Z_INDEX + 1);
    }

    #[test]
    fn focus_raises_above_every_other_window() {
        let mut wm = WindowManager::new();
        let ids: Vec<u64> = AppKind::ALL
            .iter()
            .map(|app| wm.open(*app, WindowData::default()))
            .collect();
        wm.focus(ids[0]);
        let z0 = wm.get(ids[0]).unwrap().z_index;
        assert!(wm
            .windows()
            .iter()
            .filter(|w| w.id != ids[0])
            .all(|w| w.z_index < z0));
        assert_eq!(wm.focused_id(), Some(ids[0]));
        assert_eq!(wm.stacking_order().last().unwrap().id, ids[0]);
    }

    #[test]
    fn minimize_toggles_and_focus_restores() {
        let mut wm = WindowManager::new();
        let id = wm.open(AppKind::Paint, WindowData::default());
        wm.minimize(id);
        assert!(wm.get(id).unwrap().minimized);
        assert_eq!(wm.focused_id(), None);
        wm.focus(id);
        assert!(!wm.get(id).unwrap().minimized);
    }

    #[test]
    fn drag_clamps_y_and_ignores_maximized() {
        let mut wm = WindowManager::new();
        let id = wm.open(AppKind::Terminal, WindowData::default());
        let start = wm.get(id).unwrap().rect;
        wm.begin_drag(id, (start.x + 2) as u16, start.y as u16);
        wm.drag_to(40, 0);
        wm.drag_to(1, 0);
        assert!(wm.end_drag());
        let r = wm.get(id).unwrap().rect;
        assert_eq!(r.x, -1);
        assert_eq!(r.y, 0);

        wm.maximize(id);
        wm.begin_drag(id, 10, 10);
        assert!(!wm.is_dragging());
    }

    #[test]
    fn resize_floors_at_minimum() {
        let mut wm = WindowManager::new();
        let id = wm.open(AppKind::Explorer, WindowData::default());
        let r = wm.get(id).unwrap().rect;
        wm.begin_resize(id, ResizeCorner::BottomRight);
        wm.drag_to(r.x as u16, r.y as u16);
        let small = wm.get(id).unwrap().rect;
        assert_eq!((small.w, small.h), (MIN_WINDOW_W, MIN_WINDOW_H));
        wm.drag_to((r.x + 99) as u16, (r.y + 29) as u16);
        let big = wm.get(id).unwrap().rect;
        assert_eq!((big.w, big.h), (100, 30));
        assert_eq!((big.x, big.y), (r.x, r.y));
    }

    #[test]
    fn taskbar_prefers_visible_then_minimized_then_opens() {
        let mut wm = WindowManager::new();
        let calc = wm.open(AppKind::Calculator, WindowData::default());
        let _other = wm.open(AppKind::Notepad, WindowData::default());
        assert_eq!(wm.activate_from_taskbar(AppKind::Calculator), calc);
        assert_eq!(wm.focused_id(), Some(calc));

        wm.minimize(calc);
        assert_eq!(wm.activate_from_taskbar(AppKind::Calculator), calc);
        assert!(!wm.get(calc).unwrap().minimized);

        let fresh = wm.activate_from_taskbar(AppKind::Terminal);
        assert_eq!(wm.get(fresh).unwrap().app, AppKind::Terminal);
        assert_eq!(wm.len(), 3);
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut wm = WindowManager::new();
        let id = wm.open(AppKind::Notepad, WindowData::default());
        wm.update(
            id,
            WindowPatch {
                title: Some("notes.txt - Notepad".into()),
                ..WindowPatch::default()
            },
        );
        let w = wm.get(id).unwrap();
        assert_eq!(w.title, "notes.txt - Notepad");
        assert!(!w.minimized);
    }

    #[test]
    fn close_removes_window_and_cancels_drag() {
        let mut wm = WindowManager::new();
        let id = wm.open(AppKind::Security, WindowData::default());
        wm.begin_drag(id, 10, 2);
        wm.close(id);
        assert!(wm.is_empty());
        assert!(!wm.is_dragging());
    }
}
