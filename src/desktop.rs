use anyhow::Result;
use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

use crate::core::calculator::{Key, KEYPAD};
use crate::core::context::{AppState, DesktopContext, SecurityTab, SecurityView};
use crate::core::explorer::{self, DeleteRequest, Explorer};
use crate::core::paint::{Paint, Tool, CANVAS_H, CANVAS_W, MAX_LINE_WIDTH, PALETTE};
use crate::core::path;
use crate::core::security::Protection;
use crate::core::shell::{LineKind, ShellOutcome};
use crate::core::store::{FileRecord, Store, VfsError};
use crate::core::window::{AppKind, ResizeCorner, WinRect, WindowData, WindowRecord, MIN_WINDOW_H, MIN_WINDOW_W};
use crate::core::ctf;
use crate::status::battery_display;
use crate::ui::{dim_style, normal_style, sel_style, title_style, truncate, Term};

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(450);
const STATUS_TTL: Duration = Duration::from_secs(4);
const TITLE_MIN_BUTTON: &str = "[-]";
const TITLE_MAX_BUTTON: &str = "[+]";
const TITLE_RESTORE_BUTTON: &str = "[R]";
const TITLE_CLOSE_BUTTON: &str = "[X]";
const TASK_PAGER_PREV: &str = "[<]";
const TASK_PAGER_NEXT: &str = "[>]";
const TASK_START_BUTTON: &str = "[Start]";
const TASK_START_SEPARATOR: &str = " | ";
const ICON_W: u16 = 14;
const ICON_H: u16 = 3;

const PINNED_APPS: [AppKind; 5] = [
    AppKind::Explorer,
    AppKind::Security,
    AppKind::Paint,
    AppKind::Calculator,
    AppKind::Terminal,
];

const WALLPAPER: [&str; 4] = [
    "Windows 11",
    "Now with 100% more bugs!",
    "CTF Edition",
    "Find the virus!",
];
const WATERMARK: [&str; 2] = ["Windows 11 activation failed", "Author - Suraj Shankhpal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartItem {
    Open(AppKind),
    Reload,
    Exit,
}

const START_ITEMS: [(&str, StartItem); 8] = [
    ("File Explorer", StartItem::Open(AppKind::Explorer)),
    ("Windows Security", StartItem::Open(AppKind::Security)),
    ("Paint", StartItem::Open(AppKind::Paint)),
    ("Calculator", StartItem::Open(AppKind::Calculator)),
    ("Notepad", StartItem::Open(AppKind::Notepad)),
    ("Terminal", StartItem::Open(AppKind::Terminal)),
    ("Restart", StartItem::Reload),
    ("Exit", StartItem::Exit),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplorerButton {
    Up,
    Desktop,
    ThisPc,
}

const EXPLORER_TOOLBAR: [(&str, ExplorerButton); 3] = [
    ("[<]", ExplorerButton::Up),
    ("[Desktop]", ExplorerButton::Desktop),
    ("[This PC]", ExplorerButton::ThisPc),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaintButton {
    Tool(Tool),
    Undo,
    Save,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    DesktopDelete(String),
    ExplorerDelete { window_id: u64, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputAction {
    Rename { window_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    Confirm { prompt: String, action: PendingAction },
    Input { prompt: String, buf: String, action: InputAction },
    Message { title: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickTarget {
    DesktopIcon(usize),
    ExplorerEntry { window_id: u64, row: usize },
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    target: ClickTarget,
    at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct TaskButton {
    window_id: u64,
    rect: Rect,
}

struct TaskbarLayout {
    pinned: Vec<(AppKind, Rect)>,
    buttons: Vec<TaskButton>,
    prev_rect: Option<Rect>,
    next_rect: Option<Rect>,
    can_scroll_left: bool,
    can_scroll_right: bool,
}

impl TaskbarLayout {
    fn empty() -> Self {
        Self {
            pinned: Vec::new(),
            buttons: Vec::new(),
            prev_rect: None,
            next_rect: None,
            can_scroll_left: false,
            can_scroll_right: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowHit {
    Title,
    Minimize,
    Maximize,
    Close,
    Resize(ResizeCorner),
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

#[derive(Default)]
struct DesktopState {
    cursor_x: u16,
    cursor_y: u16,
    task_scroll: usize,
    last_click: Option<LastClick>,
    start_open: bool,
    start_selected: usize,
    icon_selected: Option<usize>,
    modal: Option<Modal>,
    paint_stroke: Option<u64>,
    status_seen: Option<(String, Instant)>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

pub fn desktop_mode<S: Store>(terminal: &mut Term, ctx: &mut DesktopContext<S>) -> Result<()> {
    let _ = terminal.hide_cursor();
    execute!(terminal.backend_mut(), EnableMouseCapture)?;
    let result = run_desktop_loop(terminal, ctx);
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture);
    let _ = terminal.show_cursor();
    result
}

fn run_desktop_loop<S: Store>(terminal: &mut Term, ctx: &mut DesktopContext<S>) -> Result<()> {
    let mut state = DesktopState::default();
    tracing::info!("desktop session started");

    loop {
        if let Err(err) = ctx.tick(Instant::now()) {
            report(ctx, err);
        }
        expire_status(ctx, &mut state);
        draw_desktop(terminal, ctx, &mut state)?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        let ts = terminal.size()?;
        let size = full_rect(ts.width, ts.height);
        let flow = match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                    continue;
                }
                handle_key(ctx, &mut state, key)
            }
            Event::Mouse(mouse) => handle_mouse(ctx, &mut state, mouse, size),
            _ => Flow::Continue,
        };
        if flow == Flow::Exit {
            tracing::info!("desktop session ended");
            return Ok(());
        }
    }
}

fn report<S: Store>(ctx: &mut DesktopContext<S>, err: VfsError) {
    tracing::warn!(%err, "desktop operation failed");
    ctx.set_status(format!("Error: {err}"));
}

fn soft<S: Store, T>(ctx: &mut DesktopContext<S>, result: Result<T, VfsError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(err) => {
            report(ctx, err);
            None
        }
    }
}

fn expire_status<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState) {
    let Some(current) = ctx.status().map(str::to_string) else {
        state.status_seen = None;
        return;
    };
    match &state.status_seen {
        Some((seen, at)) if *seen == current => {
            if at.elapsed() > STATUS_TTL {
                ctx.clear_status();
                state.status_seen = None;
            }
        }
        _ => state.status_seen = Some((current, Instant::now())),
    }
}

// ── Keyboard ──────────────────────────────────────────────────────────────────

fn handle_key<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, key: KeyEvent) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('q')) {
        return Flow::Exit;
    }

    if ctx.is_crashed() {
        if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
            let r = ctx.reload_system();
            soft(ctx, r);
            *state = DesktopState::default();
        }
        return Flow::Continue;
    }

    if ctx.flag_revealed() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            ctx.dismiss_flag();
        }
        return Flow::Continue;
    }

    if state.modal.is_some() {
        handle_modal_key(ctx, state, key.code);
        return Flow::Continue;
    }

    if matches!(key.code, KeyCode::F(10)) {
        state.start_open = !state.start_open;
        state.start_selected = 0;
        return Flow::Continue;
    }

    if state.start_open {
        match key.code {
            KeyCode::Esc => state.start_open = false,
            KeyCode::Up => state.start_selected = state.start_selected.saturating_sub(1),
            KeyCode::Down => {
                state.start_selected = (state.start_selected + 1).min(START_ITEMS.len() - 1)
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let item = START_ITEMS[state.start_selected].1;
                return run_start_item(ctx, state, item);
            }
            _ => {}
        }
        return Flow::Continue;
    }

    let focused = ctx.windows.focused_id();
    if let Some(id) = focused {
        match key.code {
            KeyCode::Char('w') if ctrl => {
                ctx.close_window(id);
                return Flow::Continue;
            }
            KeyCode::F(6) => {
                cycle_focus(ctx);
                return Flow::Continue;
            }
            KeyCode::F(9) => {
                ctx.windows.minimize(id);
                return Flow::Continue;
            }
            KeyCode::F(11) => {
                ctx.windows.maximize(id);
                return Flow::Continue;
            }
            _ => {}
        }
        let Some(app) = ctx.windows.get(id).map(|w| w.app) else {
            return Flow::Continue;
        };
        match app {
            AppKind::Explorer => explorer_key(ctx, state, id, key.code),
            AppKind::Notepad => notepad_key(ctx, id, key),
            AppKind::Paint => paint_key(ctx, id, key),
            AppKind::Calculator => calculator_key(ctx, id, key.code),
            AppKind::Terminal => terminal_key(ctx, id, key.code),
            AppKind::Security => security_key(ctx, id, key.code),
        }
        return Flow::Continue;
    }

    desktop_icon_key(ctx, state, key.code);
    Flow::Continue
}

fn cycle_focus<S: Store>(ctx: &mut DesktopContext<S>) {
    let bottom = ctx
        .windows
        .stacking_order()
        .into_iter()
        .find(|w| !w.minimized)
        .map(|w| w.id);
    if let Some(id) = bottom {
        ctx.windows.focus(id);
    }
}

fn run_start_item<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, item: StartItem) -> Flow {
    state.start_open = false;
    match item {
        StartItem::Open(app) => {
            let r = ctx.open_app(app, WindowData::default());
            soft(ctx, r);
            Flow::Continue
        }
        StartItem::Reload => {
            let r = ctx.reload_system();
            soft(ctx, r);
            *state = DesktopState::default();
            Flow::Continue
        }
        StartItem::Exit => Flow::Exit,
    }
}

fn handle_modal_key<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, code: KeyCode) {
    let Some(modal) = state.modal.as_mut() else {
        return;
    };
    match modal {
        Modal::Message { .. } => {
            if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                state.modal = None;
            }
        }
        Modal::Confirm { .. } => match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(Modal::Confirm { action, .. }) = state.modal.take() {
                    run_pending(ctx, action);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.modal = None,
            _ => {}
        },
        Modal::Input { buf, .. } => match code {
            KeyCode::Enter => {
                if let Some(Modal::Input { buf, action, .. }) = state.modal.take() {
                    run_input(ctx, action, &buf);
                }
            }
            KeyCode::Esc => state.modal = None,
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) if !c.is_control() => buf.push(c),
            _ => {}
        },
    }
}

fn run_pending<S: Store>(ctx: &mut DesktopContext<S>, action: PendingAction) {
    let result = match action {
        PendingAction::DesktopDelete(path) => ctx.delete_from_desktop(&path),
        PendingAction::ExplorerDelete { window_id, path } => {
            ctx.explorer_confirm_delete(window_id, &path)
        }
    };
    soft(ctx, result);
}

fn run_input<S: Store>(ctx: &mut DesktopContext<S>, action: InputAction, text: &str) {
    match action {
        InputAction::Rename { window_id } => {
            let Some((AppState::Explorer(ex), fs)) = ctx.app_and_fs(window_id) else {
                return;
            };
            let result = ex.rename_selected(fs, text);
            if let Some(Some(moved)) = soft(ctx, result) {
                ctx.set_status(moved.status("Renamed to"));
            }
        }
    }
}

fn desktop_icon_key<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, code: KeyCode) {
    let count = ctx.desktop_files().len();
    if count == 0 {
        state.icon_selected = None;
        return;
    }
    let current = state.icon_selected.unwrap_or(0).min(count - 1);
    match code {
        KeyCode::Up | KeyCode::Left => state.icon_selected = Some(current.saturating_sub(1)),
        KeyCode::Down | KeyCode::Right | KeyCode::Tab => {
            state.icon_selected = Some((current + 1).min(count - 1))
        }
        KeyCode::Enter => {
            let rec = ctx.desktop_files()[current].clone();
            open_desktop_file(ctx, &rec);
        }
        KeyCode::Delete => {
            let rec = &ctx.desktop_files()[current];
            state.modal = Some(Modal::Confirm {
                prompt: format!("Are you sure you want to delete {}?", rec.name),
                action: PendingAction::DesktopDelete(rec.path.clone()),
            });
        }
        KeyCode::Char('e') => {
            let r = ctx.open_app(AppKind::Explorer, WindowData::default());
            soft(ctx, r);
        }
        _ => {}
    }
}

fn open_desktop_file<S: Store>(ctx: &mut DesktopContext<S>, rec: &FileRecord) {
    let r = ctx.open_file(rec);
    if let Some(None) = soft(ctx, r) {
        ctx.set_status(format!("Cannot open {}", rec.name));
    }
}

fn explorer_key<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, id: u64, code: KeyCode) {
    match code {
        KeyCode::Enter => {
            let r = ctx.explorer_open_selected(id);
            soft(ctx, r);
        }
        KeyCode::Delete => request_explorer_delete(ctx, state, id),
        KeyCode::F(2) => {
            if let Some(AppState::Explorer(ex)) = ctx.app(id) {
                if let Some(entry) = ex.selected_entry() {
                    state.modal = Some(Modal::Input {
                        prompt: format!("Rename {}", entry.name),
                        buf: entry.name.clone(),
                        action: InputAction::Rename { window_id: id },
                    });
                }
            }
        }
        KeyCode::Esc => ctx.close_window(id),
        _ => {
            let Some((AppState::Explorer(ex), fs)) = ctx.app_and_fs(id) else {
                return;
            };
            let result = match code {
                KeyCode::Up => {
                    ex.select_prev();
                    Ok(None)
                }
                KeyCode::Down => {
                    ex.select_next();
                    Ok(None)
                }
                KeyCode::Backspace | KeyCode::Left => ex.go_parent(fs).map(|_| None),
                KeyCode::Char('h') => ex.go_desktop(fs).map(|_| None),
                KeyCode::Char('p') => ex.go_this_pc(fs).map(|_| None),
                KeyCode::Char('n') => ex
                    .new_folder(fs)
                    .map(|_| Some(format!("Created {}", explorer::NEW_FOLDER_NAME))),
                KeyCode::Char('x') => Ok(ex
                    .cut_selected()
                    .map(|p| format!("Cut {}", path::file_name(p)))),
                KeyCode::Char('v') => ex
                    .paste(fs)
                    .map(|moved| moved.map(|m| m.status("Moved"))),
                KeyCode::F(5) => ex.refresh(fs).map(|_| None),
                _ => Ok(None),
            };
            if let Some(Some(msg)) = soft(ctx, result) {
                ctx.set_status(msg);
            }
        }
    }
}

fn request_explorer_delete<S: Store>(ctx: &mut DesktopContext<S>, state: &mut DesktopState, id: u64) {
    match ctx.explorer_request_delete(id) {
        DeleteRequest::Nothing => {}
        DeleteRequest::Denied(text) => {
            state.modal = Some(Modal::Message {
                title: "Access Denied".into(),
                text: text.to_string(),
            })
        }
        DeleteRequest::Confirm { path, prompt } => {
            state.modal = Some(Modal::Confirm {
                prompt,
                action: PendingAction::ExplorerDelete { window_id: id, path },
            })
        }
    }
}

fn notepad_key<S: Store>(ctx: &mut DesktopContext<S>, id: u64, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if matches!(key.code, KeyCode::Char('s')) {
            let r = ctx.save_notepad(id);
            soft(ctx, r);
        }
        return;
    }
    let Some(AppState::Notepad(pad)) = ctx.app_mut(id) else {
        return;
    };
    match key.code {
        KeyCode::Char(c) => pad.insert_char(c),
        KeyCode::Tab => {
            for _ in 0..4 {
                pad.insert_char(' ');
            }
        }
        KeyCode::Enter => pad.newline(),
        KeyCode::Backspace => pad.backspace(),
        KeyCode::Left => pad.left(),
        KeyCode::Right => pad.right(),
        KeyCode::Up => pad.up(),
        KeyCode::Down => pad.down(),
        KeyCode::Home => pad.home(),
        KeyCode::End => pad.end(),
        _ => {}
    }
}

fn paint_key<S: Store>(ctx: &mut DesktopContext<S>, id: u64, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('s')) {
        let r = ctx.save_paint(id, chrono::Utc::now().timestamp_millis());
        soft(ctx, r);
        return;
    }
    let Some(AppState::Paint(paint)) = ctx.app_mut(id) else {
        return;
    };
    match key.code {
        KeyCode::Char('z') if ctrl => paint.undo(),
        KeyCode::Char('u') => paint.undo(),
        KeyCode::Char('b') => paint.tool = Tool::Brush,
        KeyCode::Char('e') => paint.tool = Tool::Eraser,
        KeyCode::Char('l') => paint.tool = Tool::Line,
        KeyCode::Char('r') => paint.tool = Tool::Rectangle,
        KeyCode::Char('o') => paint.tool = Tool::Circle,
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let w = paint.line_width.saturating_add(1);
            paint.set_line_width(w);
        }
        KeyCode::Char('-') => {
            let w = paint.line_width.saturating_sub(1);
            paint.set_line_width(w);
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let idx = c.to_digit(10).unwrap_or(0) as usize;
            paint.color = idx.min(PALETTE.len() - 1);
        }
        _ => {}
    }
}

fn calculator_key<S: Store>(ctx: &mut DesktopContext<S>, id: u64, code: KeyCode) {
    let Some(AppState::Calculator(calc)) = ctx.app_mut(id) else {
        return;
    };
    let key = match code {
        KeyCode::Enter => Some(Key::Equals),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Delete => Some(Key::ClearEntry),
        KeyCode::Esc => Some(Key::Clear),
        KeyCode::Char(c) => Key::from_char(c),
        _ => None,
    };
    if let Some(key) = key {
        calc.press(key);
    }
}

fn terminal_key<S: Store>(ctx: &mut DesktopContext<S>, id: u64, code: KeyCode) {
    if code == KeyCode::Enter {
        match ctx.run_terminal(id, Instant::now()) {
            Ok(ShellOutcome::FlagCaptured(flag)) => ctx.set_status(format!("Flag: {flag}")),
            Ok(ShellOutcome::CrashScheduled) => ctx.set_status("SYSTEM CRASH IMMINENT"),
            Ok(ShellOutcome::None) => {}
            Err(err) => report(ctx, err),
        }
        return;
    }
    let Some(AppState::Terminal(shell)) = ctx.app_mut(id) else {
        return;
    };
    match code {
        KeyCode::Char(c) => shell.input.push(c),
        KeyCode::Backspace => {
            shell.input.pop();
        }
        KeyCode::Up => shell.history_prev(),
        KeyCode::Down => shell.history_next(),
        _ => {}
    }
}

fn security_key<S: Store>(ctx: &mut DesktopContext<S>, id: u64, code: KeyCode) {
    let quarantine_len = ctx.security.quarantine.len();
    let Some(AppState::Security(view)) = ctx.app_mut(id) else {
        return;
    };
    let rows = match view.tab {
        SecurityTab::Protection => Protection::ALL.len(),
        SecurityTab::Quarantine => quarantine_len,
    };
    match code {
        KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
            view.tab = match view.tab {
                SecurityTab::Protection => SecurityTab::Quarantine,
                SecurityTab::Quarantine => SecurityTab::Protection,
            };
            view.selected = 0;
        }
        KeyCode::Up => view.selected = view.selected.saturating_sub(1),
        KeyCode::Down => view.selected = (view.selected + 1).min(rows.saturating_sub(1)),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Char('d') | KeyCode::Delete => {
            let view = view.clone();
            security_activate(ctx, &view, code);
        }
        _ => {}
    }
}

fn security_activate<S: Store>(ctx: &mut DesktopContext<S>, view: &SecurityView, code: KeyCode) {
    let result = match view.tab {
        SecurityTab::Protection => match Protection::ALL.get(view.selected) {
            Some(p) if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) => {
                ctx.toggle_protection(*p)
            }
            _ => Ok(()),
        },
        SecurityTab::Quarantine => {
            let Some(item) = ctx.security.quarantine.get(view.selected).map(|i| i.id.clone()) else {
                return;
            };
            match code {
                KeyCode::Char('r') | KeyCode::Enter => ctx.restore_from_quarantine(&item),
                KeyCode::Char('d') | KeyCode::Delete => ctx.delete_from_quarantine(&item),
                _ => Ok(()),
            }
        }
    };
    soft(ctx, result);
}

// ── Mouse ─────────────────────────────────────────────────────────────────────

fn handle_mouse<S: Store>(
    ctx: &mut DesktopContext<S>,
    state: &mut DesktopState,
    mouse: MouseEvent,
    size: Rect,
) -> Flow {
    state.cursor_x = mouse.column;
    state.cursor_y = mouse.row;
    let desk = desktop_area(size);
    let task = taskbar_area(size);
    let (lx, ly) = (
        mouse.column.saturating_sub(desk.x),
        mouse.row.saturating_sub(desk.y),
    );

    if ctx.is_crashed() || ctx.flag_revealed() || state.modal.is_some() {
        return Flow::Continue;
    }

    match mouse.kind {
        MouseEventKind::Drag(MouseButton::Left) => {
            if ctx.windows.is_dragging() {
                ctx.windows.drag_to(lx, ly);
            } else if let Some(id) = state.paint_stroke {
                if let Some((px, py)) = canvas_point(ctx, id, desk, mouse.column, mouse.row) {
                    if let Some(AppState::Paint(paint)) = ctx.app_mut(id) {
                        paint.pointer_move(px, py);
                    }
                }
            }
            return Flow::Continue;
        }
        MouseEventKind::Up(MouseButton::Left) => {
            ctx.windows.end_drag();
            if let Some(id) = state.paint_stroke.take() {
                let (px, py) = canvas_point_unclamped(ctx, id, desk, mouse.column, mouse.row);
                if let Some(AppState::Paint(paint)) = ctx.app_mut(id) {
                    paint.pointer_up(px, py);
                }
            }
            return Flow::Continue;
        }
        MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
            scroll_focused(ctx, matches!(mouse.kind, MouseEventKind::ScrollUp));
            return Flow::Continue;
        }
        MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Down(MouseButton::Right) => {}
        _ => return Flow::Continue,
    }
    let right_click = matches!(mouse.kind, MouseEventKind::Down(MouseButton::Right));

    if point_in_rect(mouse.column, mouse.row, start_button_rect(task)) {
        state.start_open = !state.start_open;
        state.start_selected = 0;
        return Flow::Continue;
    }

    if state.start_open {
        let menu = start_menu_rect(task);
        if point_in_rect(mouse.column, mouse.row, menu) {
            let row = mouse.row.saturating_sub(menu.y + 1) as usize;
            if mouse.row > menu.y && row < START_ITEMS.len() {
                return run_start_item(ctx, state, START_ITEMS[row].1);
            }
            return Flow::Continue;
        }
        state.start_open = false;
    }

    let layout = taskbar_layout(ctx, state, task);
    for (app, rect) in &layout.pinned {
        if point_in_rect(mouse.column, mouse.row, *rect) {
            let r = ctx.activate_from_taskbar(*app);
            soft(ctx, r);
            return Flow::Continue;
        }
    }
    if let Some(prev) = layout.prev_rect {
        if point_in_rect(mouse.column, mouse.row, prev) {
            if layout.can_scroll_left {
                state.task_scroll = state.task_scroll.saturating_sub(1);
            }
            return Flow::Continue;
        }
    }
    if let Some(next) = layout.next_rect {
        if point_in_rect(mouse.column, mouse.row, next) {
            if layout.can_scroll_right {
                state.task_scroll = (state.task_scroll + 1).min(ctx.windows.len().saturating_sub(1));
            }
            return Flow::Continue;
        }
    }
    for btn in layout.buttons {
        if point_in_rect(mouse.column, mouse.row, btn.rect) {
            activate_task_button(ctx, btn.window_id);
            return Flow::Continue;
        }
    }

    if let Some((id, hit)) = hit_window(ctx, desk, mouse.column, mouse.row) {
        ctx.windows.focus(id);
        match hit {
            WindowHit::Close => ctx.close_window(id),
            WindowHit::Minimize => ctx.windows.minimize(id),
            WindowHit::Maximize => ctx.windows.maximize(id),
            WindowHit::Title => ctx.windows.begin_drag(id, lx, ly),
            WindowHit::Resize(corner) => ctx.windows.begin_resize(id, corner),
            WindowHit::Content => window_content_click(ctx, state, id, desk, mouse, right_click),
        }
        return Flow::Continue;
    }

    if let Some(idx) = hit_desktop_icon(ctx, desk, mouse.column, mouse.row) {
        state.icon_selected = Some(idx);
        let rec = ctx.desktop_files()[idx].clone();
        if right_click {
            state.modal = Some(Modal::Confirm {
                prompt: format!("Are you sure you want to delete {}?", rec.name),
                action: PendingAction::DesktopDelete(rec.path),
            });
        } else if is_double_click(state, ClickTarget::DesktopIcon(idx)) {
            open_desktop_file(ctx, &rec);
        }
        return Flow::Continue;
    }
    state.icon_selected = None;
    Flow::Continue
}

/// Taskbar click: minimize the focused window, otherwise bring it up.
fn activate_task_button<S: Store>(ctx: &mut DesktopContext<S>, id: u64) {
    if ctx.windows.focused_id() == Some(id) {
        ctx.windows.minimize(id);
    } else {
        ctx.windows.focus(id);
    }
}

fn scroll_focused<S: Store>(ctx: &mut DesktopContext<S>, up: bool) {
    let Some(id) = ctx.windows.focused_id() else {
        return;
    };
    if let Some(AppState::Explorer(ex)) = ctx.app_mut(id) {
        if up {
            ex.select_prev();
        } else {
            ex.select_next();
        }
    }
}

fn window_content_click<S: Store>(
    ctx: &mut DesktopContext<S>,
    state: &mut DesktopState,
    id: u64,
    desk: Rect,
    mouse: MouseEvent,
    right_click: bool,
) {
    let Some(win) = ctx.windows.get(id) else {
        return;
    };
    let inner = inner_area(window_area(win, desk));
    if !point_in_rect(mouse.column, mouse.row, inner) {
        return;
    }
    let app = win.app;
    let (cx, cy) = (mouse.column - inner.x, mouse.row - inner.y);
    match app {
        AppKind::Explorer => explorer_click(ctx, state, id, inner, cx, cy, right_click),
        AppKind::Paint => paint_click(ctx, state, id, desk, mouse, cx, cy),
        AppKind::Calculator => {
            if let Some(key) = calculator_key_at(inner, cx, cy) {
                if let Some(AppState::Calculator(calc)) = ctx.app_mut(id) {
                    calc.press(key);
                }
            }
        }
        AppKind::Security => security_click(ctx, id, cx, cy),
        AppKind::Notepad => {
            if cy == 0 && (cx as usize) < NOTEPAD_SAVE.len() {
                let r = ctx.save_notepad(id);
                soft(ctx, r);
            }
        }
        AppKind::Terminal => {}
    }
}

fn explorer_click<S: Store>(
    ctx: &mut DesktopContext<S>,
    state: &mut DesktopState,
    id: u64,
    inner: Rect,
    cx: u16,
    cy: u16,
    right_click: bool,
) {
    if cy == 0 {
        if let Some(button) = explorer_button_at(cx) {
            let Some((AppState::Explorer(ex), fs)) = ctx.app_and_fs(id) else {
                return;
            };
            let r = match button {
                ExplorerButton::Up => ex.go_parent(fs),
                ExplorerButton::Desktop => ex.go_desktop(fs),
                ExplorerButton::ThisPc => ex.go_this_pc(fs),
            };
            soft(ctx, r);
        }
        return;
    }
    if cy < 2 || cy >= inner.height.saturating_sub(1) {
        return;
    }
    let Some(AppState::Explorer(ex)) = ctx.app_mut(id) else {
        return;
    };
    let row = ex.scroll + (cy - 2) as usize;
    if row >= ex.entries().len() {
        return;
    }
    ex.selected = row;
    if right_click {
        request_explorer_delete(ctx, state, id);
        return;
    }
    if is_double_click(state, ClickTarget::ExplorerEntry { window_id: id, row }) {
        let r = ctx.explorer_open_selected(id);
        soft(ctx, r);
    }
}

fn explorer_button_at(cx: u16) -> Option<ExplorerButton> {
    let mut x = 0u16;
    for (label, button) in EXPLORER_TOOLBAR {
        let w = label.len() as u16;
        if cx >= x && cx < x + w {
            return Some(button);
        }
        x += w + 1;
    }
    None
}

fn paint_toolbar() -> Vec<(String, PaintButton)> {
    let mut items: Vec<(String, PaintButton)> = Tool::ALL
        .iter()
        .map(|t| (format!("[{}]", t.label()), PaintButton::Tool(*t)))
        .collect();
    items.push(("[Undo]".into(), PaintButton::Undo));
    items.push(("[Save]".into(), PaintButton::Save));
    items
}

fn paint_button_at(cx: u16) -> Option<PaintButton> {
    let mut x = 0u16;
    for (label, button) in paint_toolbar() {
        let w = label.chars().count() as u16;
        if cx >= x && cx < x + w {
            return Some(button);
        }
        x += w + 1;
    }
    None
}

// Offsets of the width buttons in "Width: [-] NN/M [+]" after the swatches.
const PAINT_WIDTH_MINUS_X: u16 = PALETTE.len() as u16 * 3 + 7;
const PAINT_WIDTH_PLUS_X: u16 = PAINT_WIDTH_MINUS_X + 9;

fn paint_click<S: Store>(
    ctx: &mut DesktopContext<S>,
    state: &mut DesktopState,
    id: u64,
    desk: Rect,
    mouse: MouseEvent,
    cx: u16,
    cy: u16,
) {
    if cy == 0 {
        match paint_button_at(cx) {
            Some(PaintButton::Save) => {
                let r = ctx.save_paint(id, chrono::Utc::now().timestamp_millis());
                soft(ctx, r);
            }
            Some(PaintButton::Undo) => {
                if let Some(AppState::Paint(paint)) = ctx.app_mut(id) {
                    paint.undo();
                }
            }
            Some(PaintButton::Tool(tool)) => {
                if let Some(AppState::Paint(paint)) = ctx.app_mut(id) {
                    paint.tool = tool;
                }
            }
            None => {}
        }
        return;
    }
    if cy == 1 {
        let Some(AppState::Paint(paint)) = ctx.app_mut(id) else {
            return;
        };
        if cx < PALETTE.len() as u16 * 3 {
            if cx % 3 < 2 {
                paint.color = (cx / 3) as usize;
            }
        } else if (PAINT_WIDTH_MINUS_X..PAINT_WIDTH_MINUS_X + 3).contains(&cx) {
            let w = paint.line_width.saturating_sub(1);
            paint.set_line_width(w);
        } else if (PAINT_WIDTH_PLUS_X..PAINT_WIDTH_PLUS_X + 3).contains(&cx) {
            let w = paint.line_width.saturating_add(1);
            paint.set_line_width(w);
        }
        return;
    }
    if let Some((px, py)) = canvas_point(ctx, id, desk, mouse.column, mouse.row) {
        if let Some(AppState::Paint(paint)) = ctx.app_mut(id) {
            paint.pointer_down(px, py);
            state.paint_stroke = Some(id);
        }
    }
}

/// Canvas origin on screen for a paint window.
fn canvas_origin<S: Store>(ctx: &DesktopContext<S>, id: u64, desk: Rect) -> Option<Rect> {
    let win = ctx.windows.get(id)?;
    let inner = inner_area(window_area(win, desk));
    Some(Rect {
        x: inner.x,
        y: inner.y + 2,
        width: inner.width.min(CANVAS_W as u16),
        height: inner.height.saturating_sub(2).min(CANVAS_H as u16),
    })
}

fn canvas_point<S: Store>(ctx: &DesktopContext<S>, id: u64, desk: Rect, x: u16, y: u16) -> Option<(i32, i32)> {
    let canvas = canvas_origin(ctx, id, desk)?;
    point_in_rect(x, y, canvas).then(|| (i32::from(x - canvas.x), i32::from(y - canvas.y)))
}

fn canvas_point_unclamped<S: Store>(ctx: &DesktopContext<S>, id: u64, desk: Rect, x: u16, y: u16) -> (i32, i32) {
    match canvas_origin(ctx, id, desk) {
        Some(c) => (i32::from(x) - i32::from(c.x), i32::from(y) - i32::from(c.y)),
        None => (0, 0),
    }
}

fn calculator_key_at(inner: Rect, cx: u16, cy: u16) -> Option<Key> {
    let row = cy.checked_sub(3)? as usize;
    let bw = (inner.width / 4).max(1);
    let col = (cx / bw) as usize;
    KEYPAD.get(row).and_then(|r| r.get(col)).copied()
}

fn security_click<S: Store>(ctx: &mut DesktopContext<S>, id: u64, cx: u16, cy: u16) {
    let Some(AppState::Security(view)) = ctx.app_mut(id) else {
        return;
    };
    if cy == 0 {
        let tab = if cx < 12 {
            SecurityTab::Protection
        } else if cx < 25 {
            SecurityTab::Quarantine
        } else {
            return;
        };
        if view.tab != tab {
            view.tab = tab;
            view.selected = 0;
        }
        return;
    }
    let Some(row) = cy.checked_sub(2) else {
        return;
    };
    view.selected = (row / 2) as usize;
    let view = view.clone();
    if view.tab == SecurityTab::Protection {
        security_activate(ctx, &view, KeyCode::Enter);
    }
}

fn hit_window<S: Store>(ctx: &DesktopContext<S>, desk: Rect, x: u16, y: u16) -> Option<(u64, WindowHit)> {
    for win in ctx.windows.stacking_order().into_iter().rev() {
        if win.minimized {
            continue;
        }
        let area = window_area(win, desk);
        if !point_in_rect(x, y, area) {
            continue;
        }
        if point_in_rect(x, y, title_close_button_rect(area)) {
            return Some((win.id, WindowHit::Close));
        }
        if point_in_rect(x, y, title_max_button_rect(area)) {
            return Some((win.id, WindowHit::Maximize));
        }
        if point_in_rect(x, y, title_min_button_rect(area)) {
            return Some((win.id, WindowHit::Minimize));
        }
        if !win.maximized {
            if let Some(corner) = hit_resize_corner(area, x, y) {
                return Some((win.id, WindowHit::Resize(corner)));
            }
        }
        if y == area.y {
            return Some((win.id, WindowHit::Title));
        }
        return Some((win.id, WindowHit::Content));
    }
    None
}

fn hit_desktop_icon<S: Store>(ctx: &DesktopContext<S>, desk: Rect, x: u16, y: u16) -> Option<usize> {
    (0..ctx.desktop_files().len()).find(|i| {
        desktop_icon_rect(desk, *i).is_some_and(|r| point_in_rect(x, y, r))
    })
}

fn is_double_click(state: &mut DesktopState, target: ClickTarget) -> bool {
    let now = Instant::now();
    if let Some(prev) = state.last_click {
        if prev.target == target && now.duration_since(prev.at) <= DOUBLE_CLICK_WINDOW {
            state.last_click = None;
            return true;
        }
    }
    state.last_click = Some(LastClick { target, at: now });
    false
}

// ── Drawing ───────────────────────────────────────────────────────────────────

fn draw_desktop<S: Store>(terminal: &mut Term, ctx: &mut DesktopContext<S>, state: &mut DesktopState) -> Result<()> {
    let ts = terminal.size()?;
    let size = full_rect(ts.width, ts.height);
    let desk = desktop_area(size);
    clamp_all_windows(ctx, desk);
    sync_explorer_scroll(ctx, desk);
    state.task_scroll = state.task_scroll.min(ctx.windows.len().saturating_sub(1));

    terminal.draw(|f| {
        let size = f.area();
        let top = top_status_area(size);
        let desktop = desktop_area(size);
        let task = taskbar_area(size);

        f.render_widget(Clear, size);

        if ctx.is_crashed() {
            draw_crash_screen(f, size);
            return;
        }

        draw_top_status(f, ctx, top);
        draw_desktop_background(f, ctx, state, desktop);
        draw_taskbar(f, ctx, state, task);

        let focused = ctx.windows.focused_id();
        for win in ctx.windows.stacking_order() {
            draw_window(f, ctx, win, desktop, Some(win.id) == focused);
        }

        if state.start_open {
            draw_start_menu(f, state, task);
        }
        if let Some(modal) = &state.modal {
            draw_modal(f, modal, size);
        }
        if ctx.flag_revealed() {
            draw_flag_modal(f, size);
        }

        draw_cursor(f, state.cursor_x, state.cursor_y, size);
    })?;
    Ok(())
}

fn draw_top_status<S: Store>(f: &mut Frame, ctx: &DesktopContext<S>, area: Rect) {
    if area.height == 0 {
        return;
    }
    let now = Local::now().format("%a %Y-%m-%d %I:%M%p").to_string();
    let batt = battery_display();
    let width = area.width as usize;
    let mut row = vec![' '; width];

    write_text(&mut row, 0, &format!(" {} ", now));
    if let Some(msg) = ctx.status() {
        let msg = truncate(msg, width.saturating_sub(now.len() + batt.len() + 6));
        let start = width.saturating_sub(msg.chars().count()) / 2;
        write_text(&mut row, start, &msg);
    }
    if width >= batt.len() + 2 {
        let start = width.saturating_sub(batt.len() + 2);
        write_text(&mut row, start, &format!(" {} ", batt));
    }

    let line: String = row.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(line, sel_style()))),
        area,
    );
}

fn draw_desktop_background<S: Store>(f: &mut Frame, ctx: &DesktopContext<S>, state: &DesktopState, area: Rect) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let mut lines = Vec::new();
    let top = area.height.saturating_sub(WALLPAPER.len() as u16) / 2;
    for y in 0..area.height {
        let text = y
            .checked_sub(top)
            .and_then(|i| WALLPAPER.get(i as usize))
            .copied()
            .unwrap_or("");
        let style = if y == top { title_style() } else { dim_style() };
        lines.push(Line::from(Span::styled(text, style)));
    }
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);

    if area.height > 4 {
        let w = WATERMARK.iter().map(|l| l.len()).max().unwrap_or(0) as u16 + 2;
        let mark = Rect {
            x: area.x + area.width.saturating_sub(w),
            y: area.y + area.height.saturating_sub(3),
            width: w.min(area.width),
            height: 2,
        };
        let lines: Vec<Line> = WATERMARK
            .iter()
            .map(|l| Line::from(Span::styled(*l, dim_style())))
            .collect();
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Right), mark);
    }

    if let Some(warning) = ctx.security.warning_line() {
        let text = truncate(&format!(" ! {warning} "), area.width as usize);
        let w = text.chars().count() as u16;
        f.render_widget(
            Paragraph::new(Span::styled(
                text,
                Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y: area.y,
                width: w,
                height: 1,
            },
        );
    }

    for (i, file) in ctx.desktop_files().iter().enumerate() {
        let Some(rect) = desktop_icon_rect(area, i) else {
            break;
        };
        let icon = if file.is_folder() {
            " [DIR] "
        } else if file.mime_starts_with("image/") {
            " [IMG] "
        } else {
            " [TXT] "
        };
        let label_style = if state.icon_selected == Some(i) {
            sel_style()
        } else {
            normal_style()
        };
        let lines = vec![
            Line::from(Span::styled(icon, title_style())),
            Line::from(Span::styled(truncate(&file.name, rect.width as usize), label_style)),
        ];
        f.render_widget(Paragraph::new(lines), rect);
    }
}

fn desktop_icon_rect(desk: Rect, idx: usize) -> Option<Rect> {
    let per_col = (desk.height.saturating_sub(1) / ICON_H).max(1) as usize;
    let col = (idx / per_col) as u16;
    let row = (idx % per_col) as u16;
    let x = desk.x + 2 + col * (ICON_W + 1);
    if x + ICON_W > desk.x + desk.width {
        return None;
    }
    Some(Rect {
        x,
        y: desk.y + 1 + row * ICON_H,
        width: ICON_W,
        height: 2,
    })
}

fn draw_taskbar<S: Store>(f: &mut Frame, ctx: &DesktopContext<S>, state: &DesktopState, area: Rect) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let mut row = vec![' '; width];
    write_text_in_area(&mut row, area, area.x, TASK_START_BUTTON);
    write_text_in_area(
        &mut row,
        area,
        area.x.saturating_add(start_button_rect(area).width),
        TASK_START_SEPARATOR,
    );

    let layout = taskbar_layout(ctx, state, area);
    for (app, rect) in &layout.pinned {
        let open = ctx.windows.windows().iter().any(|w| w.app == *app);
        let label = if open {
            format!("*{}", app.taskbar_label())
        } else {
            format!(" {}", app.taskbar_label())
        };
        write_text_in_area(&mut row, area, rect.x, &label);
    }
    if let Some(prev) = layout.prev_rect {
        let text = if layout.can_scroll_left { TASK_PAGER_PREV } else { "   " };
        write_text_in_area(&mut row, area, prev.x, text);
    }
    if let Some(next) = layout.next_rect {
        let text = if layout.can_scroll_right { TASK_PAGER_NEXT } else { "   " };
        write_text_in_area(&mut row, area, next.x, text);
    }
    for btn in &layout.buttons {
        if let Some(win) = ctx.windows.get(btn.window_id) {
            write_text_in_area(&mut row, area, btn.rect.x, &task_button_text(win));
        }
    }

    let line: String = row.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(line, sel_style()))),
        area,
    );
}

fn draw_start_menu(f: &mut Frame, state: &DesktopState, task: Rect) {
    let area = start_menu_rect(task);
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default().borders(Borders::ALL).title(" Start ").style(title_style()),
        area,
    );
    let inner = inner_area(area);
    let lines: Vec<Line> = START_ITEMS
        .iter()
        .enumerate()
        .map(|(i, (label, _))| {
            let style = if i == state.start_selected { sel_style() } else { normal_style() };
            Line::from(Span::styled(
                format!(" {:<width$}", label, width = inner.width.saturating_sub(1) as usize),
                style,
            ))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_window<S: Store>(f: &mut Frame, ctx: &DesktopContext<S>, win: &WindowRecord, desk: Rect, focused: bool) {
    if win.minimized {
        return;
    }
    let area = window_area(win, desk);
    if area.width < 8 || area.height < 4 {
        return;
    }

    f.render_widget(Clear, area);
    let border_style = if focused { title_style() } else { dim_style() };
    f.render_widget(Block::default().borders(Borders::ALL).style(border_style), area);

    let title_color = if focused { sel_style() } else { dim_style() };
    let mut chars: Vec<char> = vec![' '; area.width.saturating_sub(2) as usize];
    write_text(&mut chars, 0, &format!(" {} ", win.title));
    let max_button = if win.maximized { TITLE_RESTORE_BUTTON } else { TITLE_MAX_BUTTON };
    let buttons = format!("{}{}{}", TITLE_MIN_BUTTON, max_button, TITLE_CLOSE_BUTTON);
    if chars.len() >= buttons.len() {
        let button_x = chars.len() - buttons.len();
        write_text(&mut chars, button_x, &buttons);
    }
    let title_line: String = chars.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(title_line, title_color))),
        Rect {
            x: area.x + 1,
            y: area.y,
            width: area.width - 2,
            height: 1,
        },
    );

    let inner = inner_area(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }
    match ctx.app(win.id) {
        Some(AppState::Explorer(ex)) => draw_explorer(f, inner, ex, focused),
        Some(AppState::Notepad(pad)) => draw_notepad(f, inner, pad, focused),
        Some(AppState::Paint(paint)) => draw_paint(f, inner, paint),
        Some(AppState::Calculator(calc)) => draw_calculator(f, inner, calc),
        Some(AppState::Terminal(shell)) => draw_terminal(f, inner, shell, focused),
        Some(AppState::Security(view)) => draw_security(f, inner, ctx, view, focused),
        None => {}
    }
}

fn draw_explorer(f: &mut Frame, inner: Rect, ex: &Explorer, focused: bool) {
    let width = inner.width as usize;
    let mut lines = Vec::new();

    let toolbar: Vec<&str> = EXPLORER_TOOLBAR.iter().map(|(l, _)| *l).collect();
    let crumbs: Vec<String> = ex.breadcrumbs().into_iter().map(|(name, _)| name).collect();
    let head = format!("{} | {}", toolbar.join(" "), crumbs.join(" > "));
    lines.push(Line::from(Span::styled(truncate(&head, width), title_style())));

    let size_w = 10usize;
    let name_w = width.saturating_sub(size_w + 5);
    lines.push(Line::from(Span::styled(
        truncate(&format!("    {:<name_w$} {:>size_w$}", "Name", "Size"), width),
        dim_style(),
    )));

    let visible_rows = inner.height.saturating_sub(3) as usize;
    let entries = ex.entries();
    if entries.is_empty() {
        lines.push(Line::from(Span::styled("    This folder is empty.", dim_style())));
    }
    let start = ex.scroll.min(entries.len());
    let end = (start + visible_rows).min(entries.len());
    for (idx, entry) in entries[start..end].iter().enumerate() {
        let icon = if entry.is_folder() { "[D]" } else { "[F]" };
        let name = truncate(&entry.name, name_w);
        let line = format!(
            "{icon} {name:<name_w$} {:>size_w$}",
            explorer::size_label(entry)
        );
        let style = if start + idx == ex.selected && focused {
            sel_style()
        } else {
            normal_style()
        };
        lines.push(Line::from(Span::styled(truncate(&line, width), style)));
    }
    f.render_widget(Paragraph::new(lines), inner);

    let hint = match ex.clipboard() {
        Some(p) => format!("Clipboard: {}  v paste", path::file_name(p)),
        None => "Enter open  Del delete  F2 rename  n new  x cut  Bksp up".to_string(),
    };
    f.render_widget(
        Paragraph::new(Span::styled(truncate(&hint, width), dim_style())),
        Rect {
            y: inner.y + inner.height - 1,
            height: 1,
            ..inner
        },
    );
}

const NOTEPAD_SAVE: &str = "[Save]";

fn draw_notepad(f: &mut Frame, inner: Rect, pad: &crate::core::notepad::Notepad, focused: bool) {
    let width = inner.width as usize;
    let path = pad
        .file_path
        .as_deref()
        .map(path::display)
        .unwrap_or_else(|| "Untitled".to_string());
    let dirty = if pad.is_dirty() { " *" } else { "" };
    let mut lines = vec![Line::from(vec![
        Span::styled(NOTEPAD_SAVE, title_style()),
        Span::styled(truncate(&format!(" {path}{dirty}"), width.saturating_sub(6)), dim_style()),
    ])];

    let visible = inner.height.saturating_sub(1) as usize;
    let (row, col) = pad.cursor();
    let top = row.saturating_sub(visible.saturating_sub(1));
    for (i, text) in pad.lines().iter().enumerate().skip(top).take(visible) {
        if i == row && focused {
            let chars: Vec<char> = text.chars().collect();
            let before: String = chars[..col.min(chars.len())].iter().collect();
            let at: String = chars.get(col).map(|c| c.to_string()).unwrap_or_else(|| " ".into());
            let after: String = chars.iter().skip(col + 1).collect();
            lines.push(Line::from(vec![
                Span::styled(before, normal_style()),
                Span::styled(at, sel_style()),
                Span::styled(after, normal_style()),
            ]));
        } else {
            lines.push(Line::from(Span::styled(truncate(text, width), normal_style())));
        }
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_paint(f: &mut Frame, inner: Rect, paint: &Paint) {
    let mut spans = Vec::new();
    for (label, button) in paint_toolbar() {
        let style = match button {
            PaintButton::Tool(t) if t == paint.tool => sel_style(),
            _ => normal_style(),
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    let mut lines = vec![Line::from(spans)];

    let mut swatches = Vec::new();
    for (i, (_, [r, g, b])) in PALETTE.iter().enumerate() {
        let mark = if i == paint.color { "<>" } else { "  " };
        swatches.push(Span::styled(
            mark,
            Style::default().bg(Color::Rgb(*r, *g, *b)).fg(Color::Black),
        ));
        swatches.push(Span::raw(" "));
    }
    swatches.push(Span::styled(
        format!("Width: [-] {:>2}/{MAX_LINE_WIDTH} [+]", paint.line_width),
        normal_style(),
    ));
    lines.push(Line::from(swatches));

    let rows = inner.height.saturating_sub(2).min(CANVAS_H as u16) as u32;
    let cols = inner.width.min(CANVAS_W as u16) as u32;
    for y in 0..rows {
        let row: Vec<Span> = (0..cols)
            .map(|x| {
                let [r, g, b] = paint.pixel(x, y);
                Span::styled(" ", Style::default().bg(Color::Rgb(r, g, b)))
            })
            .collect();
        lines.push(Line::from(row));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_calculator(f: &mut Frame, inner: Rect, calc: &crate::core::calculator::Calculator) {
    let width = inner.width as usize;
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{:>width$}", calc.pending().unwrap_or_default()),
            dim_style(),
        )),
        Line::from(Span::styled(
            format!("{:>width$}", truncate(calc.display(), width)),
            title_style(),
        )),
        Line::from(""),
    ];
    let bw = (inner.width / 4).max(1) as usize;
    for row in KEYPAD {
        let mut spans = Vec::new();
        for key in row {
            let label = format!("[{:^w$}]", key.label(), w = bw.saturating_sub(2));
            let style = match key {
                Key::Equals => sel_style(),
                Key::Op(_) | Key::Clear | Key::ClearEntry | Key::Backspace => title_style(),
                _ => normal_style(),
            };
            spans.push(Span::styled(label, style));
        }
        lines.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_terminal(f: &mut Frame, inner: Rect, shell: &crate::core::shell::Shell, focused: bool) {
    let width = inner.width as usize;
    let visible = inner.height as usize;
    let history = shell.lines();
    let keep = visible.saturating_sub(1);
    let skip = history.len().saturating_sub(keep);
    let mut lines: Vec<Line> = history[skip..]
        .iter()
        .map(|l| {
            let style = match l.kind {
                LineKind::Input => title_style(),
                LineKind::Output => normal_style(),
                LineKind::Error => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(truncate(&l.text, width), style))
        })
        .collect();
    let cursor = if focused { "█" } else { "" };
    lines.push(Line::from(Span::styled(
        truncate(&format!("{}{}{}", shell.prompt(), shell.input, cursor), width),
        normal_style(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_security<S: Store>(f: &mut Frame, inner: Rect, ctx: &DesktopContext<S>, view: &SecurityView, focused: bool) {
    let width = inner.width as usize;
    let tab_style = |t: SecurityTab| if view.tab == t { sel_style() } else { normal_style() };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("[Protection]", tab_style(SecurityTab::Protection)),
            Span::raw(" "),
            Span::styled("[Quarantine]", tab_style(SecurityTab::Quarantine)),
        ]),
        Line::from(Span::styled("-".repeat(width), dim_style())),
    ];

    match view.tab {
        SecurityTab::Protection => {
            for (i, p) in Protection::ALL.iter().enumerate() {
                let on = ctx.security.settings.is_enabled(*p);
                let badge = if on { "[ON ]" } else { "[OFF]" };
                let style = if focused && i == view.selected { sel_style() } else { normal_style() };
                lines.push(Line::from(Span::styled(
                    truncate(&format!("{badge} {}", p.label()), width),
                    style,
                )));
                lines.push(Line::from(Span::styled(
                    truncate(&format!("      {}", p.description()), width),
                    dim_style(),
                )));
            }
        }
        SecurityTab::Quarantine => {
            if ctx.security.quarantine.is_empty() {
                lines.push(Line::from(Span::styled("No threats found", dim_style())));
            }
            for (i, item) in ctx.security.quarantine.iter().enumerate() {
                let style = if focused && i == view.selected { sel_style() } else { normal_style() };
                lines.push(Line::from(Span::styled(
                    truncate(
                        &format!("{}  Threat level: {}", item.file_name, item.threat_level),
                        width,
                    ),
                    style,
                )));
                lines.push(Line::from(Span::styled(
                    truncate(
                        &format!(
                            "  {}  {}  {}",
                            path::display(&item.original_path),
                            item.detection_reason,
                            item.quarantined_at_display()
                        ),
                        width,
                    ),
                    dim_style(),
                )));
            }
        }
    }
    f.render_widget(Paragraph::new(lines), inner);

    let hint = match view.tab {
        SecurityTab::Protection => "Enter toggle  Tab switch tab",
        SecurityTab::Quarantine => "r restore  d delete  Tab switch tab",
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, dim_style())),
        Rect {
            y: inner.y + inner.height - 1,
            height: 1,
            ..inner
        },
    );
}

fn centered_box(size: Rect, w: u16, h: u16) -> Rect {
    let w = w.min(size.width);
    let h = h.min(size.height);
    Rect {
        x: size.x + size.width.saturating_sub(w) / 2,
        y: size.y + size.height.saturating_sub(h) / 2,
        width: w,
        height: h,
    }
}

fn draw_modal(f: &mut Frame, modal: &Modal, size: Rect) {
    let (title, body): (&str, Vec<String>) = match modal {
        Modal::Confirm { prompt, .. } => ("Confirm", vec![prompt.clone(), String::new(), "[y] Yes    [n] No".into()]),
        Modal::Input { prompt, buf, .. } => ("Input", vec![prompt.clone(), String::new(), format!("> {buf}█")]),
        Modal::Message { title, text } => {
            let mut body: Vec<String> = text.lines().map(str::to_string).collect();
            body.push(String::new());
            body.push("[Enter] OK".into());
            (title.as_str(), body)
        }
    };
    let w = body.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 6;
    let area = centered_box(size, w.max(30), body.len() as u16 + 2);
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {title} "))
            .border_style(sel_style())
            .style(normal_style()),
        area,
    );
    let lines: Vec<Line> = body.into_iter().map(|l| Line::from(Span::styled(l, normal_style()))).collect();
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner_area(area));
}

fn flag_modal_lines() -> Vec<String> {
    let mut lines: Vec<String> = ctf::FLAG_MODAL.iter().map(|l| l.to_string()).collect();
    lines.insert(4, ctf::DESKTOP_FLAG.to_string());
    lines.push(String::new());
    lines.push("[Enter] Close".into());
    lines
}

fn draw_flag_modal(f: &mut Frame, size: Rect) {
    let body = flag_modal_lines();
    let w = body.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 6;
    let area = centered_box(size, w, body.len() as u16 + 2);
    f.render_widget(Clear, area);
    f.render_widget(
        Block::default().borders(Borders::ALL).border_style(sel_style()).style(title_style()),
        area,
    );
    let lines: Vec<Line> = body
        .into_iter()
        .map(|l| {
            let style = if l == ctf::DESKTOP_FLAG { sel_style() } else { title_style() };
            Line::from(Span::styled(l, style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner_area(area));
}

fn draw_crash_screen(f: &mut Frame, size: Rect) {
    let style = Style::default().fg(Color::White).bg(Color::Red);
    let mut lines: Vec<Line> = Vec::new();
    let top = size.height.saturating_sub(ctf::CRASH_SCREEN.len() as u16 + 2) / 2;
    for _ in 0..top {
        lines.push(Line::from(Span::styled("", style)));
    }
    for (i, text) in ctf::CRASH_SCREEN.iter().enumerate() {
        let s = if i == 0 { style.add_modifier(Modifier::BOLD) } else { style };
        lines.push(Line::from(Span::styled(*text, s)));
    }
    lines.push(Line::from(Span::styled("", style)));
    lines.push(Line::from(Span::styled("Press R to reload the system", style.add_modifier(Modifier::BOLD))));
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).style(style), size);
}

fn draw_cursor(f: &mut Frame, x: u16, y: u16, size: Rect) {
    if x >= size.width || y >= size.height {
        return;
    }
    f.render_widget(
        Paragraph::new(Line::from(Span::styled("+", sel_style()))),
        Rect {
            x,
            y,
            width: 1,
            height: 1,
        },
    );
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Screen rectangle of a window; window geometry is relative to the desktop area.
fn window_area(win: &WindowRecord, desk: Rect) -> Rect {
    if win.maximized {
        return desk;
    }
    Rect {
        x: desk.x.saturating_add(win.rect.x.max(0) as u16),
        y: desk.y.saturating_add(win.rect.y.max(0) as u16),
        width: win.rect.w,
        height: win.rect.h,
    }
    .intersection(desk)
}

fn inner_area(area: Rect) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

fn clamp_all_windows<S: Store>(ctx: &mut DesktopContext<S>, desk: Rect) {
    let local = full_rect(desk.width, desk.height);
    for win in ctx.windows.windows_mut() {
        if !win.maximized {
            clamp_window_with_min(&mut win.rect, local, MIN_WINDOW_W, MIN_WINDOW_H);
        }
    }
}

/// Keep the explorer selection inside the visible rows.
fn sync_explorer_scroll<S: Store>(ctx: &mut DesktopContext<S>, desk: Rect) {
    let views: Vec<(u64, usize)> = ctx
        .windows
        .windows()
        .iter()
        .filter(|w| w.app == AppKind::Explorer)
        .map(|w| (w.id, inner_area(window_area(w, desk)).height.saturating_sub(3).max(1) as usize))
        .collect();
    for (id, visible) in views {
        if let Some(AppState::Explorer(ex)) = ctx.app_mut(id) {
            if ex.selected < ex.scroll {
                ex.scroll = ex.selected;
            } else if ex.selected >= ex.scroll + visible {
                ex.scroll = ex.selected + 1 - visible;
            }
        }
    }
}

fn clamp_window_with_min(rect: &mut WinRect, desk: Rect, min_w: u16, min_h: u16) {
    if desk.width < 8 || desk.height < 4 {
        return;
    }
    let max_w = desk.width.max(1);
    let max_h = desk.height.max(1);
    let min_w_eff = min_w.min(max_w).max(1);
    let min_h_eff = min_h.min(max_h).max(1);

    rect.w = rect.w.min(max_w).max(min_w_eff);
    rect.h = rect.h.min(max_h).max(min_h_eff);

    let min_x = desk.x as i32;
    let min_y = desk.y as i32;
    let max_x = desk.x.saturating_add(desk.width).saturating_sub(rect.w) as i32;
    let max_y = desk.y.saturating_add(desk.height).saturating_sub(rect.h) as i32;

    rect.x = rect.x.clamp(min_x, max_x.max(min_x));
    rect.y = rect.y.clamp(min_y, max_y.max(min_y));
}

fn task_button_text(win: &WindowRecord) -> String {
    let label = truncate(&win.title, 16);
    if win.minimized {
        format!("({label})")
    } else {
        format!("[{label}]")
    }
}

fn taskbar_layout<S: Store>(ctx: &DesktopContext<S>, state: &DesktopState, task: Rect) -> TaskbarLayout {
    if task.height == 0 || task.width == 0 {
        return TaskbarLayout::empty();
    }

    let mut layout = TaskbarLayout::empty();
    let start_w = start_button_rect(task).width;
    let sep_w = TASK_START_SEPARATOR.len() as u16;
    let task_x_end = task.x.saturating_add(task.width);

    let mut x = task.x.saturating_add(start_w).saturating_add(sep_w);
    for app in PINNED_APPS {
        let w = app.taskbar_label().len() as u16 + 1;
        if x + w >= task_x_end {
            return layout;
        }
        layout.pinned.push((app, Rect { x, y: task.y, width: w, height: 1 }));
        x += w + 1;
    }
    let base_x = x.saturating_add(sep_w);
    if base_x >= task_x_end {
        return layout;
    }

    let labels: Vec<(u64, String)> = ctx
        .windows
        .windows()
        .iter()
        .map(|w| (w.id, task_button_text(w)))
        .collect();
    if labels.is_empty() {
        return layout;
    }

    let content_width = task_x_end.saturating_sub(base_x) as usize;
    let total_needed: usize = labels.iter().map(|(_, t)| t.chars().count() + 1).sum();
    let scroll = state.task_scroll.min(labels.len().saturating_sub(1));
    let paging = total_needed > content_width || scroll > 0;

    if !paging {
        let mut x = base_x;
        for (window_id, text) in labels {
            let width = text.chars().count() as u16;
            if x + width >= task_x_end {
                break;
            }
            layout.buttons.push(TaskButton {
                window_id,
                rect: Rect { x, y: task.y, width, height: 1 },
            });
            x = x.saturating_add(width).saturating_add(1);
        }
        return layout;
    }

    let pager_w = TASK_PAGER_PREV.len() as u16;
    let prev_rect = Rect { x: base_x, y: task.y, width: pager_w, height: 1 };
    let next_rect = Rect {
        x: task_x_end.saturating_sub(pager_w),
        y: task.y,
        width: pager_w,
        height: 1,
    };
    if prev_rect.x.saturating_add(prev_rect.width) >= next_rect.x {
        return layout;
    }
    layout.prev_rect = Some(prev_rect);
    layout.next_rect = Some(next_rect);

    let mut x = prev_rect.x.saturating_add(prev_rect.width).saturating_add(1);
    let max_x = next_rect.x.saturating_sub(1);
    let mut idx = scroll;
    while idx < labels.len() {
        let (window_id, text) = &labels[idx];
        let width = text.chars().count() as u16;
        if width == 0 || x + width > max_x {
            break;
        }
        layout.buttons.push(TaskButton {
            window_id: *window_id,
            rect: Rect { x, y: task.y, width, height: 1 },
        });
        x = x.saturating_add(width).saturating_add(1);
        idx += 1;
    }

    layout.can_scroll_left = scroll > 0;
    layout.can_scroll_right = idx < labels.len();
    layout
}

fn top_status_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y,
        width: size.width,
        height: if size.height > 0 { 1 } else { 0 },
    }
}

fn full_rect(width: u16, height: u16) -> Rect {
    Rect { x: 0, y: 0, width, height }
}

fn taskbar_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y + size.height.saturating_sub(1),
        width: size.width,
        height: if size.height > 1 { 1 } else { 0 },
    }
}

fn desktop_area(size: Rect) -> Rect {
    let top = if size.height > 0 { 1 } else { 0 };
    let bottom = if size.height > 1 { 1 } else { 0 };
    Rect {
        x: size.x,
        y: size.y + top,
        width: size.width,
        height: size.height.saturating_sub(top + bottom),
    }
}

fn start_button_rect(task: Rect) -> Rect {
    Rect {
        x: task.x,
        y: task.y,
        width: (TASK_START_BUTTON.len() as u16).min(task.width),
        height: task.height,
    }
}

fn start_menu_rect(task: Rect) -> Rect {
    let h = START_ITEMS.len() as u16 + 2;
    Rect {
        x: task.x,
        y: task.y.saturating_sub(h),
        width: 26.min(task.width),
        height: h,
    }
}

fn title_close_button_rect(area: Rect) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(TITLE_CLOSE_BUTTON.len() as u16 + 1),
        y: area.y,
        width: TITLE_CLOSE_BUTTON.len() as u16,
        height: 1,
    }
}

fn title_max_button_rect(area: Rect) -> Rect {
    let close = title_close_button_rect(area);
    Rect {
        x: close.x.saturating_sub(TITLE_MAX_BUTTON.len() as u16),
        y: area.y,
        width: TITLE_MAX_BUTTON.len() as u16,
        height: 1,
    }
}

fn title_min_button_rect(area: Rect) -> Rect {
    let max = title_max_button_rect(area);
    Rect {
        x: max.x.saturating_sub(TITLE_MIN_BUTTON.len() as u16),
        y: area.y,
        width: TITLE_MIN_BUTTON.len() as u16,
        height: 1,
    }
}

fn hit_resize_corner(area: Rect, x: u16, y: u16) -> Option<ResizeCorner> {
    if area.width < 4 || area.height < 4 {
        return None;
    }
    let left = area.x;
    let right = area.x.saturating_add(area.width).saturating_sub(1);
    let top = area.y;
    let bottom = area.y.saturating_add(area.height).saturating_sub(1);

    if x == left && y == top {
        Some(ResizeCorner::TopLeft)
    } else if x == right && y == top {
        Some(ResizeCorner::TopRight)
    } else if x == left && y == bottom {
        Some(ResizeCorner::BottomLeft)
    } else if x == right && y == bottom {
        Some(ResizeCorner::BottomRight)
    } else {
        None
    }
}

fn point_in_rect(x: u16, y: u16, r: Rect) -> bool {
    x >= r.x && x < r.x.saturating_add(r.width) && y >= r.y && y < r.y.saturating_add(r.height)
}

fn write_text(buf: &mut [char], start: usize, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        let idx = start + i;
        if idx >= buf.len() {
            break;
        }
        buf[idx] = ch;
    }
}

fn write_text_in_area(buf: &mut [char], area: Rect, x: u16, text: &str) {
    if x < area.x {
        return;
    }
    let start = (x - area.x) as usize;
    write_text(buf, start, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::vfs::VirtualFs;

    fn ctx() -> DesktopContext<MemoryStore> {
        DesktopContext::new(VirtualFs::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn title_buttons_sit_right_to_left() {
        let area = Rect::new(10, 5, 40, 10);
        let close = title_close_button_rect(area);
        let max = title_max_button_rect(area);
        let min = title_min_button_rect(area);
        assert_eq!(close.x, 10 + 40 - 4);
        assert_eq!(max.x + 3, close.x);
        assert_eq!(min.x + 3, max.x);
    }

    #[test]
    fn resize_corners_only_on_corners() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(hit_resize_corner(area, 0, 0), Some(ResizeCorner::TopLeft));
        assert_eq!(hit_resize_corner(area, 19, 9), Some(ResizeCorner::BottomRight));
        assert_eq!(hit_resize_corner(area, 5, 0), None);
    }

    #[test]
    fn clamp_keeps_window_on_desktop() {
        let desk = full_rect(80, 20);
        let mut rect = WinRect { x: 200, y: -5, w: 120, h: 4 };
        clamp_window_with_min(&mut rect, desk, MIN_WINDOW_W, MIN_WINDOW_H);
        assert_eq!(rect.w, 80);
        assert_eq!(rect.h, MIN_WINDOW_H);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn window_area_is_offset_by_desktop() {
        let mut ctx = ctx();
        let id = ctx.open_app(AppKind::Calculator, WindowData::default()).unwrap();
        let desk = Rect::new(0, 1, 120, 40);
        let win = ctx.windows.get(id).unwrap().clone();
        let area = window_area(&win, desk);
        assert_eq!(area.y, 1 + win.rect.y as u16);
        ctx.windows.maximize(id);
        let win = ctx.windows.get(id).unwrap();
        assert_eq!(window_area(win, desk), desk);
    }

    #[test]
    fn topmost_window_wins_hit_test() {
        let mut ctx = ctx();
        let desk = Rect::new(0, 1, 160, 50);
        let a = ctx.open_app(AppKind::Explorer, WindowData::default()).unwrap();
        let b = ctx.open_app(AppKind::Terminal, WindowData::default()).unwrap();
        let area_b = window_area(ctx.windows.get(b).unwrap(), desk);
        let (hit, kind) = hit_window(&ctx, desk, area_b.x + 5, area_b.y + 3).unwrap();
        assert_eq!((hit, kind), (b, WindowHit::Content));
        ctx.windows.focus(a);
        let area_a = window_area(ctx.windows.get(a).unwrap(), desk);
        let (hit, kind) = hit_window(&ctx, desk, area_a.x + 2, area_a.y).unwrap();
        assert_eq!((hit, kind), (a, WindowHit::Title));
    }

    #[test]
    fn taskbar_lists_pins_then_windows() {
        let mut ctx = ctx();
        let state = DesktopState::default();
        let task = Rect::new(0, 39, 160, 1);
        let empty = taskbar_layout(&ctx, &state, task);
        assert_eq!(empty.pinned.len(), PINNED_APPS.len());
        assert!(empty.buttons.is_empty());
        let id = ctx.open_app(AppKind::Notepad, WindowData::default()).unwrap();
        let layout = taskbar_layout(&ctx, &state, task);
        assert_eq!(layout.buttons[0].window_id, id);
        let last_pin = layout.pinned.last().unwrap().1;
        assert!(layout.buttons[0].rect.x > last_pin.x + last_pin.width);
    }

    #[test]
    fn explorer_toolbar_hits() {
        assert_eq!(explorer_button_at(1), Some(ExplorerButton::Up));
        assert_eq!(explorer_button_at(5), Some(ExplorerButton::Desktop));
        assert_eq!(explorer_button_at(14), Some(ExplorerButton::ThisPc));
        assert_eq!(explorer_button_at(3), None);
    }

    #[test]
    fn calculator_keypad_hits() {
        let inner = Rect::new(0, 0, 28, 16);
        assert_eq!(calculator_key_at(inner, 0, 3), Some(Key::Clear));
        assert_eq!(calculator_key_at(inner, 27, 7), Some(Key::Equals));
        assert_eq!(calculator_key_at(inner, 0, 1), None);
    }

    #[test]
    fn flag_modal_shows_flag_after_intro() {
        let lines = flag_modal_lines();
        assert_eq!(lines[4], ctf::DESKTOP_FLAG);
        assert!(lines[3].contains("Here's your flag"));
    }

    #[test]
    fn double_click_needs_same_target() {
        let mut state = DesktopState::default();
        assert!(!is_double_click(&mut state, ClickTarget::DesktopIcon(0)));
        assert!(!is_double_click(&mut state, ClickTarget::DesktopIcon(1)));
        assert!(is_double_click(&mut state, ClickTarget::DesktopIcon(1)));
        assert!(!is_double_click(&mut state, ClickTarget::DesktopIcon(1)));
    }

    #[test]
    fn confirmed_desktop_delete_runs_flag_check() {
        let mut ctx = ctx();
        let mut state = DesktopState::default();
        let on_desktop = "C:/Users/Default/Desktop/system_helper.dll";
        ctx.fs.move_path(ctf::FLAGGED_PATH, on_desktop).unwrap();
        state.modal = Some(Modal::Confirm {
            prompt: "delete?".into(),
            action: PendingAction::DesktopDelete(on_desktop.into()),
        });
        handle_modal_key(&mut ctx, &mut state, KeyCode::Char('y'));
        assert!(state.modal.is_none());
        assert!(ctx.flag_revealed());
    }

    #[test]
    fn declined_delete_keeps_file() {
        let mut ctx = ctx();
        let mut state = DesktopState::default();
        state.modal = Some(Modal::Confirm {
            prompt: "delete?".into(),
            action: PendingAction::DesktopDelete(crate::core::vfs::WELCOME_PATH.into()),
        });
        handle_modal_key(&mut ctx, &mut state, KeyCode::Esc);
        assert!(ctx.fs.exists(crate::core::vfs::WELCOME_PATH).unwrap());
    }

    #[test]
    fn system32_delete_shows_access_denied() {
        let mut ctx = ctx();
        let mut state = DesktopState::default();
        let id = ctx
            .open_app(AppKind::Explorer, WindowData::folder("C:/Windows/System32"))
            .unwrap();
        explorer_key(&mut ctx, &mut state, id, KeyCode::Delete);
        assert!(matches!(state.modal, Some(Modal::Message { ref title, .. }) if title == "Access Denied"));
    }

    #[test]
    fn rename_through_input_modal() {
        let mut ctx = ctx();
        let mut state = DesktopState::default();
        let id = ctx.open_app(AppKind::Explorer, WindowData::folder("C:/Temp")).unwrap();
        ctx.fs.write("C:/Temp/a.txt", "a", "text/plain").unwrap();
        explorer_key(&mut ctx, &mut state, id, KeyCode::F(5));
        explorer_key(&mut ctx, &mut state, id, KeyCode::F(2));
        for _ in 0.."a.txt".len() {
            handle_modal_key(&mut ctx, &mut state, KeyCode::Backspace);
        }
        for c in "b.txt".chars() {
            handle_modal_key(&mut ctx, &mut state, KeyCode::Char(c));
        }
        handle_modal_key(&mut ctx, &mut state, KeyCode::Enter);
        assert!(ctx.fs.exists("C:/Temp/b.txt").unwrap());
        assert!(!ctx.fs.exists("C:/Temp/a.txt").unwrap());
    }

    #[test]
    fn terminal_keys_feed_the_shell() {
        let mut ctx = ctx();
        let id = ctx.open_app(AppKind::Terminal, WindowData::default()).unwrap();
        for c in "pwd".chars() {
            terminal_key(&mut ctx, id, KeyCode::Char(c));
        }
        terminal_key(&mut ctx, id, KeyCode::Enter);
        let Some(AppState::Terminal(shell)) = ctx.app(id) else { panic!() };
        assert_eq!(shell.lines().last().unwrap().text, "C:/Users/Default");
    }

    #[test]
    fn security_toggle_from_keyboard() {
        let mut ctx = ctx();
        let id = ctx.open_app(AppKind::Security, WindowData::default()).unwrap();
        security_key(&mut ctx, id, KeyCode::Enter);
        assert!(ctx.security.settings.is_enabled(Protection::Realtime));
        security_key(&mut ctx, id, KeyCode::Tab);
        security_key(&mut ctx, id, KeyCode::Char('d'));
        assert!(ctx.security.quarantine.is_empty());
    }
}
