use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use std::time::Duration;

use crate::config::current_theme_color;
use crate::status::render_status_bar;

pub type Term = Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

/// Menu row drawn as a blank gap; never selectable.
pub const SEPARATOR: &str = "---";
/// Suffix marking a greyed launcher entry.
pub const DISABLED_SUFFIX: &str = " (disabled)";

const SIDE_MARGIN: u16 = 2;
const NAV_BAR: &str = "Esc back   Enter open   \u{2191}\u{2193} move";

/// Shrink a rect by the side margin.
pub fn inset(area: Rect) -> Rect {
    let pad = SIDE_MARGIN.min(area.width / 2);
    Rect {
        x: area.x + pad,
        width: area.width.saturating_sub(pad * 2),
        ..area
    }
}

/// Cut `text` to at most `width` characters, marking the cut with `~`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('~');
    out
}

// ── Styles ────────────────────────────────────────────────────────────────────

pub fn normal_style() -> Style {
    Style::default().fg(current_theme_color())
}

pub fn sel_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(current_theme_color())
        .add_modifier(Modifier::BOLD)
}

pub fn title_style() -> Style {
    normal_style().add_modifier(Modifier::BOLD)
}

pub fn dim_style() -> Style {
    normal_style().add_modifier(Modifier::DIM)
}

// ── Screen frame ──────────────────────────────────────────────────────────────

/// Draw the phone chrome (status row, app bar, optional subtitle, nav hint)
/// and return the body area.
fn screen(f: &mut Frame, title: &str, subtitle: Option<&str>, hint: &str) -> Rect {
    let [status, app_bar, sub, body, nav] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Length(if subtitle.is_some() { 2 } else { 0 }),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_status_bar(f, status);
    let bar = Block::default().borders(Borders::BOTTOM).border_style(dim_style());
    f.render_widget(
        Paragraph::new(Span::styled(title, title_style())).block(bar),
        inset(app_bar),
    );
    if let Some(text) = subtitle {
        f.render_widget(Paragraph::new(Span::styled(text, dim_style())), inset(sub));
    }
    f.render_widget(
        Paragraph::new(hint).alignment(Alignment::Center).style(dim_style()),
        nav,
    );
    inset(body)
}

/// Block until a key press arrives or `timeout` passes.
fn next_key(timeout: Duration) -> Result<Option<KeyCode>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key.code)),
        _ => Ok(None),
    }
}

// ── Menu ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuResult {
    Selected(String),
    Back,
}

/// Cursor over menu rows that skips separators and disabled entries.
#[derive(Debug)]
struct MenuState<'a> {
    rows: &'a [&'a str],
    cursor: Option<usize>,
}

fn is_selectable(row: &str) -> bool {
    row != SEPARATOR && !row.ends_with(DISABLED_SUFFIX)
}

impl<'a> MenuState<'a> {
    fn new(rows: &'a [&'a str]) -> Self {
        let cursor = rows.iter().position(|r| is_selectable(r));
        Self { rows, cursor }
    }

    fn step(&mut self, forward: bool) {
        let Some(cur) = self.cursor else { return };
        let next = if forward {
            (cur + 1..self.rows.len()).find(|&i| is_selectable(self.rows[i]))
        } else {
            (0..cur).rev().find(|&i| is_selectable(self.rows[i]))
        };
        if let Some(i) = next {
            self.cursor = Some(i);
        }
    }

    fn first(&mut self) {
        self.cursor = self.rows.iter().position(|r| is_selectable(r));
    }

    fn last(&mut self) {
        self.cursor = self.rows.iter().rposition(|r| is_selectable(r));
    }

    fn current(&self) -> Option<&'a str> {
        self.cursor.map(|i| self.rows[i])
    }

    /// Apply a key; `Some` ends the menu.
    fn key(&mut self, code: KeyCode) -> Option<MenuResult> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.step(false),
            KeyCode::Down | KeyCode::Char('j') => self.step(true),
            KeyCode::Home => self.first(),
            KeyCode::End => self.last(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                return self.current().map(|r| MenuResult::Selected(r.to_string()));
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => return Some(MenuResult::Back),
            _ => {}
        }
        None
    }

    fn lines(&self) -> Vec<Line<'a>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, &row)| {
                if row == SEPARATOR {
                    Line::default()
                } else if self.cursor == Some(i) {
                    Line::from(Span::styled(format!(" \u{25b8} {row}"), sel_style()))
                } else if is_selectable(row) {
                    Line::from(Span::styled(format!("   {row}"), normal_style()))
                } else {
                    Line::from(Span::styled(format!("   {row}"), dim_style()))
                }
            })
            .collect()
    }
}

pub fn run_menu(
    terminal: &mut Term,
    title: &str,
    choices: &[&str],
    subtitle: Option<&str>,
) -> Result<MenuResult> {
    let mut menu = MenuState::new(choices);
    loop {
        terminal.draw(|f| {
            let body = screen(f, title, subtitle, NAV_BAR);
            // Keep the cursor on screen for long lists.
            let skip = menu
                .cursor
                .map_or(0, |c| (c + 1).saturating_sub(body.height as usize));
            let lines: Vec<Line> = menu.lines().into_iter().skip(skip).collect();
            f.render_widget(Paragraph::new(lines), body);
        })?;
        if let Some(code) = next_key(Duration::from_millis(200))? {
            if let Some(result) = menu.key(code) {
                return Ok(result);
            }
        }
    }
}

// ── Text input ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Pending,
    Submit(String),
    Cancel,
}

/// Single-line editor; `masked` hides the typed characters.
#[derive(Debug, Default)]
struct LineEditor {
    buf: String,
    masked: bool,
}

impl LineEditor {
    fn key(&mut self, code: KeyCode) -> Edit {
        match code {
            KeyCode::Enter => return Edit::Submit(self.buf.trim().to_string()),
            KeyCode::Esc => return Edit::Cancel,
            KeyCode::Backspace => {
                self.buf.pop();
            }
            KeyCode::Char(c) if !c.is_control() => self.buf.push(c),
            _ => {}
        }
        Edit::Pending
    }

    fn shown(&self) -> String {
        if self.masked {
            "\u{2022}".repeat(self.buf.chars().count())
        } else {
            self.buf.clone()
        }
    }
}

fn edit(terminal: &mut Term, prompt: &str, masked: bool) -> Result<Option<String>> {
    let mut editor = LineEditor { masked, ..LineEditor::default() };
    loop {
        terminal.draw(|f| {
            let body = screen(f, prompt, None, "Enter submit   Esc cancel");
            let field = Line::from(vec![
                Span::styled(" > ", dim_style()),
                Span::styled(editor.shown(), normal_style()),
                Span::styled("_", title_style()),
            ]);
            f.render_widget(Paragraph::new(vec![Line::default(), field]), body);
        })?;
        if let Some(code) = next_key(Duration::from_millis(50))? {
            match editor.key(code) {
                Edit::Pending => {}
                Edit::Submit(text) => return Ok(Some(text)),
                Edit::Cancel => return Ok(None),
            }
        }
    }
}

/// Ask for a line of text; `None` when cancelled.
pub fn input_prompt(terminal: &mut Term, prompt: &str) -> Result<Option<String>> {
    edit(terminal, prompt, false)
}

/// Like `input_prompt` but echoes bullets.
pub fn password_prompt(terminal: &mut Term, prompt: &str) -> Result<Option<String>> {
    edit(terminal, prompt, true)
}

pub fn confirm(terminal: &mut Term, message: &str) -> Result<bool> {
    loop {
        terminal.draw(|f| {
            let body = screen(f, "Confirm", None, "y yes   n no");
            f.render_widget(
                Paragraph::new(format!("\n{message}")).style(normal_style()),
                body,
            );
        })?;
        match next_key(Duration::from_millis(50))? {
            Some(KeyCode::Char('y' | 'Y')) => return Ok(true),
            Some(KeyCode::Char('n' | 'N') | KeyCode::Esc) => return Ok(false),
            _ => {}
        }
    }
}

// ── Notices ───────────────────────────────────────────────────────────────────

/// Show a toast line for `ms` milliseconds.
pub fn flash_message(terminal: &mut Term, message: &str, ms: u64) -> Result<()> {
    terminal.draw(|f| {
        let body = screen(f, "", None, "");
        f.render_widget(Paragraph::new(format!("\n{message}")).style(normal_style()), body);
    })?;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(())
}

/// Centred box for `message`, clamped to `area`.
fn dialog_rect(area: Rect, message: &str) -> Rect {
    let w = (message.chars().count() as u16).saturating_add(6).min(area.width);
    let h = 5u16.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

/// Show `message` in a highlighted dialog over the current screen.
pub fn box_message(terminal: &mut Term, message: &str, ms: u64) -> Result<()> {
    terminal.draw(|f| {
        let area = dialog_rect(f.area(), message);
        let block = Block::default().borders(Borders::ALL).style(sel_style());
        let inner = block.inner(area);
        f.render_widget(Clear, area);
        f.render_widget(block, area);
        f.render_widget(
            Paragraph::new(message).alignment(Alignment::Center).style(sel_style()),
            inner,
        );
    })?;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(())
}

// ── Pager ─────────────────────────────────────────────────────────────────────

/// Scroll offset over `len` lines shown `page` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scroll {
    offset: usize,
    len: usize,
}

impl Scroll {
    fn max(&self, page: usize) -> usize {
        self.len.saturating_sub(page.max(1))
    }

    /// Returns false once the reader leaves.
    fn key(&mut self, code: KeyCode, page: usize) -> bool {
        let max = self.max(page);
        self.offset = match code {
            KeyCode::Up | KeyCode::Char('k') => self.offset.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.offset + 1,
            KeyCode::PageUp => self.offset.saturating_sub(page),
            KeyCode::PageDown | KeyCode::Char(' ') => self.offset + page,
            KeyCode::Home => 0,
            KeyCode::End => max,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Backspace => return false,
            _ => self.offset,
        }
        .min(max);
        true
    }
}

pub fn pager(terminal: &mut Term, text: &str, title: &str) -> Result<()> {
    let lines: Vec<&str> = text.lines().collect();
    let mut scroll = Scroll { offset: 0, len: lines.len() };
    let mut page = 1usize;
    loop {
        terminal.draw(|f| {
            let hint = format!(
                "{}/{}   PgUp PgDn   Esc back",
                (scroll.offset + 1).min(lines.len().max(1)),
                lines.len()
            );
            let body = screen(f, title, None, &hint);
            page = body.height as usize;
            let shown: Vec<Line> = lines
                .iter()
                .skip(scroll.offset)
                .take(page)
                .map(|l| Line::from(Span::styled(*l, normal_style())))
                .collect();
            f.render_widget(Paragraph::new(shown), body);
        })?;
        if let Some(code) = next_key(Duration::from_millis(100))? {
            if !scroll.key(code, page) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_never_exceeds_half_width() {
        let r = inset(Rect::new(0, 0, 3, 1));
        assert_eq!((r.x, r.width), (1, 1));
        let r = inset(Rect::new(5, 2, 40, 3));
        assert_eq!((r.x, r.width, r.height), (7, 36, 3));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("router_hints.txt", 8), "router_~");
        assert_eq!(truncate("short", 8), "short");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn menu_cursor_skips_separators_and_disabled_rows() {
        let rows = ["Phone (disabled)", "Settings", "---", "Camera (disabled)", "Chrome"];
        let mut menu = MenuState::new(&rows);
        assert_eq!(menu.current(), Some("Settings"));
        menu.key(KeyCode::Down);
        assert_eq!(menu.current(), Some("Chrome"));
        menu.key(KeyCode::Down);
        assert_eq!(menu.current(), Some("Chrome"));
        menu.key(KeyCode::Up);
        menu.key(KeyCode::Up);
        assert_eq!(menu.current(), Some("Settings"));
        menu.key(KeyCode::End);
        assert_eq!(
            menu.key(KeyCode::Enter),
            Some(MenuResult::Selected("Chrome".to_string()))
        );
        assert_eq!(menu.key(KeyCode::Esc), Some(MenuResult::Back));
    }

    #[test]
    fn menu_without_choices_cannot_select() {
        let rows = ["---", "Gallery (disabled)"];
        let mut menu = MenuState::new(&rows);
        assert_eq!(menu.current(), None);
        assert_eq!(menu.key(KeyCode::Enter), None);
        assert_eq!(menu.lines().len(), 2);
    }

    #[test]
    fn editor_masks_and_trims() {
        let mut ed = LineEditor { masked: true, ..LineEditor::default() };
        for c in " admin ".chars() {
            assert_eq!(ed.key(KeyCode::Char(c)), Edit::Pending);
        }
        ed.key(KeyCode::Backspace);
        assert_eq!(ed.shown(), "\u{2022}".repeat(6));
        assert_eq!(ed.key(KeyCode::Enter), Edit::Submit("admin".to_string()));
        assert_eq!(ed.key(KeyCode::Esc), Edit::Cancel);
    }

    #[test]
    fn editor_ignores_control_chars() {
        let mut ed = LineEditor::default();
        ed.key(KeyCode::Char('\u{7}'));
        ed.key(KeyCode::Char('a'));
        assert_eq!(ed.shown(), "a");
    }

    #[test]
    fn scroll_stays_within_last_page() {
        let mut s = Scroll { offset: 0, len: 25 };
        assert!(s.key(KeyCode::PageDown, 10));
        assert_eq!(s.offset, 10);
        s.key(KeyCode::PageDown, 10);
        s.key(KeyCode::Down, 10);
        assert_eq!(s.offset, 15);
        s.key(KeyCode::Home, 10);
        assert_eq!(s.offset, 0);
        s.key(KeyCode::Up, 10);
        assert_eq!(s.offset, 0);
        assert!(!s.key(KeyCode::Char('q'), 10));
    }

    #[test]
    fn short_text_never_scrolls() {
        let mut s = Scroll { offset: 0, len: 3 };
        s.key(KeyCode::End, 10);
        assert_eq!(s.offset, 0);
    }

    #[test]
    fn dialog_is_centred_and_clamped() {
        let r = dialog_rect(Rect::new(0, 0, 40, 11), "Connected");
        assert_eq!(r, Rect::new(12, 3, 15, 5));
        let r = dialog_rect(Rect::new(0, 0, 10, 3), "a very long message");
        assert_eq!(r, Rect::new(0, 0, 10, 3));
    }
}
