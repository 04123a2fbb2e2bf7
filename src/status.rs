use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use chrono::Local;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::ui::sel_style;

// ── Cached system info ────────────────────────────────────────────────────────

struct BattCache { pct: Option<f32>, ts: Instant }
static BATT: Mutex<Option<BattCache>> = Mutex::new(None);

/// Extra text shown left of the battery, e.g. the phone's Wi-Fi state.
static INDICATOR: Mutex<String> = Mutex::new(String::new());

fn battery_pct() -> Option<f32> {
    let mut guard = BATT.lock().ok()?;
    if guard.as_ref().map_or(true, |c| c.ts.elapsed() > Duration::from_secs(30)) {
        let pct = read_battery_linux();
        *guard = Some(BattCache { pct, ts: Instant::now() });
    }
    guard.as_ref().and_then(|c| c.pct)
}

fn read_battery_linux() -> Option<f32> {
    for entry in std::fs::read_dir("/sys/class/power_supply").ok()? {
        let path = entry.ok()?.path();
        let kind = std::fs::read_to_string(path.join("type")).ok()?;
        if kind.trim() == "Battery" {
            let cap = std::fs::read_to_string(path.join("capacity")).ok()?;
            return cap.trim().parse().ok();
        }
    }
    None
}

pub fn battery_display() -> String {
    battery_pct().map(|p| format!("{p:.0}%")).unwrap_or_else(|| "--%".to_string())
}

pub fn set_indicator(text: impl Into<String>) {
    if let Ok(mut guard) = INDICATOR.lock() {
        *guard = text.into();
    }
}

fn indicator() -> String {
    INDICATOR.lock().map(|g| g.clone()).unwrap_or_default()
}

/// Left and right halves joined with enough padding to fill `width`.
pub fn compose_bar(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    let pad = " ".repeat(width.saturating_sub(used));
    let mut line = format!("{left}{pad}{right}");
    if line.chars().count() > width {
        line = line.chars().take(width).collect();
    }
    line
}

// ── Status bar ────────────────────────────────────────────────────────────────

pub fn render_status_bar(f: &mut Frame, area: Rect) {
    if area.height == 0 { return; }

    let now = Local::now().format("%A, %d. %B - %I:%M%p").to_string();
    let ind = indicator();
    let right = if ind.is_empty() {
        format!("{} ", battery_display())
    } else {
        format!("{ind}  {} ", battery_display())
    };
    let line = compose_bar(&format!(" {now}"), &right, area.width as usize);
    f.render_widget(Paragraph::new(Line::from(Span::styled(line, sel_style()))), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_pads_between_halves() {
        assert_eq!(compose_bar("ab", "cd", 8), "ab    cd");
        assert_eq!(compose_bar("abcdef", "ghij", 6), "abcdef");
    }

    #[test]
    fn indicator_is_shared() {
        set_indicator("Wi-Fi: SURAJ_HOME");
        assert_eq!(indicator(), "Wi-Fi: SURAJ_HOME");
        set_indicator("");
    }
}
