use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

// ── Paths ─────────────────────────────────────────────────────────────────────

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory for this process. Only the first call wins.
pub fn set_data_dir(dir: PathBuf) {
    let _ = DATA_DIR.set(dir);
}

pub fn data_dir() -> PathBuf {
    let d = DATA_DIR
        .get_or_init(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ctfsim")
        })
        .clone();
    let _ = std::fs::create_dir_all(&d);
    d
}

pub fn store_file() -> PathBuf {
    data_dir().join("fs.json")
}

pub fn settings_file() -> PathBuf {
    data_dir().join("settings.json")
}

pub fn log_file_name() -> &'static str {
    "ctfsim.log"
}

// ── JSON helpers ──────────────────────────────────────────────────────────────

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

pub fn load_settings() -> Settings {
    load_json(&settings_file())
}

pub fn save_settings(d: &Settings) {
    if let Err(err) = save_json(&settings_file(), d) {
        tracing::warn!(%err, "could not save settings");
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Simulator {
    #[default]
    Desktop,
    Phone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub theme: String,
    #[serde(default)]
    pub default_simulator: Simulator,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "Blue (Default)".into(),
            default_simulator: Simulator::Desktop,
        }
    }
}

// ── Global mutable state ──────────────────────────────────────────────────────

static APP_SETTINGS: OnceLock<RwLock<Settings>> = OnceLock::new();

fn settings_lock() -> &'static RwLock<Settings> {
    APP_SETTINGS.get_or_init(|| RwLock::new(Settings::default()))
}

pub fn get_settings() -> Settings {
    settings_lock()
        .read()
        .map(|g| g.clone())
        .unwrap_or_default()
}

pub fn reload_settings() {
    let s = load_settings();
    if let Ok(mut guard) = settings_lock().write() {
        *guard = s;
    }
}

pub fn update_settings<F: FnOnce(&mut Settings)>(f: F) {
    if let Ok(mut guard) = settings_lock().write() {
        f(&mut guard);
    }
}

pub fn persist_settings() {
    let s = get_settings();
    save_settings(&s);
}

// ── Themes ────────────────────────────────────────────────────────────────────

use ratatui::style::Color;

pub const THEMES: &[(&str, Color)] = &[
    ("Blue (Default)", Color::Blue),
    ("Light Blue", Color::Cyan),
    ("Green", Color::Green),
    ("White", Color::White),
    ("Amber", Color::Yellow),
    ("Purple", Color::Magenta),
];

pub fn theme_color(name: &str) -> Color {
    THEMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
        .unwrap_or(Color::Blue)
}

pub fn current_theme_color() -> Color {
    theme_color(&get_settings().theme)
}

pub fn is_known_theme(name: &str) -> bool {
    THEMES.iter().any(|(n, _)| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_corrupt_json_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Settings = load_json(&dir.path().join("nope.json"));
        assert_eq!(missing, Settings::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let loaded: Settings = load_json(&bad);
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        let s = Settings {
            theme: "Amber".into(),
            default_simulator: Simulator::Phone,
        };
        save_json(&file, &s).unwrap();
        let back: Settings = load_json(&file);
        assert_eq!(back, s);
    }

    #[test]
    fn simulator_defaults_when_field_absent() {
        let s: Settings = serde_json::from_str(r#"{"theme":"Green"}"#).unwrap();
        assert_eq!(s.default_simulator, Simulator::Desktop);
    }

    #[test]
    fn unknown_theme_falls_back_to_blue() {
        assert_eq!(theme_color("Amber"), Color::Yellow);
        assert_eq!(theme_color("Plaid"), Color::Blue);
        assert!(is_known_theme("Purple"));
        assert!(!is_known_theme("Plaid"));
    }
}
