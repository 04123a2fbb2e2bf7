use anyhow::Result;

use crate::core::phone::{
    signal_bars, DeviceState, LauncherEntry, Network, Screen, BrowserPage, FILES_ROOT,
    FLAG_ACHIEVEMENTS, INSTALLED_APPS, NETWORKS, NOTES, PATCHABLE_APPS, QUIZ, QUIZ_HINT,
    ROUTER_IP,
};
use crate::status::set_indicator;
use crate::ui::{
    box_message, confirm, flash_message, input_prompt, pager, password_prompt, run_menu, MenuResult,
    Term, DISABLED_SUFFIX, SEPARATOR,
};

const BACK: &str = "Back";
const ALL_APPS: &str = "All apps";
const POWER_OFF: &str = "Power off";
const ABOUT_PHONE: &str = "About phone";
const APPLY_PATCH: &str = "Apply challenge patch";

// ── Entry point ───────────────────────────────────────────────────────────────

pub fn phone_mode(terminal: &mut Term) -> Result<()> {
    let mut device = DeviceState::new();
    tracing::info!("phone session started");
    sync_indicator(&device);

    let result = run_phone(terminal, &mut device);
    set_indicator("");
    tracing::info!("phone session ended");
    result
}

fn run_phone(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        match device.screen {
            Screen::Home => {
                if !home_screen(terminal, device)? {
                    return Ok(());
                }
            }
            Screen::Drawer => drawer_screen(terminal, device)?,
            Screen::PlayStore => play_store(terminal, device)?,
            Screen::Settings => settings_screen(terminal, device)?,
            Screen::Chrome => chrome_screen(terminal, device)?,
            Screen::WpsTester => wps_tester(terminal, device)?,
            Screen::LuckyPatcher => lucky_patcher(terminal, device)?,
            Screen::Files => files_screen(terminal, device)?,
            Screen::Flag => flag_screen(terminal, device)?,
        }
        sync_indicator(device);
    }
}

fn wifi_label(device: &DeviceState) -> String {
    match &device.connected_network {
        Some(ssid) => format!("Wi-Fi: {ssid}"),
        None => "Wi-Fi: off".to_string(),
    }
}

fn sync_indicator(device: &DeviceState) {
    set_indicator(wifi_label(device));
}

// ── Launchers ─────────────────────────────────────────────────────────────────

/// Menu rows for a launcher; greyed entries carry a marker and are inert.
fn launcher_rows(apps: &[LauncherEntry]) -> Vec<String> {
    apps.iter()
        .map(|(name, target)| match target {
            Some(_) => name.to_string(),
            None => format!("{name}{DISABLED_SUFFIX}"),
        })
        .collect()
}

fn launcher_target(apps: &[LauncherEntry], row: &str) -> Option<Screen> {
    apps.iter().find(|(name, _)| *name == row).and_then(|(_, t)| *t)
}

fn open_or_flash(terminal: &mut Term, device: &mut DeviceState, screen: Screen) -> Result<()> {
    if let Err(err) = device.open(screen) {
        flash_message(terminal, &err.to_string(), 1000)?;
    }
    Ok(())
}

/// Returns false when the user powers the phone off.
fn home_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<bool> {
    let apps = device.home_apps();
    let mut rows = launcher_rows(&apps);
    rows.push(SEPARATOR.to_string());
    rows.push(ALL_APPS.to_string());
    rows.push(POWER_OFF.to_string());
    let opts: Vec<&str> = rows.iter().map(String::as_str).collect();
    let subtitle = wifi_label(device);

    match run_menu(terminal, "Home", &opts, Some(&subtitle))? {
        MenuResult::Back => Ok(true),
        MenuResult::Selected(s) if s == POWER_OFF => Ok(false),
        MenuResult::Selected(s) if s == ALL_APPS => {
            device.screen = Screen::Drawer;
            Ok(true)
        }
        MenuResult::Selected(s) => {
            if let Some(screen) = launcher_target(&apps, &s) {
                open_or_flash(terminal, device, screen)?;
            }
            Ok(true)
        }
    }
}

fn drawer_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    let apps = device.drawer_apps();
    let mut rows = launcher_rows(&apps);
    rows.push(SEPARATOR.to_string());
    rows.push(BACK.to_string());
    let opts: Vec<&str> = rows.iter().map(String::as_str).collect();

    match run_menu(terminal, Screen::Drawer.title(), &opts, None)? {
        MenuResult::Back => device.go_home(),
        MenuResult::Selected(s) if s == BACK => device.go_home(),
        MenuResult::Selected(s) => {
            if let Some(screen) = launcher_target(&apps, &s) {
                open_or_flash(terminal, device, screen)?;
            }
        }
    }
    Ok(())
}

// ── Apps ──────────────────────────────────────────────────────────────────────

fn play_store(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    let mut text = String::from("Installed apps\n\n");
    for (name, size) in INSTALLED_APPS {
        text.push_str(&format!("  {name:<16} {size:>8}   Installed\n"));
    }
    pager(terminal, &text, Screen::PlayStore.title())?;
    device.go_home();
    Ok(())
}

fn network_row(device: &DeviceState, net: &Network) -> String {
    let state = if device.is_connected_to(net.ssid) {
        "  Connected"
    } else {
        ""
    };
    format!("{} {:<16} {}{}", signal_bars(net.strength), net.ssid, net.security, state)
}

fn network_details(device: &DeviceState, net: &Network) -> String {
    let status = if device.is_connected_to(net.ssid) {
        "Connected"
    } else {
        "Not connected"
    };
    format!(
        "SSID: {}\nBSSID: {}\nSecurity: {}\nSignal: {} ({}/4)\nStatus: {}",
        net.ssid,
        net.bssid,
        net.security,
        signal_bars(net.strength),
        net.strength,
        status
    )
}

fn settings_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        let mut rows: Vec<String> = NETWORKS.iter().map(|n| network_row(device, n)).collect();
        rows.push(SEPARATOR.to_string());
        rows.push(ABOUT_PHONE.to_string());
        rows.push(BACK.to_string());
        let opts: Vec<&str> = rows.iter().map(String::as_str).collect();

        match run_menu(terminal, "Wi-Fi", &opts, Some(&wifi_label(device)))? {
            MenuResult::Back => break,
            MenuResult::Selected(s) if s == BACK => break,
            MenuResult::Selected(s) if s == ABOUT_PHONE => about_phone(terminal)?,
            MenuResult::Selected(s) => {
                if let Some(net) = NETWORKS.iter().find(|n| network_row(device, n) == s) {
                    pager(terminal, &network_details(device, net), net.ssid)?;
                }
            }
        }
    }
    device.go_home();
    Ok(())
}

fn about_phone(terminal: &mut Term) -> Result<()> {
    let text = "Model: Generic Android Phone\n\
                Manufacturer: SURAJ Mobile\n\
                Android version: 5.1 (Lollipop)\n\
                Build number: LMY48G\n\
                Kernel: 3.10.73";
    pager(terminal, text, ABOUT_PHONE)
}

fn wps_tester(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        let mut rows: Vec<String> = NETWORKS.iter().map(|n| network_row(device, n)).collect();
        rows.push(SEPARATOR.to_string());
        rows.push(BACK.to_string());
        let opts: Vec<&str> = rows.iter().map(String::as_str).collect();

        let selected = match run_menu(terminal, "WPS-TESTER", &opts, Some("Select a network to test"))? {
            MenuResult::Back => break,
            MenuResult::Selected(s) if s == BACK => break,
            MenuResult::Selected(s) => s,
        };
        let Some(net) = NETWORKS.iter().find(|n| network_row(device, n) == selected) else {
            continue;
        };
        if let Err(err) = device.start_wps_test(net.ssid) {
            flash_message(terminal, &err.to_string(), 1200)?;
            continue;
        }
        if run_quiz(terminal, device)? {
            box_message(terminal, &format!("Connected to {}", net.ssid), 1200)?;
            break;
        }
    }
    device.go_home();
    Ok(())
}

/// Ask every quiz question; returns true once the device joined the network.
fn run_quiz(terminal: &mut Term, device: &mut DeviceState) -> Result<bool> {
    flash_message(terminal, QUIZ_HINT, 1500)?;
    let mut answers = Vec::with_capacity(QUIZ.len());
    for (i, q) in QUIZ.iter().enumerate() {
        let prompt = format!("Question {}/{}: {}", i + 1, QUIZ.len(), q.prompt);
        match input_prompt(terminal, &prompt)? {
            Some(a) => answers.push(a),
            None => return Ok(false),
        }
    }
    match device.submit_quiz(&answers) {
        Ok(()) => Ok(true),
        Err(err) => {
            flash_message(terminal, &err.to_string(), 1200)?;
            Ok(false)
        }
    }
}

fn chrome_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        match device.browser.page {
            BrowserPage::Search => {
                let Some(url) = input_prompt(terminal, "Search or type URL")? else {
                    break;
                };
                if url.is_empty() {
                    continue;
                }
                if let Err(err) = device.navigate(&url) {
                    flash_message(terminal, &err.to_string(), 1200)?;
                }
            }
            BrowserPage::Router => {
                if !router_page(terminal, device)? {
                    break;
                }
            }
        }
    }
    device.go_home();
    Ok(())
}

/// Returns false when the user leaves the browser.
fn router_page(terminal: &mut Term, device: &mut DeviceState) -> Result<bool> {
    let title = format!("Router Admin - {ROUTER_IP}");
    let mut rows = Vec::new();
    let subtitle = if device.browser.logged_in {
        rows.push("Reveal Wi-Fi password");
        match &device.router_password {
            Some(pw) => format!("Logged in as admin. Wi-Fi password: {pw}"),
            None => "Logged in as admin. Password hidden: owner verification required".to_string(),
        }
    } else {
        rows.push("Log in");
        "Please log in to continue".to_string()
    };
    rows.extend([SEPARATOR, "Back to search", "Close browser"]);

    match run_menu(terminal, &title, &rows, Some(&subtitle))? {
        MenuResult::Back => Ok(false),
        MenuResult::Selected(s) => match s.as_str() {
            "Log in" => {
                let Some(user) = input_prompt(terminal, "Username")? else {
                    return Ok(true);
                };
                let Some(pass) = password_prompt(terminal, "Password")? else {
                    return Ok(true);
                };
                if let Err(err) = device.router_login(&user, &pass) {
                    flash_message(terminal, &err.to_string(), 1000)?;
                }
                Ok(true)
            }
            "Reveal Wi-Fi password" => {
                let Some(key) = input_prompt(terminal, "Enter the owner unlock key")? else {
                    return Ok(true);
                };
                match device.unlock_password(&key) {
                    Ok(pw) => box_message(terminal, &format!("Wi-Fi password: {pw}"), 1800)?,
                    Err(err) => flash_message(terminal, &err.to_string(), 1200)?,
                }
                Ok(true)
            }
            "Back to search" => {
                device.back_to_search();
                Ok(true)
            }
            _ => Ok(false),
        },
    }
}

fn lucky_patcher(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        let mut rows: Vec<String> = PATCHABLE_APPS
            .iter()
            .map(|(name, version)| format!("{name} v{version}"))
            .collect();
        rows.push(SEPARATOR.to_string());
        rows.extend(
            device
                .system_apps()
                .into_iter()
                .map(|(name, version)| format!("[system] {name} v{version}")),
        );
        rows.push(SEPARATOR.to_string());
        rows.push(APPLY_PATCH.to_string());
        rows.push(BACK.to_string());
        let opts: Vec<&str> = rows.iter().map(String::as_str).collect();

        let subtitle = if device.can_apply_patch() {
            "Challenge patch ready"
        } else {
            "Challenge patch locked"
        };
        match run_menu(terminal, "Lucky Patcher", &opts, Some(subtitle))? {
            MenuResult::Back => break,
            MenuResult::Selected(s) if s == BACK => break,
            MenuResult::Selected(s) if s == APPLY_PATCH => {
                if !confirm(terminal, "Apply the challenge patch to this device?")? {
                    continue;
                }
                match device.apply_patch() {
                    Ok(()) => box_message(terminal, "Patch applied. New app: flag", 1500)?,
                    Err(err) => flash_message(terminal, &err.to_string(), 1500)?,
                }
            }
            MenuResult::Selected(_) => {
                flash_message(terminal, "No patches available for this app", 900)?;
            }
        }
    }
    device.go_home();
    Ok(())
}

fn files_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    loop {
        let mut rows: Vec<&str> = FILES_ROOT.to_vec();
        rows.extend([SEPARATOR, BACK]);
        let folder = match run_menu(terminal, "Files", &rows, Some("/sdcard"))? {
            MenuResult::Back => break,
            MenuResult::Selected(s) if s == BACK => break,
            MenuResult::Selected(s) => s,
        };
        if folder != "Notes" {
            flash_message(terminal, "This folder is empty", 800)?;
            continue;
        }
        let mut notes: Vec<&str> = NOTES.iter().map(|n| n.name).collect();
        notes.extend([SEPARATOR, BACK]);
        if let MenuResult::Selected(name) = run_menu(terminal, "Notes", &notes, Some("/sdcard/Notes"))? {
            if let Some(note) = NOTES.iter().find(|n| n.name == name) {
                pager(terminal, note.content, note.name)?;
            }
        }
    }
    device.go_home();
    Ok(())
}

fn flag_text(flag: &str) -> String {
    let mut text = format!("Congratulations!\n\nFlag: {flag}\n\n");
    for line in FLAG_ACHIEVEMENTS {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn flag_screen(terminal: &mut Term, device: &mut DeviceState) -> Result<()> {
    match device.flag() {
        Ok(flag) => {
            tracing::info!("phone flag viewed");
            pager(terminal, &flag_text(flag), Screen::Flag.title())?;
        }
        Err(err) => flash_message(terminal, &err.to_string(), 1000)?,
    }
    device.go_home();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phone::PHONE_FLAG;

    #[test]
    fn greyed_launcher_rows_do_not_resolve() {
        let device = DeviceState::new();
        let apps = device.home_apps();
        let rows = launcher_rows(&apps);
        assert!(rows.contains(&"Camera (disabled)".to_string()));
        assert_eq!(launcher_target(&apps, "Camera (disabled)"), None);
        assert_eq!(launcher_target(&apps, "Chrome"), Some(Screen::Chrome));
    }

    #[test]
    fn connected_network_is_marked() {
        let mut device = DeviceState::new();
        let home = NETWORKS.iter().find(|n| n.ssid == "SURAJ_HOME").unwrap();
        assert!(!network_row(&device, home).contains("Connected"));
        assert_eq!(wifi_label(&device), "Wi-Fi: off");

        let answers: Vec<String> = ["suraj", "WPA2", "admin", "5.1"].iter().map(|s| s.to_string()).collect();
        device.submit_quiz(&answers).unwrap();
        assert!(network_row(&device, home).ends_with("Connected"));
        assert!(network_details(&device, home).contains("BSSID: D2:9A:4E:7B:1C:8F"));
        assert_eq!(wifi_label(&device), "Wi-Fi: SURAJ_HOME");
    }

    #[test]
    fn flag_text_lists_achievements() {
        let text = flag_text(PHONE_FLAG);
        assert!(text.contains("Flag: ctf7{br4in_d3d_4utH0R}"));
        assert!(text.ends_with("✓ Captured the flag!\n"));
    }
}
