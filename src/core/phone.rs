//! Android phone simulator state. Nothing here is persisted; every puzzle is
//! a string comparison against a fixed answer.

use std::collections::BTreeSet;
use thiserror::Error;

pub const PHONE_FLAG: &str = "ctf7{br4in_d3d_4utH0R}";
pub const TARGET_SSID: &str = "SURAJ_HOME";
pub const ROUTER_IP: &str = "192.168.0.1";
pub const ROUTER_USER: &str = "admin";
pub const ROUTER_PASS: &str = "admin";
pub const UNLOCK_PHRASE: &str = "author@suraj";
pub const REVEALED_PASSWORD: &str = "SURAJ_HOME_PASS_2025";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("This network doesn't require WPS testing in this simulation")]
    NoWpsTest,
    #[error("Incorrect answers. Try again!")]
    WrongAnswers,
    #[error("Not connected to network. Connect via Wi-Fi first.")]
    NotConnected,
    #[error("Simulated browser - only router IP works")]
    UnknownUrl,
    #[error("Open the router page at 192.168.0.1 first")]
    NoRouterPage,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Log in to the router first")]
    NotLoggedIn,
    #[error("Incorrect unlock key. Check Files app for hints.")]
    WrongUnlockKey,
    #[error("Requirements not met. Connect to Wi-Fi and obtain router password first.")]
    RequirementsNotMet,
    #[error("{0} is not available on this device")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Drawer,
    PlayStore,
    Settings,
    Chrome,
    WpsTester,
    LuckyPatcher,
    Files,
    Flag,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Drawer => "All apps",
            Screen::PlayStore => "Play Store",
            Screen::Settings => "Settings",
            Screen::Chrome => "Chrome",
            Screen::WpsTester => "WPS-TESTER",
            Screen::LuckyPatcher => "Lucky Patcher",
            Screen::Files => "Files",
            Screen::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Item {
    WpsToken,
    RouterPassword,
}

impl Item {
    pub fn tag(self) -> &'static str {
        match self {
            Item::WpsToken => "WPS_TOKEN",
            Item::RouterPassword => "ROUTER_PASSWORD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub ssid: &'static str,
    pub strength: u8,
    pub security: &'static str,
    pub bssid: &'static str,
}

pub const NETWORKS: [Network; 4] = [
    Network { ssid: "Cafe_Free_WiFi", strength: 3, security: "Open", bssid: "A4:2B:8C:1D:5E:9F" },
    Network { ssid: "Office_Guest", strength: 2, security: "WPA2", bssid: "B8:3F:7D:2A:6C:4E" },
    Network { ssid: "SURAJ_HOME", strength: 4, security: "WPA2", bssid: "D2:9A:4E:7B:1C:8F" },
    Network { ssid: "ISP-TP-LINK", strength: 1, security: "WPA2", bssid: "C1:5D:9E:3A:7F:2B" },
];

pub fn signal_bars(strength: u8) -> String {
    (0..4u8).map(|i| if i < strength { '▮' } else { '▯' }).collect()
}

pub struct Question {
    pub prompt: &'static str,
    answer: &'static str,
}

pub const QUIZ: [Question; 4] = [
    Question { prompt: "Device manufacturer hint: 5 letters", answer: "suraj" },
    Question { prompt: "Network security type (check Settings Wi-Fi):", answer: "WPA2" },
    Question { prompt: "Common router default user:", answer: "admin" },
    Question { prompt: "Device Android version: X.X format", answer: "5.1" },
];

pub const QUIZ_HINT: &str =
    "Hints: Check the Files app, About phone info, and network details in Settings.";

/// Launcher entry; `None` targets are greyed out.
pub type LauncherEntry = (&'static str, Option<Screen>);

const HOME_APPS: [LauncherEntry; 9] = [
    ("Play Store", Some(Screen::PlayStore)),
    ("Settings", Some(Screen::Settings)),
    ("Chrome", Some(Screen::Chrome)),
    ("Files", Some(Screen::Files)),
    ("WPS-TESTER", Some(Screen::WpsTester)),
    ("Lucky Patcher", Some(Screen::LuckyPatcher)),
    ("Calculator", None),
    ("Camera", None),
    ("Clock", None),
];

const DRAWER_APPS: [LauncherEntry; 10] = [
    ("Play Store", Some(Screen::PlayStore)),
    ("Settings", Some(Screen::Settings)),
    ("About phone", None),
    ("Chrome", Some(Screen::Chrome)),
    ("WPS-TESTER", Some(Screen::WpsTester)),
    ("Lucky Patcher", Some(Screen::LuckyPatcher)),
    ("Files", Some(Screen::Files)),
    ("Calculator", None),
    ("Camera", None),
    ("Clock", None),
];

pub const INSTALLED_APPS: [(&str, &str); 6] = [
    ("Play Store", "12.4 MB"),
    ("Settings", "8.2 MB"),
    ("Chrome", "45.1 MB"),
    ("WPS-TESTER", "3.8 MB"),
    ("Lucky Patcher", "6.5 MB"),
    ("Files", "5.1 MB"),
];

pub const PATCHABLE_APPS: [(&str, &str); 3] =
    [("Play Store", "5.1.0"), ("Chrome", "45.0"), ("Settings", "5.1.0")];

pub struct NoteFile {
    pub name: &'static str,
    pub content: &'static str,
}

pub const FILES_ROOT: [&str; 3] = ["Downloads", "Notes", "Pictures"];

pub const NOTES: [NoteFile; 2] = [
    NoteFile {
        name: "about_device.txt",
        content: "Device Information
==================
Model: Generic Android Phone
Manufacturer: SURAJ Mobile
Android Version: 5.1 (Lollipop)
Build: LMY48G
---
This device was configured by the author.
Owner tag: author@suraj
For support, contact the manufacturer.",
    },
    NoteFile {
        name: "router_hints.txt",
        content: "Router Configuration Notes
==========================
Default Credentials:
- Username: admin
- Password: admin

Network Details:
- SSID: SURAJ_HOME
- Router IP: 192.168.0.1
- Security: WPA2-PSK
---
Note: Password reveal requires owner verification.
The unlock key is the owner tag from device info.",
    },
];

pub const FLAG_ACHIEVEMENTS: [&str; 7] = [
    "✓ Explored Wi-Fi networks",
    "✓ Solved WPS puzzle challenge",
    "✓ Accessed router admin panel",
    "✓ Found hidden clues in Files app",
    "✓ Unlocked password with owner tag",
    "✓ Applied challenge patch",
    "✓ Captured the flag!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserPage {
    #[default]
    Search,
    Router,
}

#[derive(Debug, Clone, Default)]
pub struct Browser {
    pub page: BrowserPage,
    pub logged_in: bool,
    pub password_revealed: bool,
}

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub screen: Screen,
    pub wifi_connected: bool,
    pub connected_network: Option<String>,
    pub router_password: Option<String>,
    pub puzzle_solved: bool,
    pub flag_unlocked: bool,
    pub inventory: BTreeSet<Item>,
    pub browser: Browser,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            screen: Screen::Home,
            wifi_connected: false,
            connected_network: None,
            router_password: None,
            puzzle_solved: false,
            flag_unlocked: false,
            inventory: BTreeSet::new(),
            browser: Browser::default(),
        }
    }
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, screen: Screen) -> Result<(), PhoneError> {
        if screen == Screen::Flag && !self.flag_unlocked {
            return Err(PhoneError::Unavailable(Screen::Flag.title().to_string()));
        }
        self.screen = screen;
        Ok(())
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
    }

    pub fn home_apps(&self) -> Vec<LauncherEntry> {
        HOME_APPS.to_vec()
    }

    /// App drawer list; the flag app appears once the patch is applied.
    pub fn drawer_apps(&self) -> Vec<LauncherEntry> {
        let mut apps = DRAWER_APPS.to_vec();
        if self.flag_unlocked {
            apps.push(("flag", Some(Screen::Flag)));
        }
        apps
    }

    pub fn is_connected_to(&self, ssid: &str) -> bool {
        self.connected_network.as_deref() == Some(ssid)
    }

    /// Only the target network has a puzzle, and only while not yet joined.
    pub fn start_wps_test(&self, ssid: &str) -> Result<(), PhoneError> {
        if ssid == TARGET_SSID && !self.is_connected_to(ssid) {
            Ok(())
        } else {
            Err(PhoneError::NoWpsTest)
        }
    }

    pub fn submit_quiz(&mut self, answers: &[String]) -> Result<(), PhoneError> {
        let all_correct = answers.len() == QUIZ.len()
            && QUIZ
                .iter()
                .zip(answers)
                .all(|(q, a)| a.trim().to_lowercase() == q.answer.to_lowercase());
        if !all_correct {
            tracing::debug!("quiz rejected");
            return Err(PhoneError::WrongAnswers);
        }
        self.wifi_connected = true;
        self.connected_network = Some(TARGET_SSID.to_string());
        self.puzzle_solved = true;
        self.inventory.insert(Item::WpsToken);
        tracing::info!(ssid = TARGET_SSID, "wps puzzle solved");
        Ok(())
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), PhoneError> {
        let url = url.trim();
        if url != ROUTER_IP && url != format!("http://{ROUTER_IP}") {
            return Err(PhoneError::UnknownUrl);
        }
        if !self.wifi_connected {
            return Err(PhoneError::NotConnected);
        }
        self.browser.page = BrowserPage::Router;
        self.browser.logged_in = false;
        Ok(())
    }

    pub fn back_to_search(&mut self) {
        self.browser.page = BrowserPage::Search;
    }

    pub fn router_login(&mut self, user: &str, pass: &str) -> Result<(), PhoneError> {
        if self.browser.page != BrowserPage::Router {
            return Err(PhoneError::NoRouterPage);
        }
        if user != ROUTER_USER || pass != ROUTER_PASS {
            return Err(PhoneError::InvalidCredentials);
        }
        self.browser.logged_in = true;
        Ok(())
    }

    pub fn unlock_password(&mut self, key: &str) -> Result<&'static str, PhoneError> {
        if !self.browser.logged_in {
            return Err(PhoneError::NotLoggedIn);
        }
        if key.trim().to_lowercase() != UNLOCK_PHRASE {
            return Err(PhoneError::WrongUnlockKey);
        }
        self.browser.password_revealed = true;
        self.router_password = Some(REVEALED_PASSWORD.to_string());
        self.inventory.insert(Item::RouterPassword);
        tracing::info!("router password revealed");
        Ok(REVEALED_PASSWORD)
    }

    pub fn can_apply_patch(&self) -> bool {
        self.wifi_connected
            && self.router_password.is_some()
            && self.inventory.contains(&Item::RouterPassword)
    }

    pub fn apply_patch(&mut self) -> Result<(), PhoneError> {
        if !self.can_apply_patch() {
            return Err(PhoneError::RequirementsNotMet);
        }
        self.flag_unlocked = true;
        tracing::info!("challenge patch applied, flag app visible");
        Ok(())
    }

    /// System apps listed by Lucky Patcher; the flag entry is hidden until unlocked.
    pub fn system_apps(&self) -> Vec<(&'static str, &'static str)> {
        let mut apps = vec![("System UI", "5.1.0"), ("Package Manager", "5.1.0")];
        if self.flag_unlocked {
            apps.push(("flag", "1.0.0"));
        }
        apps
    }

    pub fn flag(&self) -> Result<&'static str, PhoneError> {
        if self.flag_unlocked {
            Ok(PHONE_FLAG)
        } else {
            Err(PhoneError::Unavailable(Screen::Flag.title().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(list: [&str; 4]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn solved() -> DeviceState {
        let mut device = DeviceState::new();
        device
            .submit_quiz(&answers(["  SURAJ ", "wpa2", "Admin", "5.1"]))
            .unwrap();
        device
    }

    #[test]
    fn quiz_accepts_trimmed_case_insensitive_answers() {
        let device = solved();
        assert!(device.wifi_connected);
        assert!(device.puzzle_solved);
        assert_eq!(device.connected_network.as_deref(), Some(TARGET_SSID));
        assert!(device.inventory.contains(&Item::WpsToken));
    }

    #[test]
    fn any_wrong_answer_leaves_state_untouched() {
        let mut device = DeviceState::new();
        let err = device
            .submit_quiz(&answers(["suraj", "WPA2", "admin", "5.0"]))
            .unwrap_err();
        assert_eq!(err, PhoneError::WrongAnswers);
        assert!(!device.wifi_connected);
        assert!(device.inventory.is_empty());
        assert!(device.submit_quiz(&answers(["suraj", "WPA2", "admin", ""])[..3]).is_err());
    }

    #[test]
    fn wps_test_only_for_target_network() {
        let device = DeviceState::new();
        assert!(device.start_wps_test(TARGET_SSID).is_ok());
        assert_eq!(device.start_wps_test("Cafe_Free_WiFi"), Err(PhoneError::NoWpsTest));
        assert_eq!(solved().start_wps_test(TARGET_SSID), Err(PhoneError::NoWpsTest));
    }

    #[test]
    fn router_page_requires_wifi_and_known_url() {
        let mut device = DeviceState::new();
        assert_eq!(device.navigate("192.168.0.1"), Err(PhoneError::NotConnected));
        let mut device = solved();
        assert_eq!(device.navigate("example.com"), Err(PhoneError::UnknownUrl));
        device.navigate("http://192.168.0.1").unwrap();
        assert_eq!(device.browser.page, BrowserPage::Router);
    }

    #[test]
    fn full_chain_unlocks_flag() {
        let mut device = solved();
        assert_eq!(device.apply_patch(), Err(PhoneError::RequirementsNotMet));
        device.navigate("192.168.0.1").unwrap();
        assert_eq!(
            device.router_login("admin", "password"),
            Err(PhoneError::InvalidCredentials)
        );
        assert_eq!(device.unlock_password(UNLOCK_PHRASE), Err(PhoneError::NotLoggedIn));
        device.router_login("admin", "admin").unwrap();
        assert_eq!(device.unlock_password("owner"), Err(PhoneError::WrongUnlockKey));
        assert_eq!(
            device.unlock_password("  Author@Suraj "),
            Ok("SURAJ_HOME_PASS_2025")
        );
        assert!(device.can_apply_patch());
        assert!(!device.drawer_apps().iter().any(|(name, _)| *name == "flag"));
        device.apply_patch().unwrap();
        assert!(device.drawer_apps().contains(&("flag", Some(Screen::Flag))));
        assert_eq!(device.flag(), Ok(PHONE_FLAG));
        device.open(Screen::Flag).unwrap();
        assert_eq!(device.screen, Screen::Flag);
    }

    #[test]
    fn flag_screen_locked_until_patch() {
        let mut device = DeviceState::new();
        assert!(device.open(Screen::Flag).is_err());
        assert!(device.flag().is_err());
        assert_eq!(device.screen, Screen::Home);
    }

    #[test]
    fn placeholder_apps_are_not_launchable() {
        let device = DeviceState::new();
        let greyed: Vec<&str> = device
            .home_apps()
            .into_iter()
            .filter(|(_, target)| target.is_none())
            .map(|(name, _)| name)
            .collect();
        assert_eq!(greyed, vec!["Calculator", "Camera", "Clock"]);
        assert!(device.drawer_apps().contains(&("About phone", None)));
    }

    #[test]
    fn notes_carry_the_clues() {
        assert!(NOTES[0].content.contains("Owner tag: author@suraj"));
        assert!(NOTES[1].content.contains("Router IP: 192.168.0.1"));
        assert_eq!(signal_bars(3), "▮▮▮▯");
    }
}
