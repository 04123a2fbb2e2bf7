//! Challenge constants and the trigger predicates that reveal the flag or
//! crash the desktop.

use std::time::Duration;

use super::path;

pub const FLAGGED_NAME: &str = "system_helper.dll";
pub const FLAGGED_PATH: &str = "C:/Windows/System32/system_helper.dll";
pub const FLAGGED_CONTENT: &str = "// System Helper Module v3.2.1\n\
// DO NOT DELETE - Critical system component\n\
\n\
function initSystemHelper() {\n  // Initialize core services\n  return true;\n}";
pub const FLAGGED_THREAT_LEVEL: &str = "High";
pub const FLAGGED_DETECTION_REASON: &str =
    "Suspicious behavior detected: Unauthorized system modification attempt";

pub const DESKTOP_FLAG: &str = "ctf7{windows_sucks}";

pub const CRASH_DELAY: Duration = Duration::from_millis(2000);

pub const CAPTURE_BANNER: [&str; 3] = [
    "🎉 CTF FLAG CAPTURED! 🎉",
    "Flag: {flag}",
    "Congratulations! You found and eliminated the threat using the terminal.",
];

pub const CRASH_WARNING: [&str; 4] = [
    "CRITICAL ERROR: System32 folder deletion detected!",
    "System integrity compromised. Initiating emergency shutdown...",
    "",
    "SYSTEM CRASH IMMINENT",
];

pub const CRASH_SCREEN: [&str; 8] = [
    "CRITICAL SYSTEM ERROR",
    "",
    "Error Code: SYSTEM_INTEGRITY_VIOLATION",
    "Error Message: System32 folder deletion detected",
    "Cause: Critical system directory removed",
    "Impact: System cannot function without System32",
    "",
    "WARNING: Deleting System32 folder causes complete system failure",
];

pub const FLAG_MODAL: [&str; 8] = [
    "🎉 Congratulations! 🎉",
    "You've successfully completed the CTF challenge!",
    "",
    "You found and eliminated the threat! Here's your flag:",
    "",
    "Achievement Unlocked: Threat Hunter",
    "✓ Navigated to C:\\Windows\\System32\\",
    "✓ Removed threat from system",
];

/// Matches the flagged path exactly or any path mentioning the flagged name.
pub fn is_flagged_deletion(deleted_path: &str) -> bool {
    deleted_path == FLAGGED_PATH || deleted_path.contains(FLAGGED_NAME)
}

pub fn flag_for_terminal_deletion(deleted_path: &str) -> Option<&'static str> {
    is_flagged_deletion(deleted_path).then_some(DESKTOP_FLAG)
}

pub fn is_system32_removal(target: &str) -> bool {
    path::file_name(&path::normalize(target)).eq_ignore_ascii_case("system32")
}

/// The three banner lines printed after a flagged terminal deletion.
pub fn capture_banner(flag: &str) -> Vec<String> {
    CAPTURE_BANNER
        .iter()
        .map(|line| line.replace("{flag}", flag))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagged_path_and_loose_name_match() {
        assert!(is_flagged_deletion(FLAGGED_PATH));
        assert!(is_flagged_deletion(
            "C:/Users/Default/Desktop/system_helper.dll"
        ));
        assert!(is_flagged_deletion("C:/Temp/old_system_helper.dll.bak"));
        assert!(!is_flagged_deletion("C:/Windows/System32/kernel32.dll"));
    }

    #[test]
    fn terminal_deletion_yields_flag() {
        assert_eq!(
            flag_for_terminal_deletion(FLAGGED_PATH),
            Some("ctf7{windows_sucks}")
        );
        assert_eq!(
            flag_for_terminal_deletion("C:/Windows/System32/ntdll.dll"),
            None
        );
    }

    #[test]
    fn system32_match_is_case_insensitive_on_last_segment() {
        assert!(is_system32_removal("C:/Windows/System32"));
        assert!(is_system32_removal("c:\\windows\\SYSTEM32\\"));
        assert!(is_system32_removal("system32"));
        assert!(!is_system32_removal("C:/Windows/System32/Logs"));
        assert!(!is_system32_removal("C:/Windows/SysWOW64"));
    }

    #[test]
    fn banner_substitutes_flag() {
        let lines = capture_banner(DESKTOP_FLAG);
        assert_eq!(lines[1], "Flag: ctf7{windows_sucks}");
        assert_eq!(lines.len(), 3);
    }
}
