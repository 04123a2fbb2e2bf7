//! Command interpreter behind the Terminal window.

use chrono::{Local, TimeZone};

use super::ctf;
use super::path::{self, normalize};
use super::store::{FileRecord, Store};
use super::vfs::VirtualFs;

pub const HOME: &str = "C:/Users/Default";

const BANNER: [&str; 2] = [
    "Microsoft Windows [Version 10.0.22000.1]",
    "(c) Microsoft Corporation. All rights reserved.",
];

const HELP: [&str; 9] = [
    "Available commands:",
    "  cd [path]     - Change directory",
    "  dir, ls       - List directory contents",
    "  rm, del       - Delete file",
    "  rmdir         - Remove directory",
    "  pwd           - Print working directory",
    "  echo [text]   - Display text",
    "  cls, clear    - Clear screen",
    "  help          - Show this help",
];

const NO_PATH: &str = "The system cannot find the path specified.";
const BAD_SYNTAX: &str = "The syntax of the command is incorrect.";
const BAD_DIR_NAME: &str = "The directory name is invalid.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Input,
    Output,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLine {
    pub kind: LineKind,
    pub text: String,
}

/// Side effects the desktop has to act on after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellOutcome {
    None,
    FlagCaptured(&'static str),
    CrashScheduled,
}

#[derive(Debug, Clone)]
pub struct Shell {
    cwd: String,
    lines: Vec<ShellLine>,
    history: Vec<String>,
    history_index: Option<usize>,
    pub input: String,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Self {
            cwd: HOME.to_string(),
            lines: BANNER
                .iter()
                .map(|text| ShellLine {
                    kind: LineKind::Output,
                    text: text.to_string(),
                })
                .collect(),
            history: Vec::new(),
            history_index: None,
            input: String::new(),
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn prompt(&self) -> String {
        format!("{}> ", path::display(&self.cwd))
    }

    pub fn lines(&self) -> &[ShellLine] {
        &self.lines
    }

    fn out(&mut self, text: impl Into<String>) {
        self.lines.push(ShellLine {
            kind: LineKind::Output,
            text: text.into(),
        });
    }

    fn err(&mut self, text: impl Into<String>) {
        self.lines.push(ShellLine {
            kind: LineKind::Error,
            text: text.into(),
        });
    }

    /// Run whatever is in the input buffer and clear it.
    pub fn submit<S: Store>(&mut self, fs: &mut VirtualFs<S>) -> ShellOutcome {
        let command = std::mem::take(&mut self.input);
        self.execute(fs, &command)
    }

    pub fn execute<S: Store>(&mut self, fs: &mut VirtualFs<S>, command: &str) -> ShellOutcome {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return ShellOutcome::None;
        }
        self.history.push(trimmed.to_string());
        self.history_index = None;
        self.lines.push(ShellLine {
            kind: LineKind::Input,
            text: format!("{}{}", self.prompt(), trimmed),
        });

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();
        tracing::debug!(%cmd, ?args, cwd = %self.cwd, "terminal command");

        if cmd.ends_with("-help") || args.iter().any(|a| *a == "-help" || *a == "--help") {
            self.help();
            return ShellOutcome::None;
        }

        let result = match cmd.as_str() {
            "cd" => self.cd(fs, &args).map(|_| ShellOutcome::None),
            "dir" | "ls" => self.dir(fs).map(|_| ShellOutcome::None),
            "rm" | "del" => self.rm(fs, &args),
            "rmdir" => self.rmdir(fs, &args),
            "pwd" => {
                self.out(path::display(&self.cwd));
                Ok(ShellOutcome::None)
            }
            "help" => {
                self.help();
                Ok(ShellOutcome::None)
            }
            "cls" | "clear" => {
                self.lines.clear();
                Ok(ShellOutcome::None)
            }
            "echo" => {
                self.out(args.join(" "));
                Ok(ShellOutcome::None)
            }
            other => {
                self.err(format!(
                    "'{other}' is not recognized as an internal or external command, operable program or batch file."
                ));
                Ok(ShellOutcome::None)
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "terminal command failed");
                self.err(format!("Error: {e}"));
                ShellOutcome::None
            }
        }
    }

    fn help(&mut self) {
        for line in HELP {
            self.out(line);
        }
    }

    /// Resolve `arg` against the working directory. `..` never climbs past
    /// the drive root.
    pub fn resolve(&self, arg: &str) -> String {
        let arg = arg.replace('\\', "/");
        let mut parts: Vec<String> = if path::is_absolute(&arg) {
            Vec::new()
        } else {
            self.cwd.split('/').map(str::to_string).collect()
        };
        let absolute_root = arg.starts_with('/');
        for seg in arg.split('/').filter(|s| !s.is_empty()) {
            match seg {
                "." => {}
                ".." => {
                    if parts.len() > 1 {
                        parts.pop();
                    }
                }
                s => parts.push(s.to_string()),
            }
        }
        let joined = parts.join("/");
        if absolute_root {
            normalize(&format!("/{joined}"))
        } else {
            normalize(&joined)
        }
    }

    fn cd<S: Store>(&mut self, fs: &VirtualFs<S>, args: &[&str]) -> anyhow::Result<()> {
        let Some(target) = args.first() else {
            self.cwd = HOME.to_string();
            return Ok(());
        };
        let resolved = self.resolve(target);
        if path::is_drive_root(&resolved) {
            self.cwd = resolved;
            return Ok(());
        }
        match fs.read(&resolved)? {
            Some(rec) if rec.is_folder() => self.cwd = resolved,
            _ => self.err(NO_PATH),
        }
        Ok(())
    }

    fn dir<S: Store>(&mut self, fs: &VirtualFs<S>) -> anyhow::Result<()> {
        let entries = fs.list(&self.cwd)?;
        self.out(format!("Directory of {}", path::display(&self.cwd)));
        self.out("");
        if entries.is_empty() {
            self.out("File(s) not found.");
            return Ok(());
        }
        let (folders, files): (Vec<&FileRecord>, Vec<&FileRecord>) =
            entries.iter().partition(|f| f.is_folder());
        for folder in &folders {
            let line = format!("{}    <DIR>          {}", stamp(folder.modified), folder.name);
            self.out(line);
        }
        for file in &files {
            let line = format!("{}    {:>12} {}", stamp(file.modified), file.size, file.name);
            self.out(line);
        }
        self.out(format!("               {} File(s)", files.len()));
        self.out(format!("               {} Dir(s)", folders.len()));
        Ok(())
    }

    fn rm<S: Store>(&mut self, fs: &mut VirtualFs<S>, args: &[&str]) -> anyhow::Result<ShellOutcome> {
        let Some(name) = args.first() else {
            self.err(BAD_SYNTAX);
            return Ok(ShellOutcome::None);
        };
        let target = self.resolve(name);
        let Some(rec) = fs.read(&target)? else {
            self.err(format!("Could not find {name}"));
            return Ok(ShellOutcome::None);
        };
        if rec.is_folder() {
            self.err(BAD_DIR_NAME);
            return Ok(ShellOutcome::None);
        }

        let flag = ctf::flag_for_terminal_deletion(&target);
        fs.delete(&target)?;
        self.out(format!("File deleted: {name}"));
        match flag {
            Some(flag) => {
                tracing::info!(path = %target, "flag captured from terminal");
                self.out("");
                let banner = ctf::capture_banner(flag);
                self.out(banner[0].clone());
                self.out(banner[1].clone());
                self.out("");
                self.out(banner[2].clone());
                Ok(ShellOutcome::FlagCaptured(flag))
            }
            None => Ok(ShellOutcome::None),
        }
    }

    fn rmdir<S: Store>(
        &mut self,
        fs: &mut VirtualFs<S>,
        args: &[&str],
    ) -> anyhow::Result<ShellOutcome> {
        let Some(name) = args.first() else {
            self.err(BAD_SYNTAX);
            return Ok(ShellOutcome::None);
        };
        let target = self.resolve(name);
        let Some(rec) = fs.read(&target)? else {
            self.err(NO_PATH);
            return Ok(ShellOutcome::None);
        };
        if !rec.is_folder() {
            self.err(BAD_DIR_NAME);
            return Ok(ShellOutcome::None);
        }
        if ctf::is_system32_removal(&target) {
            tracing::warn!(path = %target, "System32 removal attempted");
            for line in ctf::CRASH_WARNING {
                self.err(line);
            }
            return Ok(ShellOutcome::CrashScheduled);
        }
        fs.delete(&target)?;
        self.out(format!("Directory removed: {name}"));
        Ok(ShellOutcome::None)
    }

    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = match self.history_index {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.history_index = Some(idx);
        self.input = self.history[idx].clone();
    }

    pub fn history_next(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 >= self.history.len() {
            self.history_index = None;
            self.input.clear();
        } else {
            self.history_index = Some(i + 1);
            self.input = self.history[i + 1].clone();
        }
    }
}

fn stamp(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%m/%d/%Y  %I:%M:%S %p").to_string())
        .unwrap_or_else(|| " ".repeat(24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn setup() -> (Shell, VirtualFs<MemoryStore>) {
        let mut fs = VirtualFs::new(MemoryStore::new());
        fs.initialize().unwrap();
        fs.write(ctf::FLAGGED_PATH, ctf::FLAGGED_CONTENT, "text/plain")
            .unwrap();
        (Shell::new(), fs)
    }

    fn texts(shell: &Shell) -> Vec<&str> {
        shell.lines().iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn starts_with_banner_in_home() {
        let shell = Shell::new();
        assert_eq!(shell.cwd(), HOME);
        assert_eq!(texts(&shell), BANNER.to_vec());
        assert_eq!(shell.prompt(), "C:/Users/Default> ");
    }

    #[test]
    fn cd_handles_relative_parent_and_absolute() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd Desktop");
        assert_eq!(shell.cwd(), "C:/Users/Default/Desktop");
        shell.execute(&mut fs, "cd ..");
        assert_eq!(shell.cwd(), HOME);
        shell.execute(&mut fs, "cd C:\\Windows\\System32");
        assert_eq!(shell.cwd(), "C:/Windows/System32");
        shell.execute(&mut fs, "cd ../../..");
        assert_eq!(shell.cwd(), "C:");
        assert_eq!(shell.prompt(), "C:/> ");
        shell.execute(&mut fs, "cd");
        assert_eq!(shell.cwd(), HOME);
    }

    #[test]
    fn cd_to_missing_or_file_reports_path_error() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd Nowhere");
        assert_eq!(shell.lines().last().unwrap().text, NO_PATH);
        shell.execute(&mut fs, "cd Desktop/Welcome.txt");
        assert_eq!(shell.lines().last().unwrap().kind, LineKind::Error);
        assert_eq!(shell.cwd(), HOME);
    }

    #[test]
    fn dir_lists_folders_then_files_with_counts() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd Desktop");
        fs.create_folder("C:/Users/Default/Desktop/Stuff").unwrap();
        shell.execute(&mut fs, "dir");
        let out = texts(&shell);
        assert!(out.contains(&"Directory of C:/Users/Default/Desktop"));
        let dir_line = out.iter().position(|l| l.ends_with("<DIR>          Stuff")).unwrap();
        let file_line = out.iter().position(|l| l.ends_with(" Welcome.txt")).unwrap();
        assert!(dir_line < file_line);
        assert!(out.contains(&"               1 File(s)"));
        assert!(out.contains(&"               1 Dir(s)"));
    }

    #[test]
    fn dir_on_empty_folder() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd C:/Temp");
        shell.execute(&mut fs, "ls");
        assert_eq!(shell.lines().last().unwrap().text, "File(s) not found.");
    }

    #[test]
    fn rm_flagged_file_prints_banner_and_deletes() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd C:/Windows/System32");
        let outcome = shell.execute(&mut fs, "del system_helper.dll");
        assert_eq!(outcome, ShellOutcome::FlagCaptured("ctf7{windows_sucks}"));
        let out = texts(&shell);
        assert!(out.contains(&"File deleted: system_helper.dll"));
        assert!(out.contains(&"🎉 CTF FLAG CAPTURED! 🎉"));
        assert!(out.contains(&"Flag: ctf7{windows_sucks}"));
        assert!(!fs.exists(ctf::FLAGGED_PATH).unwrap());
    }

    #[test]
    fn rm_ordinary_file_has_no_flag() {
        let (mut shell, mut fs) = setup();
        let outcome = shell.execute(&mut fs, "rm C:/Windows/System32/kernel32.dll");
        assert_eq!(outcome, ShellOutcome::None);
        assert!(!fs.exists("C:/Windows/System32/kernel32.dll").unwrap());
        assert!(!texts(&shell).iter().any(|l| l.contains("FLAG")));
    }

    #[test]
    fn rm_errors() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "rm");
        assert_eq!(shell.lines().last().unwrap().text, BAD_SYNTAX);
        shell.execute(&mut fs, "rm ghost.txt");
        assert_eq!(shell.lines().last().unwrap().text, "Could not find ghost.txt");
        shell.execute(&mut fs, "rm Desktop");
        assert_eq!(shell.lines().last().unwrap().text, BAD_DIR_NAME);
    }

    #[test]
    fn rmdir_system32_schedules_crash_without_deleting() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd C:/Windows");
        let outcome = shell.execute(&mut fs, "rmdir System32");
        assert_eq!(outcome, ShellOutcome::CrashScheduled);
        assert!(fs.exists("C:/Windows/System32").unwrap());
        assert!(texts(&shell).contains(&"SYSTEM CRASH IMMINENT"));
    }

    #[test]
    fn rmdir_system32_match_ignores_case() {
        let (mut shell, mut fs) = setup();
        fs.create_folder("C:/Temp/sYsTeM32").unwrap();
        shell.execute(&mut fs, "cd C:/Temp");
        let outcome = shell.execute(&mut fs, "rmdir sYsTeM32");
        assert_eq!(outcome, ShellOutcome::CrashScheduled);
        assert!(fs.exists("C:/Temp/sYsTeM32").unwrap());
    }

    #[test]
    fn rmdir_on_missing_system32_spelling_reports_no_path() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "cd C:/Windows");
        let outcome = shell.execute(&mut fs, "rmdir SYSTEM32");
        assert_eq!(outcome, ShellOutcome::None);
        assert_eq!(shell.lines().last().unwrap().text, NO_PATH);
    }

    #[test]
    fn rmdir_nested_folder_named_differently_just_deletes() {
        let (mut shell, mut fs) = setup();
        fs.create_folder("C:/Windows/System32/Logs").unwrap();
        let outcome = shell.execute(&mut fs, "rmdir C:/Windows/System32/Logs");
        assert_eq!(outcome, ShellOutcome::None);
        assert!(!fs.exists("C:/Windows/System32/Logs").unwrap());
        assert_eq!(shell.lines().last().unwrap().text, "Directory removed: C:/Windows/System32/Logs");
    }

    #[test]
    fn help_flag_and_unknown_command() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "rm --help");
        assert_eq!(shell.lines().last().unwrap().text, HELP[8]);
        shell.execute(&mut fs, "FORMAT c:");
        assert_eq!(
            shell.lines().last().unwrap().text,
            "'format' is not recognized as an internal or external command, operable program or batch file."
        );
    }

    #[test]
    fn echo_pwd_and_clear() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "echo hello   world");
        assert_eq!(shell.lines().last().unwrap().text, "hello world");
        shell.execute(&mut fs, "pwd");
        assert_eq!(shell.lines().last().unwrap().text, HOME);
        shell.execute(&mut fs, "cls");
        assert!(shell.lines().is_empty());
    }

    #[test]
    fn history_walks_back_and_forward() {
        let (mut shell, mut fs) = setup();
        shell.execute(&mut fs, "pwd");
        shell.execute(&mut fs, "dir");
        shell.history_prev();
        assert_eq!(shell.input, "dir");
        shell.history_prev();
        shell.history_prev();
        assert_eq!(shell.input, "pwd");
        shell.history_next();
        assert_eq!(shell.input, "dir");
        shell.history_next();
        assert_eq!(shell.input, "");
    }
}
