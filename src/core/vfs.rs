//! Virtual file system service over a [`Store`].

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::path::{self, normalize, parent_of};
use super::store::{FileContent, FileKind, FileRecord, Store, VfsError, VfsResult};

pub type Clock = Box<dyn Fn() -> i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = (SubscriptionId, Box<dyn FnMut()>);

const DEFAULT_FOLDERS: &[&str] = &[
    "C:/Windows",
    "C:/Windows/System32",
    "C:/Windows/SysWOW64",
    "C:/Windows/System",
    "C:/Windows/Temp",
    "C:/Windows/Logs",
    "C:/Windows/Fonts",
    "C:/Windows/Media",
    "C:/Windows/Resources",
    "C:/Windows/Boot",
    "C:/Windows/Prefetch",
    "C:/Users",
    "C:/Users/Default",
    "C:/Users/Default/Desktop",
    "C:/Users/Default/Documents",
    "C:/Users/Default/Downloads",
    "C:/Users/Default/Pictures",
    "C:/Users/Default/Music",
    "C:/Users/Default/Videos",
    "C:/Users/Default/AppData",
    "C:/Users/Default/AppData/Local",
    "C:/Users/Default/AppData/Roaming",
    "C:/Users/Public",
    "C:/Users/Public/Documents",
    "C:/Users/Public/Desktop",
    "C:/Users/Administrator",
    "C:/Program Files",
    "C:/Program Files/Common Files",
    "C:/Program Files/Internet Explorer",
    "C:/Program Files/Windows Defender",
    "C:/Program Files/Windows Media Player",
    "C:/Program Files/Microsoft Office",
    "C:/Program Files/Adobe",
    "C:/Program Files/Mozilla Firefox",
    "C:/Program Files/Google",
    "C:/Program Files/7-Zip",
    "C:/Program Files (x86)",
    "C:/Program Files (x86)/Common Files",
    "C:/Program Files (x86)/Internet Explorer",
    "C:/Program Files (x86)/Microsoft",
    "C:/ProgramData",
    "C:/ProgramData/Microsoft",
    "C:/ProgramData/Package Cache",
    "C:/Temp",
    "C:/Quarantine",
];

const SYSTEM32_FILES: &[&str] = &[
    "kernel32.dll", "ntdll.dll", "user32.dll", "advapi32.dll", "gdi32.dll", "shell32.dll",
    "ole32.dll", "msvcrt.dll", "ws2_32.dll", "rpcrt4.dll", "comctl32.dll", "comdlg32.dll",
    "wininet.dll", "crypt32.dll", "winspool.drv", "imm32.dll", "oleaut32.dll", "setupapi.dll",
    "version.dll", "shlwapi.dll", "winmm.dll", "secur32.dll", "bcrypt.dll", "ncrypt.dll",
    "kernelbase.dll", "ucrtbase.dll", "msvcp_win.dll", "netapi32.dll", "samsrv.dll",
    "lsasrv.dll", "wldap32.dll", "dnsapi.dll", "iphlpapi.dll", "userenv.dll", "powrprof.dll",
    "wintrust.dll", "imagehlp.dll", "psapi.dll", "dbghelp.dll", "winhttp.dll",
    "bcryptprimitives.dll", "cryptsp.dll", "rsaenh.dll", "ncryptsslp.dll", "mpr.dll",
    "winsta.dll", "winscard.dll", "credui.dll", "webio.dll", "xmllite.dll", "propsys.dll",
    "dwmapi.dll", "uxtheme.dll", "d3d11.dll", "dxgi.dll", "d2d1.dll", "gdiplus.dll",
    "windowscodecs.dll", "mf.dll", "mfplat.dll", "avrt.dll", "audioses.dll", "mmdevapi.dll",
    "wdmaud.drv", "ksuser.dll", "cfgmgr32.dll", "devobj.dll", "wtsapi32.dll", "profapi.dll",
    "authz.dll", "sechost.dll", "ntasn1.dll", "msasn1.dll", "cabinet.dll", "msi.dll",
];

const WINDOWS_FILES: &[&str] = &[
    "C:/Windows/win.ini",
    "C:/Windows/system.ini",
    "C:/Windows/notepad.exe",
    "C:/Windows/regedit.exe",
    "C:/Windows/explorer.exe",
];

pub const WELCOME_PATH: &str = "C:/Users/Default/Desktop/Welcome.txt";
const WELCOME_TEXT: &str = "Welcome to Windows 11 CTF Training Environment!\n\n\
This is a safe, terminal-based simulation.\n\n\
Objective: Find and eliminate the threat hidden in the system.\n\n\
Hint: Check Windows Security for suspicious activity.";

pub struct VirtualFs<S: Store> {
    store: S,
    ready: bool,
    clock: Clock,
    listeners: HashMap<String, Vec<Listener>>,
    next_subscription: u64,
}

impl<S: Store> VirtualFs<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Box::new(|| chrono::Utc::now().timestamp_millis()))
    }

    pub fn with_clock(store: S, clock: Clock) -> Self {
        Self {
            store,
            ready: false,
            clock,
            listeners: HashMap::new(),
            next_subscription: 1,
        }
    }

    /// Mark the file system ready and seed the default tree into an empty store.
    pub fn initialize(&mut self) -> VfsResult<()> {
        self.ready = true;
        if self.store.get_all()?.is_empty() {
            tracing::info!("seeding default file system");
            self.seed_default_tree()?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn seed_default_tree(&mut self) -> VfsResult<()> {
        for folder in DEFAULT_FOLDERS {
            self.create_folder(folder)?;
        }
        for name in SYSTEM32_FILES {
            self.write(
                &format!("C:/Windows/System32/{name}"),
                format!("// {name}\n// System library file\n// Version 10.0.22000.1"),
                "text/plain",
            )?;
        }
        for file in WINDOWS_FILES {
            let name = path::file_name(file);
            self.write(file, format!("// {name}\n// Windows system file"), "text/plain")?;
        }
        self.write(
            "C:/Program Files/Windows Defender/MpCmdRun.exe",
            "// Windows Defender Command Line Utility",
            "text/plain",
        )?;
        self.write(WELCOME_PATH, WELCOME_TEXT, "text/plain")?;
        self.write(
            "C:/Users/Default/Documents/README.txt",
            "User documents folder",
            "text/plain",
        )?;
        Ok(())
    }

    fn ensure_ready(&self) -> VfsResult<()> {
        if self.ready {
            Ok(())
        } else {
            Err(VfsError::NotInitialized)
        }
    }

    /// Immediate children of `dir`, folders first then by name.
    pub fn list(&self, dir: &str) -> VfsResult<Vec<FileRecord>> {
        self.ensure_ready()?;
        let dir = normalize(dir);
        let mut entries: Vec<FileRecord> = self
            .store
            .get_all()?
            .into_iter()
            .filter(|f| parent_of(&f.path) == dir)
            .collect();
        entries.sort_by(|a, b| match (a.is_folder(), b.is_folder()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });
        Ok(entries)
    }

    pub fn read(&self, path: &str) -> VfsResult<Option<FileRecord>> {
        self.ensure_ready()?;
        self.store.get(&normalize(path))
    }

    pub fn stat(&self, path: &str) -> VfsResult<Option<FileRecord>> {
        self.read(path)
    }

    pub fn exists(&self, path: &str) -> VfsResult<bool> {
        Ok(self.read(path)?.is_some())
    }

    pub fn write(
        &mut self,
        path: &str,
        content: impl Into<FileContent>,
        mime_type: &str,
    ) -> VfsResult<()> {
        self.ensure_ready()?;
        let path = normalize(path);
        let content = content.into();
        let now = (self.clock)();
        let created = self.store.get(&path)?.map(|f| f.created).unwrap_or(now);
        let record = FileRecord {
            name: path::file_name(&path).to_string(),
            path: path.clone(),
            kind: FileKind::File,
            size: content.len(),
            content: Some(content),
            created,
            modified: now,
            mime_type: Some(mime_type.to_string()),
        };
        self.store.put(record)?;
        tracing::debug!(%path, "wrote file");
        self.notify(&path);
        Ok(())
    }

    pub fn create_folder(&mut self, path: &str) -> VfsResult<()> {
        self.ensure_ready()?;
        let path = normalize(path);
        let now = (self.clock)();
        self.store.put(FileRecord {
            name: path::file_name(&path).to_string(),
            path: path.clone(),
            kind: FileKind::Folder,
            content: None,
            size: 0,
            created: now,
            modified: now,
            mime_type: None,
        })?;
        self.notify(&path);
        Ok(())
    }

    /// Delete a record; folders take every descendant with them.
    pub fn delete(&mut self, path: &str) -> VfsResult<()> {
        self.ensure_ready()?;
        let path = normalize(path);
        let Some(record) = self.store.get(&path)? else {
            return Ok(());
        };
        if record.is_folder() {
            let doomed = self.descendants(&path)?;
            tracing::debug!(%path, descendants = doomed.len(), "deleting folder");
            for child in doomed {
                self.store.delete(&child.path)?;
            }
        }
        self.store.delete(&path)?;
        self.notify(&path);
        Ok(())
    }

    /// Relocate a record and, for folders, its subtree.
    ///
    /// The full set of affected records is collected before anything is
    /// written. Writes then happen one key at a time; a failure midway leaves
    /// both copies of whatever was already staged.
    pub fn move_path(&mut self, src: &str, dest: &str) -> VfsResult<()> {
        self.ensure_ready()?;
        let src = normalize(src);
        let dest = normalize(dest);
        let record = self
            .store
            .get(&src)?
            .ok_or_else(|| VfsError::NotFound(src.clone()))?;
        if src == dest {
            return Ok(());
        }
        if record.is_folder() && path::is_descendant(&dest, &src) {
            return Err(VfsError::InvalidMove { src, dest });
        }

        let now = (self.clock)();
        let children = if record.is_folder() {
            self.descendants(&src)?
        } else {
            Vec::new()
        };

        let moved = FileRecord {
            name: path::file_name(&dest).to_string(),
            path: dest.clone(),
            modified: now,
            ..record
        };
        self.store.put(moved)?;
        for child in &children {
            let rebased = FileRecord {
                path: path::rebase(&child.path, &src, &dest),
                modified: now,
                ..child.clone()
            };
            self.store.put(rebased)?;
        }
        for child in &children {
            self.store.delete(&child.path)?;
        }
        self.store.delete(&src)?;

        tracing::debug!(%src, %dest, descendants = children.len(), "moved");
        self.notify(&src);
        self.notify(&dest);
        Ok(())
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> VfsResult<()> {
        let path = normalize(path);
        let dest = path::join(&parent_of(&path), new_name);
        self.move_path(&path, &dest)
    }

    fn descendants(&self, dir: &str) -> VfsResult<Vec<FileRecord>> {
        Ok(self
            .store
            .get_all()?
            .into_iter()
            .filter(|f| path::is_descendant(&f.path, dir))
            .collect())
    }

    pub fn get_setting(&self, key: &str) -> VfsResult<Option<Value>> {
        self.ensure_ready()?;
        self.store.get_setting(key)
    }

    pub fn set_setting(&mut self, key: &str, value: Value) -> VfsResult<()> {
        self.ensure_ready()?;
        self.store.set_setting(key, value)
    }

    /// Register `callback` for changes at `path` or directly inside it.
    pub fn on_change(&mut self, path: &str, callback: impl FnMut() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners
            .entry(normalize(path))
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for callbacks in self.listeners.values_mut() {
            callbacks.retain(|(sub, _)| *sub != id);
        }
        self.listeners.retain(|_, callbacks| !callbacks.is_empty());
    }

    fn notify(&mut self, path: &str) {
        let parent = parent_of(path);
        let keys = [path, parent.as_str()];
        // The root is its own parent.
        let count = if parent == path { 1 } else { 2 };
        for key in &keys[..count] {
            if let Some(callbacks) = self.listeners.get_mut(*key) {
                for (_, cb) in callbacks.iter_mut() {
                    cb();
                }
            }
        }
    }
}
