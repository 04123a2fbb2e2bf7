//! File Explorer navigation and file operations.

use super::path;
use super::store::{FileRecord, Store, VfsResult};
use super::vfs::VirtualFs;
use super::window::{AppKind, WindowData};

pub const DESKTOP_DIR: &str = "C:/Users/Default/Desktop";
pub const THIS_PC: &str = "C:";
pub const NEW_FOLDER_NAME: &str = "New Folder";
pub const ACCESS_DENIED: &str =
    "Access is denied.\nYou require permission from the computer's administrator to perform this action.";

/// What the caller should do after activating an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAction {
    None,
    Navigated,
    OpenWindow(AppKind, WindowData),
}

/// Result of a rename or paste. `replaced` is set when an entry already sat
/// at `dest` and was overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    pub dest: String,
    pub replaced: bool,
}

impl Moved {
    pub fn status(&self, verb: &str) -> String {
        let name = path::file_name(&self.dest);
        if self.replaced {
            format!("{verb} {name} (replaced existing item)")
        } else {
            format!("{verb} {name}")
        }
    }
}

/// First step of a delete: refuse outright or ask for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteRequest {
    Nothing,
    Denied(&'static str),
    Confirm { path: String, prompt: String },
}

#[derive(Debug, Clone)]
pub struct Explorer {
    current_path: String,
    entries: Vec<FileRecord>,
    pub selected: usize,
    pub scroll: usize,
    clipboard: Option<String>,
}

impl Explorer {
    pub fn new(initial_path: Option<&str>) -> Self {
        Self {
            current_path: path::normalize(initial_path.unwrap_or(DESKTOP_DIR)),
            entries: Vec::new(),
            selected: 0,
            scroll: 0,
            clipboard: None,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn entries(&self) -> &[FileRecord] {
        &self.entries
    }

    pub fn selected_entry(&self) -> Option<&FileRecord> {
        self.entries.get(self.selected)
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn refresh<S: Store>(&mut self, fs: &VirtualFs<S>) -> VfsResult<()> {
        self.entries = fs.list(&self.current_path)?;
        if self.selected >= self.entries.len() {
            self.selected = self.entries.len().saturating_sub(1);
        }
        Ok(())
    }

    pub fn navigate<S: Store>(&mut self, fs: &VirtualFs<S>, target: &str) -> VfsResult<()> {
        self.current_path = path::normalize(target);
        self.selected = 0;
        self.scroll = 0;
        self.refresh(fs)
    }

    pub fn go_desktop<S: Store>(&mut self, fs: &VirtualFs<S>) -> VfsResult<()> {
        self.navigate(fs, DESKTOP_DIR)
    }

    pub fn go_this_pc<S: Store>(&mut self, fs: &VirtualFs<S>) -> VfsResult<()> {
        self.navigate(fs, THIS_PC)
    }

    pub fn go_parent<S: Store>(&mut self, fs: &VirtualFs<S>) -> VfsResult<()> {
        if path::is_drive_root(&self.current_path) {
            return Ok(());
        }
        let parent = path::parent_of(&self.current_path);
        self.navigate(fs, &parent)
    }

    pub fn breadcrumbs(&self) -> Vec<(String, String)> {
        path::segments(&self.current_path)
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    /// Folders navigate; text files open Notepad, images open Paint.
    pub fn open_selected<S: Store>(&mut self, fs: &VirtualFs<S>) -> VfsResult<OpenAction> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(OpenAction::None);
        };
        if entry.is_folder() {
            self.navigate(fs, &entry.path)?;
            return Ok(OpenAction::Navigated);
        }
        let app = if entry.mime_starts_with("text/") {
            AppKind::Notepad
        } else if entry.mime_starts_with("image/") {
            AppKind::Paint
        } else {
            return Ok(OpenAction::None);
        };
        Ok(OpenAction::OpenWindow(
            app,
            WindowData::file(&entry.path, &entry.name),
        ))
    }

    pub fn request_delete(&self) -> DeleteRequest {
        let Some(entry) = self.selected_entry() else {
            return DeleteRequest::Nothing;
        };
        if self.current_path.contains("System32") {
            return DeleteRequest::Denied(ACCESS_DENIED);
        }
        DeleteRequest::Confirm {
            path: entry.path.clone(),
            prompt: format!("Are you sure you want to delete {}?", entry.name),
        }
    }

    /// Whether a confirmed deletion from this folder is eligible for the
    /// desktop flag check.
    pub fn deletes_count_for_flag(&self) -> bool {
        self.current_path.contains("Desktop")
    }

    pub fn rename_selected<S: Store>(
        &mut self,
        fs: &mut VirtualFs<S>,
        new_name: &str,
    ) -> VfsResult<Option<Moved>> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(None);
        };
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == entry.name {
            return Ok(None);
        }
        let dest = path::join(&path::parent_of(&entry.path), new_name);
        let replaced = fs.exists(&dest)?;
        fs.rename(&entry.path, new_name)?;
        self.refresh(fs)?;
        Ok(Some(Moved { dest, replaced }))
    }

    pub fn new_folder<S: Store>(&mut self, fs: &mut VirtualFs<S>) -> VfsResult<()> {
        let target = path::join(&self.current_path, NEW_FOLDER_NAME);
        fs.create_folder(&target)?;
        self.refresh(fs)
    }

    pub fn cut_selected(&mut self) -> Option<&str> {
        self.clipboard = self.selected_entry().map(|e| e.path.clone());
        self.clipboard.as_deref()
    }

    /// Move the cut entry into the current folder.
    pub fn paste<S: Store>(&mut self, fs: &mut VirtualFs<S>) -> VfsResult<Option<Moved>> {
        let Some(src) = self.clipboard.take() else {
            return Ok(None);
        };
        let dest = path::join(&self.current_path, path::file_name(&src));
        let replaced = src != dest && fs.exists(&dest)?;
        fs.move_path(&src, &dest)?;
        self.refresh(fs)?;
        Ok(Some(Moved { dest, replaced }))
    }
}

/// Size column: folders say so, files show kilobytes to one decimal.
pub fn size_label(rec: &FileRecord) -> String {
    if rec.is_folder() {
        "Folder".to_string()
    } else {
        format!("{:.1} KB", rec.size as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ctf;
    use crate::core::store::{MemoryStore, VfsError};

    fn fs() -> VirtualFs<MemoryStore> {
        let mut fs = VirtualFs::new(MemoryStore::new());
        fs.initialize().unwrap();
        fs.write(ctf::FLAGGED_PATH, ctf::FLAGGED_CONTENT, "text/plain")
            .unwrap();
        fs
    }

    #[test]
    fn starts_on_desktop_and_lists_it() {
        let fs = fs();
        let mut ex = Explorer::new(None);
        ex.refresh(&fs).unwrap();
        assert_eq!(ex.current_path(), DESKTOP_DIR);
        assert!(ex.entries().iter().any(|e| e.name == "Welcome.txt"));
    }

    #[test]
    fn this_pc_and_parent_navigation() {
        let fs = fs();
        let mut ex = Explorer::new(Some("C:/Windows"));
        ex.go_parent(&fs).unwrap();
        assert_eq!(ex.current_path(), "C:");
        assert!(ex.entries().iter().any(|e| e.name == "Program Files"));
        ex.go_parent(&fs).unwrap();
        assert_eq!(ex.current_path(), "C:");
        ex.go_desktop(&fs).unwrap();
        ex.go_this_pc(&fs).unwrap();
        assert_eq!(ex.breadcrumbs(), vec![("C:".to_string(), "C:".to_string())]);
    }

    #[test]
    fn open_routes_by_kind() {
        let mut fs = fs();
        fs.write(
            "C:/Users/Default/Desktop/pic.png",
            vec![1u8, 2, 3],
            "image/png",
        )
        .unwrap();
        fs.write("C:/Users/Default/Desktop/blob.bin", vec![0u8], "application/octet-stream")
            .unwrap();
        let mut ex = Explorer::new(None);
        ex.refresh(&fs).unwrap();

        let find = |ex: &Explorer, name: &str| {
            ex.entries().iter().position(|e| e.name == name).unwrap()
        };
        ex.selected = find(&ex, "pic.png");
        assert_eq!(
            ex.open_selected(&fs).unwrap(),
            OpenAction::OpenWindow(
                AppKind::Paint,
                WindowData::file("C:/Users/Default/Desktop/pic.png", "pic.png")
            )
        );
        ex.selected = find(&ex, "Welcome.txt");
        assert!(matches!(
            ex.open_selected(&fs).unwrap(),
            OpenAction::OpenWindow(AppKind::Notepad, _)
        ));
        ex.selected = find(&ex, "blob.bin");
        assert_eq!(ex.open_selected(&fs).unwrap(), OpenAction::None);
    }

    #[test]
    fn delete_in_system32_is_denied() {
        let fs = fs();
        let mut ex = Explorer::new(Some("C:/Windows/System32"));
        ex.refresh(&fs).unwrap();
        assert_eq!(ex.request_delete(), DeleteRequest::Denied(ACCESS_DENIED));
    }

    #[test]
    fn delete_elsewhere_asks_for_confirmation() {
        let fs = fs();
        let mut ex = Explorer::new(None);
        ex.refresh(&fs).unwrap();
        match ex.request_delete() {
            DeleteRequest::Confirm { prompt, .. } => {
                assert_eq!(prompt, "Are you sure you want to delete Welcome.txt?")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ex.deletes_count_for_flag());
    }

    #[test]
    fn cut_and_paste_moves_flagged_file_to_desktop() {
        let mut fs = fs();
        let mut ex = Explorer::new(Some("C:/Windows/System32"));
        ex.refresh(&fs).unwrap();
        ex.selected = ex
            .entries()
            .iter()
            .position(|e| e.name == ctf::FLAGGED_NAME)
            .unwrap();
        assert_eq!(ex.cut_selected(), Some(ctf::FLAGGED_PATH));
        ex.go_desktop(&fs).unwrap();
        let dest = ex.paste(&mut fs).unwrap().unwrap().dest;
        assert_eq!(dest, "C:/Users/Default/Desktop/system_helper.dll");
        assert!(fs.exists(&dest).unwrap());
        assert!(!fs.exists(ctf::FLAGGED_PATH).unwrap());
        assert_eq!(ex.paste(&mut fs).unwrap(), None);
    }

    #[test]
    fn paste_of_vanished_source_fails() {
        let mut fs = fs();
        let mut ex = Explorer::new(None);
        ex.refresh(&fs).unwrap();
        ex.cut_selected();
        fs.delete(&ex.clipboard().unwrap().to_string()).unwrap();
        ex.go_this_pc(&fs).unwrap();
        assert!(matches!(ex.paste(&mut fs), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn rename_and_new_folder() {
        let mut fs = fs();
        let mut ex = Explorer::new(Some("C:/Temp"));
        ex.new_folder(&mut fs).unwrap();
        assert_eq!(ex.entries()[0].name, NEW_FOLDER_NAME);
        ex.selected = 0;
        let moved = ex.rename_selected(&mut fs, "Reports").unwrap().unwrap();
        assert_eq!(moved.dest, "C:/Temp/Reports");
        assert!(!moved.replaced);
        assert!(fs.exists("C:/Temp/Reports").unwrap());
        assert_eq!(ex.rename_selected(&mut fs, "Reports").unwrap(), None);
    }

    #[test]
    fn rename_over_existing_file_is_reported() {
        let mut fs = fs();
        fs.write("C:/Temp/a.txt", "a", "text/plain").unwrap();
        fs.write("C:/Temp/b.txt", "b", "text/plain").unwrap();
        let mut ex = Explorer::new(Some("C:/Temp"));
        ex.refresh(&fs).unwrap();
        ex.selected = ex.entries().iter().position(|e| e.name == "a.txt").unwrap();
        let moved = ex.rename_selected(&mut fs, "b.txt").unwrap().unwrap();
        assert!(moved.replaced);
        assert_eq!(moved.status("Renamed to"), "Renamed to b.txt (replaced existing item)");
        assert_eq!(fs.read("C:/Temp/b.txt").unwrap().unwrap().text(), Some("a"));
    }

    #[test]
    fn paste_over_existing_file_is_reported() {
        let mut fs = fs();
        fs.write("C:/Temp/note.txt", "new", "text/plain").unwrap();
        fs.write("C:/Users/Default/Documents/note.txt", "old", "text/plain").unwrap();
        let mut ex = Explorer::new(Some("C:/Temp"));
        ex.refresh(&fs).unwrap();
        ex.selected = ex.entries().iter().position(|e| e.name == "note.txt").unwrap();
        ex.cut_selected();
        ex.navigate(&fs, "C:/Users/Default/Documents").unwrap();
        let moved = ex.paste(&mut fs).unwrap().unwrap();
        assert!(moved.replaced);
        assert_eq!(fs.read(&moved.dest).unwrap().unwrap().text(), Some("new"));
    }

    #[test]
    fn size_label_formats_kilobytes() {
        let fs = fs();
        let rec = fs.read(ctf::FLAGGED_PATH).unwrap().unwrap();
        assert_eq!(size_label(&rec), format!("{:.1} KB", rec.size as f64 / 1024.0));
        let folder = fs.read("C:/Temp").unwrap().unwrap();
        assert_eq!(size_label(&folder), "Folder");
    }
}
