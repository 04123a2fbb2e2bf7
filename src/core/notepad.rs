//! Plain-text editor buffer behind the Notepad window.

use super::store::{Store, VfsResult};
use super::vfs::VirtualFs;

pub const NO_PATH_ERROR: &str = "Cannot save: No file path specified";
pub const SAVED: &str = "File saved successfully";

#[derive(Debug, Clone)]
pub struct Notepad {
    pub file_path: Option<String>,
    lines: Vec<String>,
    row: usize,
    col: usize,
    dirty: bool,
}

impl Notepad {
    pub fn new(file_path: Option<String>) -> Self {
        Self {
            file_path,
            lines: vec![String::new()],
            row: 0,
            col: 0,
            dirty: false,
        }
    }

    /// Open on `file_path`, loading its text if the file holds any.
    pub fn open<S: Store>(fs: &VirtualFs<S>, file_path: Option<String>) -> VfsResult<Self> {
        let mut pad = Self::new(file_path);
        if let Some(path) = pad.file_path.clone() {
            if let Some(text) = fs.read(&path)?.as_ref().and_then(|r| r.text()) {
                pad.set_text(text);
            }
        }
        Ok(pad)
    }

    fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = 0;
        self.col = 0;
        self.dirty = false;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn byte_col(&self) -> usize {
        let line = &self.lines[self.row];
        line.char_indices()
            .nth(self.col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    fn line_chars(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_col();
        self.lines[self.row].insert(at, ch);
        self.col += 1;
        self.dirty = true;
    }

    pub fn newline(&mut self) {
        let at = self.byte_col();
        let rest = self.lines[self.row].split_off(at);
        self.row += 1;
        self.lines.insert(self.row, rest);
        self.col = 0;
        self.dirty = true;
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let at = self.byte_col();
            self.lines[self.row].remove(at);
            self.dirty = true;
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_chars(self.row);
            self.lines[self.row].push_str(&line);
            self.dirty = true;
        }
    }

    pub fn left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_chars(self.row);
        }
    }

    pub fn right(&mut self) {
        if self.col < self.line_chars(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_chars(self.row));
        }
    }

    pub fn down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_chars(self.row));
        }
    }

    pub fn home(&mut self) {
        self.col = 0;
    }

    pub fn end(&mut self) {
        self.col = self.line_chars(self.row);
    }

    /// Save the buffer. `Ok(false)` when there is no file path to save to.
    pub fn save<S: Store>(&mut self, fs: &mut VirtualFs<S>) -> VfsResult<bool> {
        let Some(path) = self.file_path.as_deref() else {
            return Ok(false);
        };
        fs.write(path, self.text(), "text/plain")?;
        self.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::vfs::WELCOME_PATH;

    fn fs() -> VirtualFs<MemoryStore> {
        let mut fs = VirtualFs::new(MemoryStore::new());
        fs.initialize().unwrap();
        fs
    }

    #[test]
    fn open_loads_text_lines() {
        let fs = fs();
        let pad = Notepad::open(&fs, Some(WELCOME_PATH.to_string())).unwrap();
        assert!(pad.lines()[0].starts_with("Welcome to Windows 11"));
        assert!(!pad.is_dirty());
    }

    #[test]
    fn editing_marks_dirty_and_save_clears() {
        let mut fs = fs();
        fs.write("C:/Temp/n.txt", "ab", "text/plain").unwrap();
        let mut pad = Notepad::open(&fs, Some("C:/Temp/n.txt".into())).unwrap();
        pad.end();
        pad.insert_char('c');
        pad.newline();
        pad.insert_char('é');
        assert!(pad.is_dirty());
        assert!(pad.save(&mut fs).unwrap());
        assert!(!pad.is_dirty());
        assert_eq!(
            fs.read("C:/Temp/n.txt").unwrap().unwrap().text(),
            Some("abc\né")
        );
    }

    #[test]
    fn backspace_joins_lines() {
        let mut pad = Notepad::new(None);
        for ch in "hi".chars() {
            pad.insert_char(ch);
        }
        pad.newline();
        pad.insert_char('x');
        pad.home();
        pad.backspace();
        assert_eq!(pad.text(), "hix");
        assert_eq!(pad.cursor(), (0, 2));
    }

    #[test]
    fn save_without_path_is_rejected() {
        let mut fs = fs();
        let mut pad = Notepad::new(None);
        pad.insert_char('z');
        assert!(!pad.save(&mut fs).unwrap());
        assert!(pad.is_dirty());
    }

    #[test]
    fn cursor_motion_wraps_between_lines() {
        let mut pad = Notepad::new(None);
        pad.insert_char('a');
        pad.newline();
        pad.insert_char('b');
        pad.home();
        pad.left();
        assert_eq!(pad.cursor(), (0, 1));
        pad.right();
        assert_eq!(pad.cursor(), (1, 0));
    }
}
