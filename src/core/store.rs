//! Path-keyed record store backing the virtual file system.
//!
//! Two collections live side by side: file records keyed by normalized path,
//! and free-form settings keyed by name. Each call touches a single key; there
//! is no transaction spanning several calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::path::normalize;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("FileSystem not initialized")]
    NotInitialized,
    #[error("Source file not found: {0}")]
    NotFound(String),
    #[error("cannot move {src} into itself ({dest})")]
    InvalidMove { src: String, dest: String },
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image codec failed: {0}")]
    Image(String),
}

pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    File,
    Folder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum FileContent {
    Text(String),
    Binary(#[serde(with = "hex_bytes")] Vec<u8>),
}

impl FileContent {
    pub fn len(&self) -> u64 {
        match self {
            FileContent::Text(s) => s.len() as u64,
            FileContent::Binary(b) => b.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(b: Vec<u8>) -> Self {
        FileContent::Binary(b)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FileContent>,
    pub size: u64,
    pub created: i64,
    pub modified: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(FileContent::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Some(FileContent::Binary(b)) => Some(b),
            _ => None,
        }
    }

    pub fn mime_starts_with(&self, prefix: &str) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.starts_with(prefix))
            .unwrap_or(false)
    }
}

pub trait Store {
    fn get(&self, path: &str) -> VfsResult<Option<FileRecord>>;
    fn put(&mut self, record: FileRecord) -> VfsResult<()>;
    fn delete(&mut self, path: &str) -> VfsResult<()>;
    fn get_all(&self) -> VfsResult<Vec<FileRecord>>;
    fn get_setting(&self, key: &str) -> VfsResult<Option<Value>>;
    fn set_setting(&mut self, key: &str, value: Value) -> VfsResult<()>;
}

/// In-memory store. Also the on-disk document layout for [`JsonFileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    files: BTreeMap<String, FileRecord>,
    #[serde(default)]
    settings: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &str) -> VfsResult<Option<FileRecord>> {
        Ok(self.files.get(&normalize(path)).cloned())
    }

    fn put(&mut self, mut record: FileRecord) -> VfsResult<()> {
        record.path = normalize(&record.path);
        self.files.insert(record.path.clone(), record);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> VfsResult<()> {
        self.files.remove(&normalize(path));
        Ok(())
    }

    fn get_all(&self) -> VfsResult<Vec<FileRecord>> {
        Ok(self.files.values().cloned().collect())
    }

    fn get_setting(&self, key: &str) -> VfsResult<Option<Value>> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: Value) -> VfsResult<()> {
        self.settings.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as one JSON document. Every mutation rewrites the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> VfsResult<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            MemoryStore::new()
        };
        tracing::debug!(path = %path.display(), records = inner.len(), "opened file store");
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> VfsResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.inner)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn get(&self, path: &str) -> VfsResult<Option<FileRecord>> {
        self.inner.get(path)
    }

    fn put(&mut self, record: FileRecord) -> VfsResult<()> {
        self.inner.put(record)?;
        self.flush()
    }

    fn delete(&mut self, path: &str) -> VfsResult<()> {
        self.inner.delete(path)?;
        self.flush()
    }

    fn get_all(&self) -> VfsResult<Vec<FileRecord>> {
        self.inner.get_all()
    }

    fn get_setting(&self, key: &str) -> VfsResult<Option<Value>> {
        self.inner.get_setting(key)
    }

    fn set_setting(&mut self, key: &str, value: Value) -> VfsResult<()> {
        self.inner.set_setting(key, value)?;
        self.flush()
    }
}
