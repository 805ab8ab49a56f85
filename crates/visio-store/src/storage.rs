//! On-disk snapshot of the chat store
//!
//! The whole store is one pretty-printed JSON document, replaced atomically
//! on every save. Dates are ISO-8601 strings on disk.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use visio_protocol::{Chat, ChatId, Folder};

use crate::StoreError;

const STORE_FILE: &str = "chats.json";

/// Everything the store persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub chats: Vec<Chat>,
    #[serde(default)]
    pub current_chat_id: Option<ChatId>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// Default snapshot location: `~/.visio/chats.json`, falling back to the XDG
/// data dir when there is no home directory
pub fn default_store_path() -> io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .map(|h| h.join(".visio"))
        .or_else(|| dirs::data_dir().map(|d| d.join("visio")))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No home or data dir"))?;

    Ok(base_dir.join(STORE_FILE))
}

/// File-backed persistence for a [`StoreSnapshot`]
#[derive(Debug, Clone)]
pub struct ChatStorage {
    path: PathBuf,
}

impl ChatStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty one if the file does not exist yet
    pub fn load(&self) -> Result<StoreSnapshot, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no store file yet, starting empty");
                return Ok(StoreSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(StoreSnapshot::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(snapshot)?;
        atomic_write(&self.path, &content)?;
        tracing::debug!(
            path = %self.path.display(),
            chats = snapshot.chats.len(),
            "saved chat store"
        );
        Ok(())
    }
}

/// Write content atomically: temp file → fsync → rename.
///
/// The target is either fully written or unchanged on crash.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(parent)?;

    // Temp file must live in the same directory for the rename to be atomic
    let temp_path = path.with_file_name(format!(
        ".{}.tmp.{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id()
    ));

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/chats.json");

        atomic_write(&path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_no_temp_file_left_on_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let storage = ChatStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.load().unwrap(), StoreSnapshot::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.json");
        fs::write(&path, "not json").unwrap();

        let err = ChatStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
