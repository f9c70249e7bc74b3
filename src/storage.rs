//! Client-local persistence of the chat session list.
//!
//! The whole list is read and replaced as one document. There is no
//! partial update and a single process is expected to write the store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::observability::{STORE_ERRORS, STORE_LOADS, STORE_SAVES};
use crate::types::ChatSession;

/// Name of the file holding the session list.
pub const STORE_FILE_NAME: &str = "apex_ai_chats.json";

/// Durable storage for the ordered (most-recent-first) session list.
pub trait ChatStore: Send + Sync {
    /// Reads the persisted list; an empty list when nothing was stored.
    fn load(&self) -> Result<Vec<ChatSession>>;

    /// Replaces the persisted list with `sessions`.
    fn save(&self, sessions: &[ChatSession]) -> Result<()>;
}

/// Stores the session list as a JSON file.
///
/// Saves go to a sibling temporary file that is renamed over the target, so
/// readers see either the old or the new list.
#[derive(Debug, Clone)]
pub struct FileChatStore {
    path: PathBuf,
}

impl FileChatStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `<data dir>/apex-rag/apex_ai_chats.json`.
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::persistence("could not determine the data directory", None))?;
        Ok(Self::new(data_dir.join("apex-rag").join(STORE_FILE_NAME)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)
    }
}

impl ChatStore for FileChatStore {
    fn load(&self) -> Result<Vec<ChatSession>> {
        STORE_LOADS.click();
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                STORE_ERRORS.click();
                return Err(Error::persistence(
                    format!("failed to read {}", self.path.display()),
                    Some(Box::new(err)),
                ));
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|err| {
            STORE_ERRORS.click();
            Error::serialization(
                format!("failed to parse {}", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }

    fn save(&self, sessions: &[ChatSession]) -> Result<()> {
        STORE_SAVES.click();
        let bytes = serde_json::to_vec(sessions)?;
        self.write_atomically(&bytes).map_err(|err| {
            STORE_ERRORS.click();
            Error::persistence(
                format!("failed to write {}", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }
}

/// Keeps the session list in memory, for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    sessions: Mutex<Option<Vec<ChatSession>>>,
}

impl MemoryChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `sessions`.
    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        Self {
            sessions: Mutex::new(Some(sessions)),
        }
    }

    /// Returns true once anything has been saved or seeded.
    pub fn is_populated(&self) -> bool {
        self.sessions
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl ChatStore for MemoryChatStore {
    fn load(&self) -> Result<Vec<ChatSession>> {
        STORE_LOADS.click();
        let guard = self
            .sessions
            .lock()
            .map_err(|_| Error::persistence("memory store lock poisoned", None))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, sessions: &[ChatSession]) -> Result<()> {
        STORE_SAVES.click();
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| Error::persistence("memory store lock poisoned", None))?;
        *guard = Some(sessions.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentKey, Message};
    use time::macros::datetime;

    fn session(id: &str) -> ChatSession {
        ChatSession::new(id, AgentKey::General, datetime!(2024-01-01 0:00:00 UTC))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().join("nested").join(STORE_FILE_NAME));
        let mut first = session("chat_2_b");
        first.last_message = Some(Message::user("hola"));
        let sessions = vec![first, session("chat_1_a")];
        store.save(&sessions).unwrap();
        assert_eq!(store.load().unwrap(), sessions);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_replaces_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().join(STORE_FILE_NAME));
        store.save(&[session("a"), session("b")]).unwrap();
        store.save(&[session("c")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "c");
    }

    #[test]
    fn corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        fs::write(&path, "{not json").unwrap();
        let err = FileChatStore::new(path).load().unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn memory_store() {
        let store = MemoryChatStore::new();
        assert!(!store.is_populated());
        assert!(store.load().unwrap().is_empty());
        store.save(&[session("x")]).unwrap();
        assert!(store.is_populated());
        assert_eq!(store.load().unwrap()[0].id, "x");
    }
}
