use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{SessionStorage, StorageError};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// All keys live in one JSON object file. Writes go to a temp file that is
/// renamed over the original, so a crash never leaves a half-written file.
pub struct FileStorage {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = self.path();
        if map.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
                debug!(path = %path.display(), "Removed empty session file");
            }
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(map)?;
        let tmp = self.dir.join(format!("{}.tmp", SESSION_FILE));
        write_private(&tmp, contents.as_bytes())?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The file holds a bearer token: owner read/write only where supported.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard();
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut map = match self.read_map() {
            Ok(map) => map,
            // A corrupt file cannot hold anything worth keeping.
            Err(StorageError::Corrupt(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        let removed = map.remove(key).is_some();
        if removed || map.is_empty() {
            self.write_map(&map)
        } else {
            Ok(())
        }
    }
}
