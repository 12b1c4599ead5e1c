//! Durable storage for client-side state.
//!
//! Each store writes one small JSON document under a key. Writes happen while
//! the store holds its lock, so implementations should be quick and must not
//! call back into the store.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;

pub trait StatePersistence: Send + Sync {
    /// `Ok(None)` when nothing has been saved under `key` yet.
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, contents: &str) -> Result<()>;
}

/// One `<key>.json` file per store inside a per-installation directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StatePersistence for JsonFilePersistence {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        // rename is atomic on the same filesystem, so readers never see a torn file
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// Keeps everything in memory. State is lost with the process.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatePersistence for MemoryPersistence {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs.get(key).cloned())
    }

    fn save(&self, key: &str, contents: &str) -> Result<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        docs.insert(key.to_string(), contents.to_string());
        Ok(())
    }
}
