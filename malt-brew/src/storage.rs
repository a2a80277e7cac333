//! Storage collaborator for handlers
//!
//! Handlers persist bodies and attachments through [`Storage`]; the
//! pipeline itself never touches storage. Saving under an existing name
//! overwrites it.

use malt_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Named binary storage
pub trait Storage: Send + Sync {
    /// Store `content` under `name`, replacing any previous content
    fn save(&self, name: &str, content: &[u8]) -> Result<String>;

    fn exists(&self, name: &str) -> Result<bool>;

    fn delete(&self, name: &str) -> Result<()>;

    /// Public URL of a stored name
    fn url(&self, name: &str) -> String;
}

/// Reject names that are empty, absolute, or climb out of the storage root
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("empty storage name".to_string()));
    }
    let safe = Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !safe {
        return Err(Error::InvalidInput(format!("unsafe storage name: {}", name)));
    }
    Ok(())
}

fn join_url(base_url: &str, name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}

/// Files on the local disk
pub struct LocalStorage {
    location: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Store under `location`, served from `base_url`
    pub fn new(location: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            base_url: base_url.into(),
        }
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.location.join(name))
    }
}

impl Storage for LocalStorage {
    fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Stored file");
        Ok(name.to_string())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path(name)?.is_file())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(Error::NotFound(name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn url(&self, name: &str) -> String {
        join_url(&self.base_url, name)
    }
}

/// In-process storage for tests and dry runs
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    base_url: String,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            base_url: base_url.into(),
        }
    }

    fn files(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| Error::Internal("storage lock poisoned".to_string()))
    }

    /// Content stored under `name`
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files().ok()?.get(name).cloned()
    }

    /// Every stored name, sorted
    pub fn names(&self) -> Vec<String> {
        self.files()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Storage for MemoryStorage {
    fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        validate_name(name)?;
        self.files()?.insert(name.to_string(), content.to_vec());
        Ok(name.to_string())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.files()?.contains_key(name))
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.files()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn url(&self, name: &str) -> String {
        join_url(&self.base_url, name)
    }
}
