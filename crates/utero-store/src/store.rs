//! Directory-backed JSON documents, one `<key>.json` file per key

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use utero_core::{date_key, Error, Result};

pub const CYCLE_DATA_KEY: &str = "cycleData";
pub const SYMPTOMS_KEY: &str = "symptoms";
pub const MOODS_KEY: &str = "moods";

/// Cache key for the image shown on a given day.
pub fn daily_image_key(source: &str, date: NaiveDate) -> String {
    format!("dailyImage_{}_{}", source, date_key(date))
}

#[derive(Clone, Debug)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::persistence(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('.') || key.contains(|c: char| c == '/' || c == '\\') {
            return Err(Error::validation(format!("invalid store key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Read a document. A missing file is `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::persistence(format!("read {}: {}", path.display(), e)))?;
        let value = serde_json::from_str(&content)
            .map_err(|e| Error::persistence(format!("parse {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    /// Write a document atomically (temp file, then rename).
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| Error::persistence(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| Error::persistence(format!("rename {}: {}", path.display(), e)))?;
        debug!(key, bytes = json.len(), "saved document");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!("remove {}: {}", path.display(), e))),
        }
    }

    /// Remove every document in the store directory.
    pub fn clear(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| Error::persistence(format!("list {}: {}", self.dir.display(), e)))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(&path)
                    .map_err(|e| Error::persistence(format!("remove {}: {}", path.display(), e)))?;
            }
        }
        Ok(())
    }
}
