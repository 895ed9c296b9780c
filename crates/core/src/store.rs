//! JSON files backing the persisted session and the named playlists.
//!
//! Both files live under one state directory. A missing file reads as the
//! default value; writes go through a sibling temp file and a rename so a
//! crash mid-write leaves the previous contents in place.

use crate::model::{QueueSnapshot, SavedPlaylist, Track};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

const SESSION_FILE: &str = "session.json";
const PLAYLISTS_FILE: &str = "playlists.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Playlists = BTreeMap<String, SavedPlaylist>;

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_session(&self) -> Result<QueueSnapshot, StoreError> {
        self.read_json(SESSION_FILE)
    }

    pub fn save_session(&self, snapshot: &QueueSnapshot) -> Result<(), StoreError> {
        self.write_json(SESSION_FILE, snapshot)
    }

    pub fn load_playlists(&self) -> Result<Playlists, StoreError> {
        self.read_json(PLAYLISTS_FILE)
    }

    /// Stores `tracks` under `name`, replacing any playlist with that name.
    pub fn save_playlist(&self, name: &str, tracks: Vec<Track>) -> Result<(), StoreError> {
        let mut all = self.load_playlists()?;
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        all.insert(name.to_string(), SavedPlaylist { tracks, saved_at });
        self.write_json(PLAYLISTS_FILE, &all)
    }

    pub fn playlist(&self, name: &str) -> Result<Option<SavedPlaylist>, StoreError> {
        Ok(self.load_playlists()?.remove(name))
    }

    /// Returns whether a playlist with that name existed.
    pub fn delete_playlist(&self, name: &str) -> Result<bool, StoreError> {
        let mut all = self.load_playlists()?;
        if all.remove(name).is_none() {
            return Ok(false);
        }
        self.write_json(PLAYLISTS_FILE, &all)?;
        Ok(true)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.dir.join(file);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "state file missing; using defaults");
                return Ok(T::default());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if data.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&data).map_err(|source| StoreError::Parse { path, source })
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let body = serde_json::to_string_pretty(value).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&tmp, body).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "state written");
        Ok(())
    }
}
