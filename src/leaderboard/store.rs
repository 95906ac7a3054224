//! Leaderboard Storage
//!
//! The table lives in a pretty-printed JSON array file. Every change is a
//! read-modify-write under one async mutex, and the new contents are written
//! to a sibling temp file and renamed over the old one, so readers never see
//! a half-written table.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::leaderboard::entry::LeaderboardEntry;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the table file failed.
    #[error("leaderboard file {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The table file is not a JSON array of entries.
    #[error("leaderboard data is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent leaderboard table.
#[derive(Debug)]
pub struct LeaderboardStore {
    /// Backing file; `None` keeps the table in memory only
    path: Option<PathBuf>,
    /// Guards every read-modify-write; holds the table for in-memory stores
    table: Mutex<Vec<LeaderboardEntry>>,
}

impl LeaderboardStore {
    /// Open a file-backed store, creating an empty table if the file does
    /// not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !tokio::fs::try_exists(&path).await.map_err(|e| io_error(&path, e))? {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
            tokio::fs::write(&path, b"[]")
                .await
                .map_err(|e| io_error(&path, e))?;
            info!(path = %path.display(), "created empty leaderboard");
        }

        let entries = read_table(&path).await?;
        debug!(path = %path.display(), entries = entries.len(), "leaderboard opened");

        Ok(Self {
            path: Some(path),
            table: Mutex::new(entries),
        })
    }

    /// Store that keeps the table in memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: Mutex::new(Vec::new()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current table, in stored order.
    pub async fn load(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut table = self.table.lock().await;
        if let Some(path) = &self.path {
            *table = read_table(path).await?;
        }
        Ok(table.clone())
    }

    /// Apply `f` to the table under the lock and persist the result.
    ///
    /// The file is re-read first so edits made outside this process are not
    /// lost. Nothing is written if `f` reports no change.
    pub async fn update<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<LeaderboardEntry>) -> (T, bool),
    {
        let mut table = self.table.lock().await;

        let mut entries = match &self.path {
            Some(path) => read_table(path).await?,
            None => table.clone(),
        };

        let (value, changed) = f(&mut entries);

        if changed {
            if let Some(path) = &self.path {
                write_table(path, &entries).await?;
            }
        }
        *table = entries;

        Ok(value)
    }

    /// Empty the table.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.clear();
            ((), true)
        })
        .await?;
        info!("leaderboard cleared");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn read_table(path: &Path) -> Result<Vec<LeaderboardEntry>, StoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_table(path: &Path, entries: &[LeaderboardEntry]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(entries)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))?;

    debug!(path = %path.display(), entries = entries.len(), "leaderboard written");
    Ok(())
}
