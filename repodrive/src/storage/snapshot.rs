use std::io;
use std::path::{Path, PathBuf};

use repodrive_core::RepoId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::sync::tree::{Node, TreeCache, TreeError};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("snapshot root is invalid: {0}")]
    InvalidRoot(#[from] TreeError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    repository: String,
    root: Node,
}

/// Single JSON snapshot of the whole tree, one file per repository.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    repository: String,
}

impl SnapshotStore {
    pub fn new(state_dir: &Path, repo: &RepoId) -> Self {
        Self {
            path: state_dir.join(format!("{}__{}.json", repo.owner, repo.name)),
            repository: repo.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the cache, or an empty tree when nothing usable is stored.
    pub async fn load(&self) -> Result<TreeCache, SnapshotError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(TreeCache::default()),
            Err(err) => return Err(err.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        if snapshot.repository != self.repository {
            warn!(
                stored = %snapshot.repository,
                expected = %self.repository,
                "ignoring snapshot of another repository"
            );
            return Ok(TreeCache::default());
        }
        Ok(TreeCache::from_root(snapshot.root)?)
    }

    pub async fn save(&self, tree: &TreeCache) -> Result<(), SnapshotError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            repository: self.repository.clone(),
            root: tree.root().clone(),
        };
        let encoded = serde_json::to_vec(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = self.path.with_extension("json.partial");
        tokio::fs::write(&partial, encoded).await?;
        tokio::fs::rename(&partial, &self.path).await?;
        Ok(())
    }
}
