use std::time::Duration;

use repodrive_core::{EntryKind, ErrorClass, PLACEHOLDER_NAME, RemoteRef, RemoteStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clipboard::{Clipboard, ClipboardEntry, TransferMode};
use super::folder_ops::WalkMode;
use super::paths::{Location, PathError, join_remote};
use super::tree::{Node, TreeCache, TreeError};
use crate::storage::SnapshotStore;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
    #[error("{0}")]
    Tree(#[from] TreeError),
    #[error("remote store: {0}")]
    Store(#[from] StoreError),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("cannot place `{moved}` inside itself at {target}")]
    InvalidTarget { moved: String, target: String },
}

/// Error taxonomy surfaced at the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    RateLimited,
    Remote,
    Malformed,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Path(_) | EngineError::NotAFile(_) | EngineError::InvalidTarget { .. } => {
                ErrorKind::Malformed
            }
            EngineError::Tree(TreeError::NotFound(_)) => ErrorKind::NotFound,
            EngineError::Tree(TreeError::AlreadyExists(_)) => ErrorKind::AlreadyExists,
            EngineError::Tree(TreeError::NotAFolder(_)) => ErrorKind::Malformed,
            EngineError::Store(err) => match err.classification() {
                ErrorClass::NotFound => ErrorKind::NotFound,
                ErrorClass::RateLimited => ErrorKind::RateLimited,
                ErrorClass::Malformed => ErrorKind::Malformed,
                ErrorClass::Auth | ErrorClass::Transient | ErrorClass::Permanent => ErrorKind::Remote,
            },
        }
    }
}

/// Order of the two remote steps that relocate a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveOrder {
    /// Write the destination, then delete the source. A failure in between
    /// leaves a duplicate.
    #[default]
    CopyFirst,
    /// Delete the source, then write the destination. A failure in between
    /// loses the object.
    DeleteFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub move_order: MoveOrder,
    /// Pause between items of a recursive folder walk.
    pub pacing: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            move_order: MoveOrder::CopyFirst,
            pacing: Duration::from_millis(100),
        }
    }
}

/// One row of a rendered directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub link: Option<String>,
}

#[derive(Debug, Default)]
pub struct PasteReport {
    pub completed: Vec<ClipboardEntry>,
    pub failed: Vec<(ClipboardEntry, EngineError)>,
    /// The clipboard was emptied because the paste was move-flavoured.
    pub cleared: bool,
}

/// Runs compound operations against the remote store and mirrors their
/// outcome into the tree cache. The cache is touched only after the remote
/// steps of an operation all succeeded.
pub struct SyncEngine<S> {
    pub(super) store: S,
    tree: TreeCache,
    clipboard: Clipboard,
    snapshots: Option<SnapshotStore>,
    pub(super) options: EngineOptions,
}

impl<S: RemoteStore> SyncEngine<S> {
    pub fn new(store: S, tree: TreeCache) -> Self {
        Self {
            store,
            tree,
            clipboard: Clipboard::default(),
            snapshots: None,
            options: EngineOptions::default(),
        }
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotStore) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tree(&self) -> &TreeCache {
        &self.tree
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    /// Directory contents as cached: folders first, then files, by name.
    pub fn view(&self, location: &Location) -> Result<Vec<DirEntry>, EngineError> {
        let children = self.tree.children(location)?;
        let mut entries: Vec<DirEntry> = children
            .iter()
            .map(|(name, node)| DirEntry {
                name: name.clone(),
                kind: node.kind(),
                link: node.remote_ref().and_then(|r| r.html_url.clone()),
            })
            .collect();
        entries.sort_by_key(|entry| entry.kind != EntryKind::Dir);
        Ok(entries)
    }

    /// Fetches the remote listing of `location` and replaces the cached
    /// children with it.
    pub async fn list_directory(&mut self, location: &Location) -> Result<Vec<DirEntry>, EngineError> {
        let entries = self.store.list(&location.remote_path()).await?;
        self.tree.apply_listing(location, &entries)?;
        self.persist().await;
        debug!(location = %location, entries = entries.len(), "directory listed");
        self.view(location)
    }

    /// Writes `bytes` as `name` in `location`, overwriting a file of the
    /// same name.
    pub async fn upload(
        &mut self,
        location: &Location,
        name: &str,
        bytes: &[u8],
    ) -> Result<RemoteRef, EngineError> {
        let path = location.remote_path_of(name)?;
        if let Ok(Node::Folder { .. }) = self.tree.get(location, name) {
            return Err(TreeError::AlreadyExists(format!("{location}/{name}")).into());
        }
        self.tree.children(location)?;

        let reference = self
            .store
            .put(&path, bytes, &format!("Upload {name}"))
            .await?;
        // Overwrite: the old file entry, if cached, is replaced below.
        self.tree.remove(location, name).ok();
        self.tree
            .insert(location, name, Node::file(reference.clone()))?;
        self.persist().await;
        info!(path = %path, size = bytes.len(), "uploaded");
        Ok(reference)
    }

    /// Materializes an empty folder through a placeholder object.
    pub async fn create_folder(&mut self, location: &Location, name: &str) -> Result<(), EngineError> {
        let path = location.remote_path_of(name)?;
        if self.tree.contains(location, name) {
            return Err(TreeError::AlreadyExists(format!("{location}/{name}")).into());
        }
        self.tree.children(location)?;

        self.store
            .put(
                &join_remote(&path, PLACEHOLDER_NAME),
                b"",
                &format!("Create folder {name}"),
            )
            .await?;
        self.tree.insert(location, name, Node::empty_folder())?;
        self.persist().await;
        info!(path = %path, "folder created");
        Ok(())
    }

    pub async fn fetch(&self, location: &Location, name: &str) -> Result<Vec<u8>, EngineError> {
        match self.tree.get(location, name)? {
            Node::File { remote_ref } => Ok(self.store.get(remote_ref).await?.bytes),
            Node::Folder { .. } => Err(EngineError::NotAFile(format!("{location}/{name}"))),
        }
    }

    /// Deletes a file, or every object below a folder.
    pub async fn delete(&mut self, location: &Location, name: &str) -> Result<(), EngineError> {
        let path = location.remote_path_of(name)?;
        match self.tree.get(location, name)? {
            Node::File { .. } => {
                self.store.delete(&path, &format!("Delete {path}")).await?;
            }
            Node::Folder { .. } => {
                let removed = self.delete_tree(&path).await?;
                debug!(path = %path, objects = removed, "folder objects deleted");
            }
        }
        self.tree.remove(location, name)?;
        self.persist().await;
        info!(path = %path, "deleted");
        Ok(())
    }

    /// Renames within one folder by copying to the new name and deleting
    /// the old one, file by file.
    pub async fn rename(
        &mut self,
        location: &Location,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), EngineError> {
        if old_name == new_name {
            return Ok(());
        }
        let old_path = location.remote_path_of(old_name)?;
        let new_path = location.remote_path_of(new_name)?;
        let node = self.tree.get(location, old_name)?.clone();
        if self.tree.contains(location, new_name) {
            return Err(TreeError::AlreadyExists(format!("{location}/{new_name}")).into());
        }

        let renamed = match &node {
            Node::File { remote_ref } => {
                let reference = self
                    .relocate_file(remote_ref, &old_path, &new_path, MoveOrder::CopyFirst, "Rename")
                    .await?;
                Node::file(reference)
            }
            Node::Folder { .. } => {
                let mode = WalkMode::Relocate {
                    order: MoveOrder::CopyFirst,
                    verb: "Rename",
                };
                self.walk_folder(&old_path, &new_path, mode).await?
            }
        };
        self.tree.remove(location, old_name)?;
        self.tree.insert(location, new_name, renamed)?;
        self.persist().await;
        info!(from = %old_path, to = %new_path, "renamed");
        Ok(())
    }

    /// Copies or moves `name` from `source` into the folder `target`.
    pub async fn transfer(
        &mut self,
        source: &Location,
        name: &str,
        target: &Location,
        mode: TransferMode,
    ) -> Result<(), EngineError> {
        let source_path = source.remote_path_of(name)?;
        let target_path = target.remote_path_of(name)?;
        let node = self.tree.get(source, name)?.clone();
        self.tree.children(target)?;
        if self.tree.contains(target, name) {
            return Err(TreeError::AlreadyExists(format!("{target}/{name}")).into());
        }
        if matches!(node, Node::Folder { .. }) && target.starts_with(&source.child(name)?) {
            return Err(EngineError::InvalidTarget {
                moved: source_path,
                target: target.to_string(),
            });
        }

        let placed = match (&node, mode) {
            (Node::File { remote_ref }, TransferMode::Copy) => {
                Node::file(self.copy_file(remote_ref, &target_path).await?)
            }
            (Node::File { remote_ref }, TransferMode::Move) => {
                let order = self.options.move_order;
                let reference = self
                    .relocate_file(remote_ref, &source_path, &target_path, order, "Move")
                    .await?;
                Node::file(reference)
            }
            (Node::Folder { .. }, TransferMode::Copy) => {
                self.walk_folder(&source_path, &target_path, WalkMode::Copy)
                    .await?
            }
            (Node::Folder { .. }, TransferMode::Move) => {
                let mode = WalkMode::Relocate {
                    order: self.options.move_order,
                    verb: "Move",
                };
                self.walk_folder(&source_path, &target_path, mode).await?
            }
        };

        if mode == TransferMode::Move {
            self.tree.remove(source, name)?;
            self.clipboard.remove(name);
        }
        self.tree.insert(target, name, placed)?;
        self.persist().await;
        info!(from = %source_path, to = %target_path, mode = %mode, "transferred");
        Ok(())
    }

    /// Queues `name` in `location` for a later paste.
    pub fn clipboard_add(&mut self, location: &Location, name: &str, mode: TransferMode) -> Result<(), EngineError> {
        self.tree.get(location, name)?;
        self.clipboard.add(name, location.clone(), mode);
        Ok(())
    }

    /// Runs every queued entry against `target`, in order. A move-flavoured
    /// paste (last entry is a move) empties the clipboard even when some
    /// entries failed; failures are returned so they can be queued again.
    /// Otherwise copies and failed moves stay queued.
    pub async fn paste(&mut self, target: &Location) -> PasteReport {
        let entries = self.clipboard.drain();
        let mut report = PasteReport::default();
        let Some(last_mode) = entries.last().map(|entry| entry.mode) else {
            return report;
        };

        let mut retained = Vec::new();
        for entry in entries {
            match self
                .transfer(&entry.source, &entry.name, target, entry.mode)
                .await
            {
                Ok(()) => {
                    if entry.mode == TransferMode::Copy {
                        retained.push(entry.clone());
                    }
                    report.completed.push(entry);
                }
                Err(err) => {
                    warn!(name = %entry.name, mode = %entry.mode, error = %err, "paste entry failed");
                    retained.push(entry.clone());
                    report.failed.push((entry, err));
                }
            }
        }

        if last_mode == TransferMode::Move {
            if !report.failed.is_empty() {
                warn!(
                    failed = report.failed.len(),
                    "clearing clipboard after move paste with failures"
                );
            }
            report.cleared = true;
        } else {
            for entry in retained {
                self.clipboard.add(entry.name, entry.source, entry.mode);
            }
        }
        report
    }

    pub(super) async fn copy_file(&self, reference: &RemoteRef, target_path: &str) -> Result<RemoteRef, EngineError> {
        let object = self.store.get(reference).await?;
        let written = self
            .store
            .put(target_path, &object.bytes, &format!("Copy file to {target_path}"))
            .await?;
        Ok(written)
    }

    /// Moves one object. Content is fetched before either mutating step.
    pub(super) async fn relocate_file(
        &self,
        reference: &RemoteRef,
        source_path: &str,
        target_path: &str,
        order: MoveOrder,
        verb: &str,
    ) -> Result<RemoteRef, EngineError> {
        let object = self.store.get(reference).await?;
        let message = format!("{verb} {source_path} to {target_path}");
        let written = match order {
            MoveOrder::CopyFirst => {
                let written = self.store.put(target_path, &object.bytes, &message).await?;
                self.store.delete(source_path, &message).await?;
                written
            }
            MoveOrder::DeleteFirst => {
                self.store.delete(source_path, &message).await?;
                self.store.put(target_path, &object.bytes, &message).await?
            }
        };
        Ok(written)
    }

    pub(super) async fn pace(&self) {
        if !self.options.pacing.is_zero() {
            tokio::time::sleep(self.options.pacing).await;
        }
    }

    async fn persist(&self) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if let Err(err) = snapshots.save(&self.tree).await {
            warn!(path = %snapshots.path().display(), error = %err, "failed to persist tree snapshot");
        }
    }
}
