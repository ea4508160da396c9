use repodrive_core::{EntryKind, PLACEHOLDER_NAME, RemoteStore};
use tracing::debug;

use super::engine::{EngineError, MoveOrder, SyncEngine};
use super::paths::join_remote;
use super::tree::{Children, Node};

/// How a recursive folder walk treats each file it meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WalkMode {
    Copy,
    Relocate { order: MoveOrder, verb: &'static str },
}

impl<S: RemoteStore> SyncEngine<S> {
    /// Replays the subtree at `source` below `target`, one file at a time,
    /// and returns the resulting folder node. A relocation writes the
    /// target placeholder first and drops the source placeholder last.
    /// The first failing item aborts the walk; items already processed stay
    /// where they landed.
    pub(super) async fn walk_folder(
        &self,
        source: &str,
        target: &str,
        mode: WalkMode,
    ) -> Result<Node, EngineError> {
        let entries = self.store.list(source).await?;
        if let WalkMode::Relocate { verb, .. } = mode {
            self.store
                .put(
                    &join_remote(target, PLACEHOLDER_NAME),
                    b"",
                    &format!("{verb} {source} to {target}"),
                )
                .await?;
        }
        let mut children = Children::new();
        let mut had_placeholder = false;

        for entry in entries {
            if entry.is_placeholder() {
                had_placeholder = true;
                continue;
            }
            self.pace().await;
            let from = join_remote(source, &entry.name);
            let to = join_remote(target, &entry.name);
            let node = match entry.kind {
                EntryKind::Dir => Box::pin(self.walk_folder(&from, &to, mode)).await?,
                EntryKind::File => {
                    let reference = match mode {
                        WalkMode::Copy => self.copy_file(&entry.reference, &to).await?,
                        WalkMode::Relocate { order, verb } => {
                            self.relocate_file(&entry.reference, &from, &to, order, verb)
                                .await?
                        }
                    };
                    Node::file(reference)
                }
            };
            debug!(from = %from, to = %to, "walked item");
            children.insert(entry.name, node);
        }

        match mode {
            WalkMode::Copy => {
                self.store
                    .put(
                        &join_remote(target, PLACEHOLDER_NAME),
                        b"",
                        &format!("Create {PLACEHOLDER_NAME} for {target}"),
                    )
                    .await?;
            }
            WalkMode::Relocate { verb, .. } if had_placeholder => {
                self.store
                    .delete(
                        &join_remote(source, PLACEHOLDER_NAME),
                        &format!("{verb} {source} to {target}"),
                    )
                    .await?;
            }
            WalkMode::Relocate { .. } => {}
        }

        Ok(Node::Folder { children })
    }

    /// Deletes every object below `path`, placeholders included. Returns
    /// the number of objects removed.
    pub(super) async fn delete_tree(&self, path: &str) -> Result<usize, EngineError> {
        let entries = self.store.list(path).await?;
        let mut removed = 0;
        for entry in entries {
            self.pace().await;
            let child = join_remote(path, &entry.name);
            match entry.kind {
                EntryKind::Dir => removed += Box::pin(self.delete_tree(&child)).await?,
                EntryKind::File => {
                    self.store.delete(&child, &format!("Delete {child}")).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
