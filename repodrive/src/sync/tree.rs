use std::collections::BTreeMap;

use repodrive_core::{EntryKind, RemoteEntry, RemoteRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::paths::Location;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not a folder: {0}")]
    NotAFolder(String),
}

pub type Children = BTreeMap<String, Node>;

/// A cached entry. Position is given only by the path used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Folder {
        #[serde(default)]
        children: Children,
    },
    File {
        #[serde(rename = "ref")]
        remote_ref: RemoteRef,
    },
}

impl Node {
    pub fn empty_folder() -> Self {
        Node::Folder {
            children: Children::new(),
        }
    }

    pub fn file(remote_ref: RemoteRef) -> Self {
        Node::File { remote_ref }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Node::Folder { .. } => EntryKind::Dir,
            Node::File { .. } => EntryKind::File,
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Node::Folder { children } => Some(children),
            Node::File { .. } => None,
        }
    }

    pub fn remote_ref(&self) -> Option<&RemoteRef> {
        match self {
            Node::File { remote_ref } => Some(remote_ref),
            Node::Folder { .. } => None,
        }
    }

    fn from_listing(entry: &RemoteEntry) -> Self {
        match entry.kind {
            EntryKind::Dir => Node::empty_folder(),
            EntryKind::File => Node::file(entry.reference.clone()),
        }
    }
}

/// Directory-scoped mirror of the remote namespace. Folders the user never
/// visited are absent or empty, never "known empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeCache {
    root: Node,
}

impl Default for TreeCache {
    fn default() -> Self {
        Self {
            root: Node::empty_folder(),
        }
    }
}

impl TreeCache {
    /// Restores a cache from a persisted root; a file root is not a tree.
    pub fn from_root(root: Node) -> Result<Self, TreeError> {
        match root {
            Node::Folder { .. } => Ok(Self { root }),
            Node::File { .. } => Err(TreeError::NotAFolder("root".into())),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn resolve(&self, location: &Location) -> Result<&Node, TreeError> {
        let mut node = &self.root;
        for segment in location.cache_path() {
            node = node
                .children()
                .and_then(|children| children.get(segment))
                .ok_or_else(|| TreeError::NotFound(location.to_string()))?;
        }
        Ok(node)
    }

    pub fn children(&self, location: &Location) -> Result<&Children, TreeError> {
        self.resolve(location)?
            .children()
            .ok_or_else(|| TreeError::NotAFolder(location.to_string()))
    }

    pub fn get(&self, location: &Location, name: &str) -> Result<&Node, TreeError> {
        self.children(location)?
            .get(name)
            .ok_or_else(|| TreeError::NotFound(format!("{location}/{name}")))
    }

    pub fn contains(&self, location: &Location, name: &str) -> bool {
        self.get(location, name).is_ok()
    }

    pub fn insert(&mut self, location: &Location, name: &str, node: Node) -> Result<(), TreeError> {
        let children = self.children_mut(location)?;
        if children.contains_key(name) {
            return Err(TreeError::AlreadyExists(format!("{location}/{name}")));
        }
        children.insert(name.to_string(), node);
        Ok(())
    }

    pub fn remove(&mut self, location: &Location, name: &str) -> Result<Node, TreeError> {
        self.children_mut(location)?
            .remove(name)
            .ok_or_else(|| TreeError::NotFound(format!("{location}/{name}")))
    }

    /// Replaces the children at `location` wholesale with `entries`,
    /// creating any missing folders on the way. Placeholders are dropped.
    /// A subfolder that is still a folder keeps its cached contents.
    pub fn apply_listing(&mut self, location: &Location, entries: &[RemoteEntry]) -> Result<(), TreeError> {
        let children = self.ensure_folder(location)?;
        let mut previous = std::mem::take(children);
        *children = entries
            .iter()
            .filter(|entry| !entry.is_placeholder())
            .map(|entry| {
                let node = match previous.remove(&entry.name) {
                    Some(folder @ Node::Folder { .. }) if entry.kind == EntryKind::Dir => folder,
                    _ => Node::from_listing(entry),
                };
                (entry.name.clone(), node)
            })
            .collect();
        Ok(())
    }

    fn children_mut(&mut self, location: &Location) -> Result<&mut Children, TreeError> {
        let mut node = &mut self.root;
        for segment in location.cache_path() {
            node = match node {
                Node::Folder { children } => children
                    .get_mut(segment)
                    .ok_or_else(|| TreeError::NotFound(location.to_string()))?,
                Node::File { .. } => return Err(TreeError::NotAFolder(location.to_string())),
            };
        }
        match node {
            Node::Folder { children } => Ok(children),
            Node::File { .. } => Err(TreeError::NotAFolder(location.to_string())),
        }
    }

    fn ensure_folder(&mut self, location: &Location) -> Result<&mut Children, TreeError> {
        let mut node = &mut self.root;
        for segment in location.cache_path() {
            let Node::Folder { children } = node else {
                return Err(TreeError::NotAFolder(location.to_string()));
            };
            node = children
                .entry(segment.clone())
                .or_insert_with(Node::empty_folder);
        }
        match node {
            Node::Folder { children } => Ok(children),
            Node::File { .. } => Err(TreeError::NotAFolder(location.to_string())),
        }
    }
}
