use std::fmt;

use repodrive_core::PLACEHOLDER_NAME;
use thiserror::Error;

/// First segment of every location; it has no counterpart in the remote
/// namespace.
pub const ROOT_SEGMENT: &str = "root";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("location is empty")]
    Empty,
    #[error("location must start at `root`, got `{0}`")]
    MissingRoot(String),
    #[error("invalid name `{0}`")]
    InvalidName(String),
}

/// Root-anchored sequence of folder names, e.g. `["root", "docs"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    pub fn root() -> Self {
        Self {
            segments: vec![ROOT_SEGMENT.to_string()],
        }
    }

    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let Some(first) = segments.first() else {
            return Err(PathError::Empty);
        };
        if first != ROOT_SEGMENT {
            return Err(PathError::MissingRoot(first.clone()));
        }
        for segment in &segments[1..] {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Parses a slash separated remote path; empty or `/` is the root.
    pub fn from_remote_path(path: &str) -> Result<Self, PathError> {
        let rest = path.split('/').filter(|segment| !segment.is_empty());
        Self::new(std::iter::once(ROOT_SEGMENT).chain(rest))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments below the root sentinel, used to walk the tree cache.
    pub fn cache_path(&self) -> &[String] {
        &self.segments[1..]
    }

    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        validate_name(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or(ROOT_SEGMENT)
    }

    /// Repository-relative path of this folder, `""` for the root.
    pub fn remote_path(&self) -> String {
        self.cache_path().join("/")
    }

    /// Repository-relative path of `leaf` inside this folder.
    pub fn remote_path_of(&self, leaf: &str) -> Result<String, PathError> {
        validate_name(leaf)?;
        Ok(join_remote(&self.remote_path(), leaf))
    }

    pub fn starts_with(&self, other: &Location) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Resolves `segments` (root first) to the tree cache walk path.
pub fn to_cache_path(segments: &[String]) -> Result<Vec<String>, PathError> {
    Ok(Location::new(segments.iter().cloned())?.cache_path().to_vec())
}

/// Resolves `segments` (root first) plus `leaf` to a remote path.
pub fn to_remote_path(segments: &[String], leaf: &str) -> Result<String, PathError> {
    Location::new(segments.iter().cloned())?.remote_path_of(leaf)
}

pub fn join_remote(parent: &str, leaf: &str) -> String {
    if parent.is_empty() {
        leaf.to_string()
    } else {
        format!("{parent}/{leaf}")
    }
}

/// User-facing entry names: the placeholder name is reserved.
pub fn validate_name(name: &str) -> Result<(), PathError> {
    validate_segment(name)?;
    if name == PLACEHOLDER_NAME {
        return Err(PathError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.chars().any(char::is_control)
    {
        return Err(PathError::InvalidName(segment.to_string()));
    }
    Ok(())
}
