use std::fmt;

use super::paths::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

impl TransferMode {
    pub fn verb(self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub name: String,
    pub source: Location,
    pub mode: TransferMode,
}

/// Deferred copy/move queue. Ordered like a list, keyed by name like a set.
#[derive(Debug, Default, Clone)]
pub struct Clipboard {
    entries: Vec<ClipboardEntry>,
}

impl Clipboard {
    /// Queues `name`; a previous entry with the same name is dropped.
    pub fn add(&mut self, name: impl Into<String>, source: Location, mode: TransferMode) {
        let name = name.into();
        self.entries.retain(|entry| entry.name != name);
        self.entries.push(ClipboardEntry { name, source, mode });
    }

    pub fn remove(&mut self, name: &str) -> Option<ClipboardEntry> {
        let index = self.entries.iter().position(|entry| entry.name == name)?;
        Some(self.entries.remove(index))
    }

    pub fn drain(&mut self) -> Vec<ClipboardEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(copies, moves)` queued.
    pub fn counts(&self) -> (usize, usize) {
        self.entries
            .iter()
            .fold((0, 0), |(copies, moves), entry| match entry.mode {
                TransferMode::Copy => (copies + 1, moves),
                TransferMode::Move => (copies, moves + 1),
            })
    }
}
