//! Folder identity cache
//!
//! Maps a (parent folder id, child name) pair to the folder already resolved
//! for it during the current run. Lives only as long as its owner.

use std::collections::HashMap;

use crate::domain::{RemoteFolder, RemoteId};

/// Per-run memo of resolved folders
#[derive(Debug, Default)]
pub struct FolderCache {
    entries: HashMap<RemoteId, HashMap<String, RemoteFolder>>,
    len: usize,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The folder named `name` directly under `parent`, if already resolved
    pub fn get(&self, parent: &RemoteId, name: &str) -> Option<&RemoteFolder> {
        self.entries.get(parent)?.get(name)
    }

    /// Records `folder` as the answer for looking up `name` under `parent`
    ///
    /// Keyed by the looked-up name, which may differ from the name the store
    /// reports for the folder.
    pub fn insert(&mut self, parent: &RemoteId, name: &str, folder: RemoteFolder) {
        let previous = self
            .entries
            .entry(parent.clone())
            .or_default()
            .insert(name.to_string(), folder);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Number of cached (parent, name) pairs
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
