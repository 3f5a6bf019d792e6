// SPDX-License-Identifier: Apache-2.0

//! Hot-reloadable policy store.
//!
//! Readers take an `Arc` snapshot and keep it for the duration of one
//! enforcement pass; reloads swap the whole document at once so a reader
//! never observes a half-applied policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::document::{PolicyDocument, PolicyError};

pub struct PolicyStore {
    current: RwLock<Arc<PolicyDocument>>,
    path: Option<PathBuf>,
}

impl PolicyStore {
    /// A store holding a fixed document, not backed by a file.
    pub fn new(document: PolicyDocument) -> Self {
        Self {
            current: RwLock::new(Arc::new(document)),
            path: None,
        }
    }

    /// Loads the document at `path`; later `reload()` calls re-read it.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, PolicyError> {
        let path = path.into();
        let document = PolicyDocument::from_file(&path)?;
        info!(path = %path.display(), "policy document loaded");
        Ok(Self {
            current: RwLock::new(Arc::new(document)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current document.
    pub fn snapshot(&self) -> Arc<PolicyDocument> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, document: PolicyDocument) {
        *self.current.write() = Arc::new(document);
    }

    /// Re-reads the backing file. On failure the previous document stays
    /// in effect.
    pub fn reload(&self) -> Result<(), PolicyError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let document = PolicyDocument::from_file(path)?;
        self.replace(document);
        info!(path = %path.display(), "policy document reloaded");
        Ok(())
    }

    /// Reloads the document whenever its file changes.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors replacing the file via rename are picked up too. Returns
    /// `None` for stores without a backing file. Dropping the watcher stops
    /// the reloads.
    pub fn watch(self: &Arc<Self>) -> Result<Option<RecommendedWatcher>, PolicyError> {
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };
        let Some(file_name) = path.file_name().map(|n| n.to_os_string()) else {
            return Ok(None);
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let store = Arc::clone(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "policy watcher error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if !event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                return;
            }
            debug!(kind = ?event.kind, "policy file changed");
            if let Err(e) = store.reload() {
                warn!(error = %e, "policy reload failed; keeping previous document");
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching policy document");
        Ok(Some(watcher))
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(PolicyDocument::default())
    }
}
