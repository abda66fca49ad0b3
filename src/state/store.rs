//! File-based state persistence
//!
//! One JSON document per owner, fully overwritten on every save. Writes go
//! to a temp sibling and are renamed into place so a crash mid-save can
//! never leave a torn file. Anything unreadable on load (corrupt JSON,
//! schema drift, an owner mismatch) is treated as "no usable state" and
//! falls back to a fresh fetch; only saves propagate errors.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::ProgressState;
use crate::error::{Error, Result};

/// Store for saving and loading fetch progress, scoped by owner
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, owner: &str) -> PathBuf {
        // Owner strings come from user input; anything that could traverse
        // paths is flattened before it becomes a filename.
        let sanitized: String = owner
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }

    /// Persist a snapshot, fully overwriting any prior state for its owner.
    pub async fn save(&self, state: &ProgressState) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::state(format!("failed to create state dir {}: {e}", self.dir.display()))
        })?;

        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state(format!("failed to serialize state: {e}")))?;

        let path = self.path_for(&state.owner);
        let temp_path = path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("failed to write state file: {e}")))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::state(format!("failed to rename state file: {e}")))?;

        debug!(
            owner = %state.owner,
            fetched = state.fetched_items,
            total = state.total_items,
            "state saved"
        );
        Ok(())
    }

    /// Load the stored snapshot for an owner, if one is usable.
    pub async fn load(&self, owner: &str) -> Option<ProgressState> {
        let path = self.path_for(owner);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(owner, "no state file");
                return None;
            }
            Err(e) => {
                warn!(owner, error = %e, "state file unreadable, ignoring");
                return None;
            }
        };

        let state: ProgressState = match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                warn!(owner, error = %e, "state file corrupt, ignoring");
                return None;
            }
        };

        if state.owner != owner {
            warn!(
                stored_owner = %state.owner,
                requested_owner = owner,
                "state file belongs to a different owner, ignoring"
            );
            return None;
        }
        if !state.is_valid() {
            warn!(owner, "state file violates invariants, ignoring");
            return None;
        }

        info!(
            owner,
            fetched = state.fetched_items,
            total = state.total_items,
            "state loaded"
        );
        Some(state)
    }

    /// Delete stored state for an owner. Returns whether usable state was
    /// actually removed; a file for a different owner is left alone.
    pub async fn clear(&self, owner: &str) -> Result<bool> {
        if self.load(owner).await.is_none() {
            return Ok(false);
        }

        let path = self.path_for(owner);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::state(format!("failed to remove state file: {e}")))?;
        info!(owner, "state cleared");
        Ok(true)
    }

    /// Whether usable state exists for an owner.
    pub async fn exists(&self, owner: &str) -> bool {
        self.load(owner).await.is_some()
    }

    /// Load existing state or create (and persist) a fresh one.
    ///
    /// If the remote collection size changed since the stored snapshot, the
    /// total is refreshed; a shrunken collection also clamps `fetched_items`
    /// so the invariant holds at every observation point.
    pub async fn get_or_create(&self, owner: &str, total_items: u64) -> Result<ProgressState> {
        if let Some(mut state) = self.load(owner).await {
            if state.total_items != total_items {
                info!(
                    owner,
                    old_total = state.total_items,
                    new_total = total_items,
                    "collection size changed since last run"
                );
                state.total_items = total_items;
                if state.fetched_items > total_items {
                    state.fetched_items = total_items;
                }
                state.touch();
                self.save(&state).await?;
            }
            return Ok(state);
        }

        info!(owner, total_items, "creating new progress state");
        let state = ProgressState::new(owner, total_items);
        self.save(&state).await?;
        Ok(state)
    }
}
