//! Session snapshot persistence.
//!
//! Serializes the full sampling session (catalog, draw state, locks, group
//! limits, shuffle bags) so a session can be resumed exactly, with a format
//! version checked on load.

use crate::bag::ShuffleBags;
use crate::roll::PoolState;
use content_api::{Category, OutputConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current snapshot format version.
const SAVE_VERSION: u32 = 1;

/// A saved session with everything needed to resume sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    /// Snapshot format version for compatibility checking.
    pub version: u32,

    /// When the snapshot was created (unix seconds).
    pub saved_at: String,

    /// The catalog the session was working against.
    pub catalog: Vec<Category>,

    /// Saved output configs known at snapshot time.
    pub output_configs: Vec<OutputConfig>,

    /// The active output config, if any.
    pub active_output_config: Option<String>,

    /// Draws, locks, overrides and group limits.
    pub state: PoolState,

    /// Shuffle bags (empty when the session sampled uniformly).
    #[serde(default)]
    pub bags: ShuffleBags,

    /// Whether the session drew through the cycling sampler.
    #[serde(default)]
    pub cycled: bool,

    /// Quick-access summary.
    pub metadata: SnapshotMetadata,
}

/// Metadata about a snapshot for quick display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Number of categories in the catalog.
    pub category_count: usize,

    /// Number of card-locked categories.
    pub locked_categories: usize,

    /// Number of categories holding a non-empty draw.
    pub drawn_categories: usize,

    /// When the snapshot was created (duplicated for peek access).
    #[serde(default)]
    pub saved_at: String,
}

impl SavedSession {
    /// Build a snapshot from session parts.
    pub fn new(
        catalog: Vec<Category>,
        output_configs: Vec<OutputConfig>,
        active_output_config: Option<String>,
        state: PoolState,
        bags: ShuffleBags,
        cycled: bool,
    ) -> Self {
        let saved_at = unix_now();
        let metadata = SnapshotMetadata {
            category_count: catalog.len(),
            locked_categories: state.card_locks.values().filter(|locked| **locked).count(),
            drawn_categories: state.draws.values().filter(|draw| !draw.is_empty()).count(),
            saved_at: saved_at.clone(),
        };

        Self {
            version: SAVE_VERSION,
            saved_at,
            catalog,
            output_configs,
            active_output_config,
            state,
            bags,
            cycled,
            metadata,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Read a snapshot's metadata without loading the full state.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SnapshotMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SnapshotMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// Current timestamp as unix seconds.
fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}
