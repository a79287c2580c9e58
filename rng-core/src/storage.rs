//! Pluggable key-value persistence for group limits and shuffle bags.
//!
//! The engine treats browser-style stores (a cookie for group limits,
//! durable local storage for shuffle bags) as a plain get/set interface so
//! it stays storage-agnostic and testable headlessly. Writes are
//! fire-and-forget, last-write-wins; malformed persisted state is silently
//! discarded and replaced with defaults.

use crate::bag::{BagState, ShuffleBags};
use content_api::GroupLimit;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage key for the group-limit map.
pub const GROUP_LIMITS_KEY: &str = "rng_group_limits";

/// Storage key for the shuffle-bag map.
pub const SHUFFLE_BAGS_KEY: &str = "rng_prompt_shuffle_bags";

/// A synchronous string key-value store.
///
/// The modelled backends (cookies, local storage) are synchronous, so the
/// trait is too; implementations decide durability.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store; state dies with the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Durable store backed by a single JSON object file.
///
/// Reads happen once at open; writes go through to disk immediately. A
/// missing or corrupt file starts empty, and a failed write is logged and
/// dropped rather than surfaced — persistence here carries no transactional
/// guarantee.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(error) => {
                    warn!(path = %path.display(), %error, "discarding corrupt store file");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, values }
    }

    fn flush(&self) {
        let payload = match serde_json::to_string_pretty(&self.values) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "failed to encode store file");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(error) = std::fs::write(&self.path, payload) {
            warn!(path = %self.path.display(), %error, "failed to write store file");
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }
}

// ============================================================================
// Codecs
// ============================================================================

/// Read the persisted group-limit map.
///
/// Entries are normalized on the way in: non-numeric values drop the entry,
/// negatives floor at zero, and an inverted pair collapses upward.
pub fn read_group_limits(store: &dyn KeyValueStore) -> HashMap<String, GroupLimit> {
    let Some(raw) = store.get(GROUP_LIMITS_KEY) else {
        return HashMap::new();
    };
    let parsed: HashMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(%error, "discarding corrupt group limits");
            return HashMap::new();
        }
    };

    let mut limits = HashMap::new();
    for (group_id, value) in parsed {
        let (Some(min), Some(max)) = (number_field(&value, "min"), number_field(&value, "max"))
        else {
            continue;
        };
        let min = min.max(0) as u32;
        let max = (max.max(0) as u32).max(min);
        limits.insert(group_id, GroupLimit { min, max });
    }
    limits
}

fn number_field(value: &serde_json::Value, field: &str) -> Option<i64> {
    let number = value.get(field)?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|float| float as i64))
}

/// Write the group-limit map back.
pub fn write_group_limits(store: &mut dyn KeyValueStore, limits: &HashMap<String, GroupLimit>) {
    if let Ok(payload) = serde_json::to_string(limits) {
        store.set(GROUP_LIMITS_KEY, &payload);
    }
}

/// Read the persisted shuffle-bag map; malformed entries are dropped
/// individually, a malformed map is dropped wholesale.
pub fn read_shuffle_bags(store: &dyn KeyValueStore) -> ShuffleBags {
    let Some(raw) = store.get(SHUFFLE_BAGS_KEY) else {
        return ShuffleBags::new();
    };
    let parsed: HashMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(%error, "discarding corrupt shuffle bags");
            return ShuffleBags::new();
        }
    };

    let mut bags = ShuffleBags::new();
    for (bag_key, value) in parsed {
        match serde_json::from_value::<BagState>(value) {
            Ok(bag) => {
                bags.insert(bag_key, bag);
            }
            Err(error) => {
                warn!(bag = bag_key, %error, "discarding corrupt shuffle bag entry");
            }
        }
    }
    bags
}

/// Write the shuffle-bag map back.
pub fn write_shuffle_bags(store: &mut dyn KeyValueStore, bags: &ShuffleBags) {
    if let Ok(payload) = serde_json::to_string(bags) {
        store.set(SHUFFLE_BAGS_KEY, &payload);
    }
}
