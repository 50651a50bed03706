use crate::render::Rendering;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// The exact arguments of a render call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapKey {
    location: String,
    category: String,
    tags: Vec<String>,
}

impl MapKey {
    pub fn new(location: &str, category: &str, tags: &[String]) -> Self {
        Self {
            location: location.to_string(),
            category: category.to_string(),
            tags: tags.to_vec(),
        }
    }
}

/// Unbounded memo of finished renderings, kept for the life of the process.
/// The handlers only render catalog provinces and offered tags, so the key
/// space stays finite.
#[derive(Debug, Clone, Default)]
pub struct MapCache {
    entries: Arc<RwLock<HashMap<MapKey, Rendering>>>,
}

impl MapCache {
    pub async fn get(&self, key: &MapKey) -> Option<Rendering> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `rendering` unless another request stored one for `key` first.
    /// Returns whichever rendering ends up cached.
    pub async fn insert(&self, key: MapKey, rendering: Rendering) -> Rendering {
        self.entries
            .write()
            .await
            .entry(key)
            .or_insert(rendering)
            .clone()
    }

    /// Store `rendering`, dropping any earlier one for `key`
    pub async fn replace(&self, key: MapKey, rendering: Rendering) {
        self.entries.write().await.insert(key, rendering);
    }
}
