use std::collections::HashSet;
use tokio::sync::RwLock;

/// Set of keys whose requests are rejected before any processing
#[derive(Default)]
pub struct BlocklistStore {
    keys: RwLock<HashSet<String>>,
}

impl BlocklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.keys.read().await.contains(key)
    }

    /// Add a key. Returns `true` if the key was not blocked before.
    pub async fn add(&self, key: &str) -> bool {
        self.keys.write().await.insert(key.to_string())
    }

    /// Remove a key. Returns `true` if the key was blocked.
    pub async fn remove(&self, key: &str) -> bool {
        self.keys.write().await.remove(key)
    }

    /// Current blocked keys, sorted for stable output
    pub async fn snapshot(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.read().await.iter().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }
}
