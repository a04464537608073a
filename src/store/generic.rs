use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::Mutex;

/// A keyed map behind an async mutex, shared by the in-memory stores.
#[derive(Default)]
pub struct GenericMemoryStore<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    store: Mutex<HashMap<K, V>>,
}

impl<K, V> GenericMemoryStore<K, V>
where
    K: Eq + Hash + Send + Clone + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.store.lock().await.get(key).cloned()
    }

    /// Inserts `value`, returning whatever was stored under `key` before.
    pub async fn put(&self, key: K, value: V) -> Option<V> {
        self.store.lock().await.insert(key, value)
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.store.lock().await.contains_key(key)
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.store.lock().await.remove(key)
    }

    pub async fn count(&self) -> usize {
        self.store.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_returns_previous_value() {
        let store: GenericMemoryStore<u32, String> = GenericMemoryStore::new();
        assert_eq!(store.put(1, "a".to_string()).await, None);
        assert_eq!(store.put(1, "b".to_string()).await, Some("a".to_string()));
        assert_eq!(store.get(&1).await, Some("b".to_string()));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_and_contains() {
        let store: GenericMemoryStore<u32, u32> = GenericMemoryStore::new();
        store.put(7, 70).await;
        assert!(store.contains(&7).await);
        assert_eq!(store.remove(&7).await, Some(70));
        assert!(!store.contains(&7).await);
        assert_eq!(store.remove(&7).await, None);
    }
}
