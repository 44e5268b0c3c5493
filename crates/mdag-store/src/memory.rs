use std::collections::HashMap;
use std::sync::RwLock;

use mdag_types::Digest;

use crate::error::StoreResult;
use crate::traits::Store;

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding. All values are held in memory behind a
/// `RwLock` for safe concurrent access. Values are cloned on read/write.
pub struct MemoryStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Remove all values from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all keys in the store.
    pub fn all_digests(&self) -> Vec<Digest> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<Digest> = map.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Unconditionally replace the bytes under `key`, bypassing the
    /// write-once rule of [`Store::put`].
    ///
    /// Exists for fault injection: it is how tests simulate storage
    /// corruption. Returns the previous value.
    pub fn overwrite(&self, key: Digest, value: Vec<u8>) -> Option<Vec<u8>> {
        self.objects.write().expect("lock poisoned").insert(key, value)
    }

    /// Remove the value under `key`. Returns `true` if it existed.
    pub fn remove(&self, key: &Digest) -> bool {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(key)
            .is_some()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        // Idempotent: an existing key already holds this content.
        map.entry(*key).or_insert_with(|| value.to_vec());
        Ok(())
    }

    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("MemoryStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdag_crypto::{hash_bytes, Blake3Factory};

    fn key(content: &[u8]) -> Digest {
        hash_bytes(&Blake3Factory::new(), content)
    }

    // -----------------------------------------------------------------------
    // Core put/get
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = MemoryStore::new();
        let k = key(b"hello world");
        store.put(&k, b"hello world").unwrap();
        assert_eq!(store.get(&k).unwrap().as_deref(), Some(&b"hello world"[..]));
    }

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get(&key(b"missing")).unwrap().is_none());
        assert!(!store.contains(&key(b"missing")).unwrap());
    }

    // -----------------------------------------------------------------------
    // Write idempotency
    // -----------------------------------------------------------------------

    #[test]
    fn put_is_idempotent() {
        let store = MemoryStore::new();
        let k = key(b"idempotent");
        store.put(&k, b"idempotent").unwrap();
        store.put(&k, b"idempotent").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_put_never_changes_stored_bytes() {
        let store = MemoryStore::new();
        let k = key(b"first");
        store.put(&k, b"first").unwrap();
        store.put(&k, b"something else").unwrap();
        assert_eq!(store.get(&k).unwrap().unwrap(), b"first");
    }

    // -----------------------------------------------------------------------
    // Fault injection helpers
    // -----------------------------------------------------------------------

    #[test]
    fn overwrite_replaces_bytes() {
        let store = MemoryStore::new();
        let k = key(b"orig");
        store.put(&k, b"orig").unwrap();
        let prev = store.overwrite(k, b"tampered".to_vec());
        assert_eq!(prev.as_deref(), Some(&b"orig"[..]));
        assert_eq!(store.get(&k).unwrap().unwrap(), b"tampered");
    }

    #[test]
    fn remove_reports_presence() {
        let store = MemoryStore::new();
        let k = key(b"x");
        store.put(&k, b"x").unwrap();
        assert!(store.remove(&k));
        assert!(!store.remove(&k));
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_total_bytes_and_clear() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
        store.put(&key(b"12345"), b"12345").unwrap();
        store.put(&key(b"123456789"), b"123456789").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn all_digests_is_sorted() {
        let store = MemoryStore::new();
        for c in [&b"aaa"[..], &b"bbb"[..], &b"ccc"[..]] {
            store.put(&key(c), c).unwrap();
        }
        let keys = store.all_digests();
        assert_eq!(keys.len(), 3);
        for w in keys.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn works_through_arc_and_reference() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let k = key(b"shared");
        Store::put(&store, &k, b"shared").unwrap();
        let by_ref: &MemoryStore = &store;
        assert!(Store::contains(&by_ref, &k).unwrap());
    }

    #[test]
    fn concurrent_puts_of_same_key_are_harmless() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let k = key(b"raced");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put(&k, b"raced").unwrap())
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&k).unwrap().unwrap(), b"raced");
    }

    #[test]
    fn debug_format() {
        let store = MemoryStore::new();
        store.put(&key(b"x"), b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("MemoryStore"));
        assert!(debug.contains("object_count"));
    }
}
