use std::sync::Arc;

use mdag_types::Digest;

use crate::error::StoreResult;

/// Durable `Digest -> bytes` mapping.
///
/// All implementations must satisfy these invariants:
/// - `put` is idempotent. A second `put` with an existing key succeeds
///   without touching the stored bytes.
/// - Concurrent calls on independent keys are safe.
/// - The store never interprets values.
/// - All I/O errors are propagated, never silently ignored.
pub trait Store: Send + Sync {
    /// Store `value` under `key`. No-op if the key already exists.
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()>;

    /// Fetch the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether a key exists.
    ///
    /// Default implementation calls `get()`. Backends should override when
    /// existence can be checked without reading the value.
    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: Store + ?Sized> Store for &S {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        (**self).contains(key)
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        (**self).contains(key)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn put(&self, key: &Digest, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        (**self).contains(key)
    }
}
