use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mdag_types::Digest;
use tracing::trace;

use crate::hasher::{HashFactory, Hasher};

/// Recycling wrapper around a [`HashFactory`].
///
/// Hashers handed out by the pool return to it when dropped, already reset,
/// so a long build reuses a handful of instances instead of allocating one
/// per object. At most `max_idle` instances are retained; extras are dropped.
/// Every checked-out hasher is exclusively owned, so the pool never shares a
/// hasher between concurrent operations.
pub struct HasherPool<F: HashFactory> {
    inner: Arc<PoolInner<F>>,
}

struct PoolInner<F: HashFactory> {
    factory: F,
    idle: Mutex<Vec<F::Hasher>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl<F: HashFactory> HasherPool<F> {
    /// Default number of idle hashers retained.
    pub const DEFAULT_MAX_IDLE: usize = 64;

    /// Pool over `factory` retaining up to [`Self::DEFAULT_MAX_IDLE`] idle hashers.
    pub fn new(factory: F) -> Self {
        Self::with_max_idle(factory, Self::DEFAULT_MAX_IDLE)
    }

    /// Pool over `factory` retaining up to `max_idle` idle hashers.
    pub fn with_max_idle(factory: F, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory,
                idle: Mutex::new(Vec::new()),
                max_idle,
                created: AtomicUsize::new(0),
            }),
        }
    }

    /// Total hashers ever allocated from the underlying factory.
    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::Relaxed)
    }

    /// Hashers currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.inner.idle.lock().expect("lock poisoned").len()
    }

    /// Upper bound on idle hashers.
    pub fn max_idle(&self) -> usize {
        self.inner.max_idle
    }
}

impl<F: HashFactory> Clone for HasherPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: HashFactory> std::fmt::Debug for HasherPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasherPool")
            .field("created", &self.created())
            .field("idle", &self.idle())
            .field("max_idle", &self.inner.max_idle)
            .finish()
    }
}

impl<F: HashFactory> HashFactory for HasherPool<F> {
    type Hasher = PooledHasher<F>;

    fn new_hasher(&self) -> PooledHasher<F> {
        let recycled = self.inner.idle.lock().expect("lock poisoned").pop();
        let hasher = match recycled {
            Some(hasher) => hasher,
            None => {
                let n = self.inner.created.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(created = n, "allocating hasher");
                self.inner.factory.new_hasher()
            }
        };
        PooledHasher {
            hasher: Some(hasher),
            pool: Arc::clone(&self.inner),
        }
    }
}

/// A hasher checked out of a [`HasherPool`]; returns itself on drop.
pub struct PooledHasher<F: HashFactory> {
    // `None` only while being returned in `drop`.
    hasher: Option<F::Hasher>,
    pool: Arc<PoolInner<F>>,
}

impl<F: HashFactory> PooledHasher<F> {
    fn inner(&self) -> &F::Hasher {
        self.hasher.as_ref().expect("pooled hasher already released")
    }

    fn inner_mut(&mut self) -> &mut F::Hasher {
        self.hasher.as_mut().expect("pooled hasher already released")
    }
}

impl<F: HashFactory> Hasher for PooledHasher<F> {
    fn reset(&mut self) {
        self.inner_mut().reset();
    }

    fn write(&mut self, data: &[u8]) {
        self.inner_mut().write(data);
    }

    fn sum(&self) -> Digest {
        self.inner().sum()
    }
}

impl<F: HashFactory> Drop for PooledHasher<F> {
    fn drop(&mut self) {
        if let Some(mut hasher) = self.hasher.take() {
            let mut idle = self.pool.idle.lock().expect("lock poisoned");
            if idle.len() < self.pool.max_idle {
                hasher.reset();
                idle.push(hasher);
            }
        }
    }
}
