use std::sync::Arc;

use mdag_types::Digest;

/// A stateful, incremental hash computation.
///
/// Instances are never shared between concurrently running hash operations;
/// each operation obtains its own from a [`HashFactory`].
pub trait Hasher: Send {
    /// Return to the initial state, discarding everything written so far.
    fn reset(&mut self);

    /// Feed more bytes into the computation.
    fn write(&mut self, data: &[u8]);

    /// The digest of everything written since the last reset.
    ///
    /// Does not modify the state: further writes continue the same stream.
    fn sum(&self) -> Digest;
}

/// Produces independent [`Hasher`] instances.
///
/// Safe to call repeatedly and from many threads at once.
pub trait HashFactory: Send + Sync {
    type Hasher: Hasher;

    /// A fresh hasher in its initial state.
    fn new_hasher(&self) -> Self::Hasher;
}

impl<F: HashFactory + ?Sized> HashFactory for &F {
    type Hasher = F::Hasher;

    fn new_hasher(&self) -> Self::Hasher {
        (**self).new_hasher()
    }
}

impl<F: HashFactory + ?Sized> HashFactory for Arc<F> {
    type Hasher = F::Hasher;

    fn new_hasher(&self) -> Self::Hasher {
        (**self).new_hasher()
    }
}

/// Hash a single buffer with a freshly obtained hasher.
pub fn hash_bytes<F: HashFactory + ?Sized>(factory: &F, data: &[u8]) -> Digest {
    let mut hasher = factory.new_hasher();
    hasher.write(data);
    hasher.sum()
}

/// BLAKE3 hasher with an optional domain tag.
///
/// When a domain is set, `"<domain>:"` is fed into the state on creation and
/// after every [`reset`](Hasher::reset), so two factories with different
/// domains never agree on a digest.
#[derive(Clone)]
pub struct Blake3Hasher {
    inner: blake3::Hasher,
    domain: Option<&'static str>,
}

impl Blake3Hasher {
    fn new(domain: Option<&'static str>) -> Self {
        let mut hasher = Self {
            inner: blake3::Hasher::new(),
            domain,
        };
        hasher.apply_domain();
        hasher
    }

    fn apply_domain(&mut self) {
        if let Some(domain) = self.domain {
            self.inner.update(domain.as_bytes());
            self.inner.update(b":");
        }
    }
}

impl Hasher for Blake3Hasher {
    fn reset(&mut self) {
        self.inner.reset();
        self.apply_domain();
    }

    fn write(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn sum(&self) -> Digest {
        Digest::new(*self.inner.finalize().as_bytes())
    }
}

/// Factory for [`Blake3Hasher`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Factory {
    domain: Option<&'static str>,
}

impl Blake3Factory {
    /// Plain BLAKE3, no domain separation.
    pub const PLAIN: Self = Self { domain: None };
    /// Domain used for MerkleDAG objects by the CLI.
    pub const OBJECT: Self = Self {
        domain: Some("mdag-object-v1"),
    };

    /// Plain BLAKE3 factory.
    pub const fn new() -> Self {
        Self::PLAIN
    }

    /// Factory whose hashers are separated by a custom domain tag.
    pub const fn with_domain(domain: &'static str) -> Self {
        Self {
            domain: Some(domain),
        }
    }

    /// The domain tag, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain
    }
}

impl HashFactory for Blake3Factory {
    type Hasher = Blake3Hasher;

    fn new_hasher(&self) -> Blake3Hasher {
        Blake3Hasher::new(self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_matches_blake3() {
        let d = hash_bytes(&Blake3Factory::new(), b"hello world");
        assert_eq!(d.as_bytes(), blake3::hash(b"hello world").as_bytes());
    }

    #[test]
    fn hash_is_deterministic() {
        let f = Blake3Factory::OBJECT;
        assert_eq!(hash_bytes(&f, b"data"), hash_bytes(&f, b"data"));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let plain = hash_bytes(&Blake3Factory::PLAIN, data);
        let object = hash_bytes(&Blake3Factory::OBJECT, data);
        let custom = hash_bytes(&Blake3Factory::with_domain("my-domain-v1"), data);
        assert_ne!(plain, object);
        assert_ne!(object, custom);
        assert_ne!(plain, custom);
    }

    #[test]
    fn incremental_writes_match_single_write() {
        let f = Blake3Factory::OBJECT;
        let mut h = f.new_hasher();
        h.write(b"hello ");
        h.write(b"world");
        assert_eq!(h.sum(), hash_bytes(&f, b"hello world"));
    }

    #[test]
    fn reset_restores_initial_state_including_domain() {
        let f = Blake3Factory::OBJECT;
        let mut h = f.new_hasher();
        h.write(b"garbage");
        h.reset();
        h.write(b"payload");
        assert_eq!(h.sum(), hash_bytes(&f, b"payload"));
    }

    #[test]
    fn sum_does_not_consume_state() {
        let f = Blake3Factory::new();
        let mut h = f.new_hasher();
        h.write(b"ab");
        let first = h.sum();
        assert_eq!(first, h.sum());
        h.write(b"c");
        assert_eq!(h.sum(), hash_bytes(&f, b"abc"));
    }

    #[test]
    fn factory_through_reference_and_arc() {
        let f = Blake3Factory::OBJECT;
        let arc = Arc::new(f);
        assert_eq!(hash_bytes(&&f, b"x"), hash_bytes(&arc, b"x"));
        assert_eq!(f.domain(), Some("mdag-object-v1"));
        assert_eq!(Blake3Factory::new().domain(), None);
    }
}
