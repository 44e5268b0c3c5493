//! Hashing capabilities for MerkleDAG.
//!
//! The DAG never picks a hash algorithm on its own. Builders and readers are
//! handed a [`HashFactory`] at construction time and ask it for a fresh
//! [`Hasher`] for every object they hash, so concurrent hashing never shares
//! mutable state.
//!
//! - [`Blake3Factory`] -- BLAKE3, optionally domain-separated
//! - [`HasherPool`] -- recycles reset hashers from any factory, bounding the
//!   number of idle instances held in memory
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod hasher;
pub mod pool;

pub use hasher::{hash_bytes, Blake3Factory, Blake3Hasher, HashFactory, Hasher};
pub use pool::{HasherPool, PooledHasher};
