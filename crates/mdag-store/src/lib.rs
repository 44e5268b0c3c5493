//! Content-addressed object storage for MerkleDAG.
//!
//! A store is a plain `Digest -> bytes` mapping. It never interprets the
//! bytes and never computes digests itself: the DAG builder hashes each
//! serialized object and hands the store the key. Verification on read is
//! the DAG reader's job.
//!
//! # Storage Backends
//!
//! All backends implement the [`Store`] trait:
//!
//! - [`MemoryStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileStore`] -- one file per object under a two-level hex fan-out
//!
//! # Design Rules
//!
//! 1. `put` is idempotent: writing an existing key is a no-op success.
//! 2. Stored bytes are never changed in place by normal operation.
//! 3. Concurrent reads and writes of independent keys are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::Store;
