//! Foundation types for MerkleDAG.
//!
//! Every other MerkleDAG crate depends on `mdag-types`. The crate is
//! deliberately tiny: it only knows what a digest *is*, never how one is
//! computed. Hash functions are injected through `mdag-crypto`.
//!
//! # Key Types
//!
//! - [`Digest`] -- 32-byte content identifier, doubling as the store key
//! - [`TypeError`] -- parsing failures for hex-encoded digests

pub mod digest;
pub mod error;

pub use digest::{Digest, DIGEST_LEN};
pub use error::TypeError;
