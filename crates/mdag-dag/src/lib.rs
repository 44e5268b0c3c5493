//! Merkle DAG construction and reconstruction.
//!
//! Files are split into fixed-size leaves ([`Chunker`]), leaves are linked
//! bottom-up into Lists of bounded fan-out, and directories become Trees of
//! named links. Every object is encoded canonically ([`codec`]), hashed with
//! an injected [`HashFactory`](mdag_crypto::HashFactory) and written to a
//! [`Store`](mdag_store::Store) under that digest. The root digest alone is
//! enough to get the exact original content back.
//!
//! - [`DagBuilder`] -- [`SourceNode`] to root digest
//! - [`DagReader`] -- root digest to verified [`Content`]
//! - [`MemNode`] / [`FsNode`] -- in-memory and on-disk sources
//! - [`materialize`] -- write reconstructed content back to disk
//!
//! # Invariants
//!
//! 1. `digest(O) == hash(serialize(O))` for every stored object.
//! 2. Identical input and configuration give identical digests.
//! 3. Blob payloads never exceed `leaf_size`; Lists and Trees never exceed
//!    `fan_out` links.
//! 4. Tree links keep the source's child order and names verbatim.

pub mod builder;
pub mod cancel;
pub mod chunker;
pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod object;
pub mod reader;
pub mod source;

pub use builder::DagBuilder;
pub use cancel::CancelToken;
pub use chunker::{ChunkPlan, Chunker};
pub use config::DagConfig;
pub use error::{CodecError, DagError, DagResult};
pub use fs::{materialize, FsNode};
pub use object::{Link, LinkKind, Object};
pub use reader::{Content, DagReader, DirEntry, VerifyReport};
pub use source::{MemNode, NodeKind, SourceNode};
