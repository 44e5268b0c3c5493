//! Error types for DAG construction, encoding, and reconstruction.

use mdag_store::StoreError;
use mdag_types::Digest;

use crate::object::LinkKind;

/// Reasons a byte sequence is not a valid encoded object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input ended in the middle of a field.
    #[error("unexpected end of input while reading {0}")]
    Truncated(&'static str),

    /// The leading version byte is not one this codec understands.
    #[error("unsupported encoding version: {0}")]
    UnsupportedVersion(u8),

    /// Object tag byte is not Blob, List or Tree.
    #[error("unknown object tag: {0:#04x}")]
    UnknownTag(u8),

    /// Link kind byte is not Blob, List or Tree.
    #[error("unknown link kind: {0:#04x}")]
    UnknownLinkKind(u8),

    /// Name presence flag is neither 0 nor 1.
    #[error("invalid name flag: {0:#04x}")]
    InvalidNameFlag(u8),

    /// A varint does not fit in 64 bits.
    #[error("varint overflow")]
    VarintOverflow,

    /// A varint carries redundant trailing zero groups.
    #[error("non-canonical varint encoding")]
    NonCanonicalVarint,

    /// A declared length does not fit in memory on this platform.
    #[error("declared length {0} exceeds addressable memory")]
    LengthOverflow(u64),

    /// A link name is not valid UTF-8.
    #[error("link name is not valid UTF-8")]
    InvalidName,

    /// Link sizes sum past `u64::MAX`.
    #[error("declared link sizes overflow")]
    SizeOverflow,

    /// Tags, link counts or link kinds contradict each other.
    #[error("inconsistent object: {0}")]
    Inconsistent(String),

    /// A link's declared kind disagrees with the object it points to.
    #[error("link declares a {declared} but the object is a {actual}")]
    LinkKindMismatch { declared: LinkKind, actual: LinkKind },

    /// Bytes remain after a complete object.
    #[error("{0} trailing bytes after object")]
    TrailingBytes(usize),
}

/// Errors that can occur while building or reading a DAG.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// The backing store failed. Not retried internally.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A digest is absent from the store.
    #[error("object not found: {0}")]
    NotFound(Digest),

    /// Stored bytes do not decode to a valid object.
    #[error("corrupt object {digest}: {source}")]
    CorruptObject {
        /// Key the bytes were stored under.
        digest: Digest,
        #[source]
        source: CodecError,
    },

    /// The hash of the retrieved bytes is not the digest they were requested by.
    #[error("integrity error: expected {expected}, computed {computed}")]
    IntegrityError {
        /// The requested digest.
        expected: Digest,
        /// Hash of the bytes actually returned by the store.
        computed: Digest,
    },

    /// A link's declared size disagrees with the recomputed subtree size.
    #[error("size mismatch for {digest}: link declares {declared} bytes, subtree holds {actual}")]
    SizeMismatch {
        digest: Digest,
        declared: u64,
        actual: u64,
    },

    /// The object exists but is the wrong kind for the requested operation.
    #[error("unexpected object kind for {digest}: expected {expected}, found {actual}")]
    UnexpectedKind {
        digest: Digest,
        expected: LinkKind,
        actual: LinkKind,
    },

    /// A directory has more entries than one Tree object may link.
    #[error("directory has {entries} entries, fan-out limit is {fan_out}")]
    FanOutExceeded { entries: usize, fan_out: usize },

    /// Reading the source tree failed.
    #[error("source error: {0}")]
    Source(#[from] std::io::Error),

    /// Writing reconstructed content to the output failed.
    #[error("output error: {0}")]
    Sink(#[source] std::io::Error),

    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
