//! Input trees for the builder.
//!
//! A [`SourceNode`] is either a file (raw bytes) or a directory (ordered,
//! named children). The order a directory yields its children in becomes the
//! order of the Tree's links, and with it part of the digest.

use std::borrow::Cow;
use std::io;

/// Whether a source node is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// A file or directory the builder can ingest.
pub trait SourceNode: Send + Sync + Sized {
    /// File or directory.
    fn kind(&self) -> NodeKind;

    /// Byte length for files, number of children for directories.
    fn size(&self) -> u64;

    /// Raw content. Only called on files.
    fn bytes(&self) -> io::Result<Cow<'_, [u8]>>;

    /// Named children in their defined order. Only called on directories;
    /// a single traversal is sufficient.
    fn children(&self) -> io::Result<Vec<(String, Self)>>;
}

/// In-memory source tree, for tests and embedding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemNode {
    File(Vec<u8>),
    Dir(Vec<(String, MemNode)>),
}

impl MemNode {
    /// A file node.
    pub fn file(content: impl Into<Vec<u8>>) -> Self {
        Self::File(content.into())
    }

    /// An empty directory.
    pub fn dir() -> Self {
        Self::Dir(Vec::new())
    }

    /// Append a child to a directory, keeping insertion order.
    ///
    /// Has no effect on file nodes.
    pub fn with(mut self, name: impl Into<String>, child: MemNode) -> Self {
        if let Self::Dir(entries) = &mut self {
            entries.push((name.into(), child));
        }
        self
    }
}

fn not_a(kind: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("node is not a {kind}"))
}

impl SourceNode for MemNode {
    fn kind(&self) -> NodeKind {
        match self {
            Self::File(_) => NodeKind::File,
            Self::Dir(_) => NodeKind::Directory,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Self::File(data) => data.len() as u64,
            Self::Dir(entries) => entries.len() as u64,
        }
    }

    fn bytes(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Self::File(data) => Ok(Cow::Borrowed(data)),
            Self::Dir(_) => Err(not_a("file")),
        }
    }

    fn children(&self) -> io::Result<Vec<(String, Self)>> {
        match self {
            Self::Dir(entries) => Ok(entries.clone()),
            Self::File(_) => Err(not_a("directory")),
        }
    }
}
