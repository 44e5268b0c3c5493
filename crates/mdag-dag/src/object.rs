//! DAG object types.
//!
//! Objects are plain values: parents hold their children's digests, never
//! pointers, so a parent can only exist after every child it names has been
//! hashed. The graph is acyclic by construction.

use serde::{Deserialize, Serialize};

use mdag_types::Digest;

/// The kind of object a link points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Leaf with an inline payload.
    Blob,
    /// Fragmented file: ordered concatenation of its children.
    List,
    /// Directory: ordered, named children.
    Tree,
}

impl LinkKind {
    /// Wire tag byte.
    pub fn tag(self) -> u8 {
        match self {
            Self::Blob => 0x01,
            Self::List => 0x02,
            Self::Tree => 0x03,
        }
    }

    /// Parse a wire tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Blob),
            0x02 => Some(Self::List),
            0x03 => Some(Self::Tree),
            _ => None,
        }
    }

    /// Blob and List objects encode file content.
    pub fn is_file(self) -> bool {
        matches!(self, Self::Blob | Self::List)
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::List => write!(f, "list"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

/// A reference from a parent object to a child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Digest of the child object.
    pub digest: Digest,
    /// Raw bytes spanned by the child's subtree (not its encoded length).
    pub size: u64,
    /// Kind of the child object.
    pub kind: LinkKind,
    /// Entry name, present only on links out of a Tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    /// An unnamed link (List children, build results).
    pub fn new(digest: Digest, size: u64, kind: LinkKind) -> Self {
        Self {
            digest,
            size,
            kind,
            name: None,
        }
    }

    /// The same link carrying a directory entry name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A persisted DAG node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    /// Leaf chunk, payload carried inline.
    Blob { payload: Vec<u8> },
    /// Internal node of a fragmented file.
    List { links: Vec<Link> },
    /// Directory listing.
    Tree { links: Vec<Link> },
}

impl Object {
    /// The object's own kind.
    pub fn kind(&self) -> LinkKind {
        match self {
            Self::Blob { .. } => LinkKind::Blob,
            Self::List { .. } => LinkKind::List,
            Self::Tree { .. } => LinkKind::Tree,
        }
    }

    /// Outgoing links in order. Empty for blobs.
    pub fn links(&self) -> &[Link] {
        match self {
            Self::Blob { .. } => &[],
            Self::List { links } | Self::Tree { links } => links,
        }
    }

    /// Inline payload, for blobs only.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Blob { payload } => Some(payload),
            _ => None,
        }
    }

    /// Raw bytes spanned by this object's subtree, as declared by its links.
    ///
    /// `None` if the declared sizes overflow `u64`.
    pub fn declared_size(&self) -> Option<u64> {
        match self {
            Self::Blob { payload } => Some(payload.len() as u64),
            Self::List { links } | Self::Tree { links } => links
                .iter()
                .try_fold(0u64, |acc, link| acc.checked_add(link.size)),
        }
    }
}
