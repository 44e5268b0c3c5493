//! Ingest source trees into the store.
//!
//! Files are split into leaves, leaves are grouped bottom-up into Lists of
//! at most `fan_out` links, and directories become Trees whose links keep
//! the source's child order. Every object is stored under the hash of its
//! own encoding, so a parent can only be written once all its children
//! have been.

use rayon::prelude::*;
use tracing::{debug, trace};

use mdag_crypto::{hash_bytes, HashFactory};
use mdag_store::Store;
use mdag_types::Digest;

use crate::cancel::CancelToken;
use crate::chunker::Chunker;
use crate::codec;
use crate::config::DagConfig;
use crate::error::{DagError, DagResult};
use crate::object::{Link, LinkKind, Object};
use crate::source::{NodeKind, SourceNode};

/// Builds Merkle DAGs into a [`Store`] using an injected [`HashFactory`].
///
/// A builder holds no state between calls; each build is self-contained
/// and may run concurrently with others on the same builder.
pub struct DagBuilder<S, H> {
    store: S,
    hasher: H,
    config: DagConfig,
    chunker: Chunker,
    cancel: CancelToken,
}

impl<S: Store, H: HashFactory> DagBuilder<S, H> {
    /// Create a builder. Fails if `config` has unusable bounds.
    pub fn new(store: S, hasher: H, config: DagConfig) -> DagResult<Self> {
        let chunker = config.chunker()?;
        Ok(Self {
            store,
            hasher,
            config,
            chunker,
            cancel: CancelToken::new(),
        })
    }

    /// Stop issuing store calls once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest a file or directory and return the unnamed link to its root.
    pub fn build<N: SourceNode>(&self, node: &N) -> DagResult<Link> {
        let link = match node.kind() {
            NodeKind::File => {
                let bytes = node.bytes()?;
                self.file_link(&bytes)?
            }
            NodeKind::Directory => self.dir_link(node)?,
        };
        debug!(
            root = %link.digest.short_hex(),
            kind = %link.kind,
            size = link.size,
            "build complete"
        );
        Ok(link)
    }

    /// Ingest a byte sequence as a file. Returns the root digest and
    /// `data.len()`.
    pub fn build_file(&self, data: &[u8]) -> DagResult<(Digest, u64)> {
        let link = self.file_link(data)?;
        Ok((link.digest, link.size))
    }

    /// Ingest a directory and return its Tree digest.
    pub fn build_dir<N: SourceNode>(&self, node: &N) -> DagResult<Digest> {
        if node.kind() != NodeKind::Directory {
            return Err(DagError::Source(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "build_dir called on a file node",
            )));
        }
        Ok(self.dir_link(node)?.digest)
    }

    fn file_link(&self, data: &[u8]) -> DagResult<Link> {
        let leaves = self.chunker.split(data);
        let mut level = self.map_ordered(leaves, |chunk| self.put_blob(chunk))?;

        // A single leaf is the whole file; no List wrapper.
        if level.len() == 1 {
            return Ok(level.remove(0));
        }

        let mut height = 0usize;
        while level.len() > self.chunker.fan_out() {
            let groups = self.chunker.group(level);
            level = self.map_ordered(groups, |links| self.put_list(links))?;
            height += 1;
        }
        let root = self.put_list(level)?;
        trace!(
            root = %root.digest.short_hex(),
            size = data.len(),
            height = height + 1,
            "file built"
        );
        Ok(root)
    }

    fn dir_link<N: SourceNode>(&self, node: &N) -> DagResult<Link> {
        let children = node.children()?;
        if children.len() > self.chunker.fan_out() {
            return Err(DagError::FanOutExceeded {
                entries: children.len(),
                fan_out: self.chunker.fan_out(),
            });
        }
        let links = self.map_ordered(children, |(name, child)| {
            let link = match child.kind() {
                NodeKind::File => {
                    let bytes = child.bytes()?;
                    self.file_link(&bytes)?
                }
                NodeKind::Directory => self.dir_link(&child)?,
            };
            Ok(link.named(name))
        })?;

        let size = links.iter().map(|l| l.size).sum();
        let entries = links.len();
        let digest = self.put_object(&Object::Tree { links })?;
        trace!(digest = %digest.short_hex(), entries, size, "tree stored");
        Ok(Link::new(digest, size, LinkKind::Tree))
    }

    fn put_blob(&self, chunk: &[u8]) -> DagResult<Link> {
        let size = chunk.len() as u64;
        let digest = self.put_object(&Object::Blob {
            payload: chunk.to_vec(),
        })?;
        Ok(Link::new(digest, size, LinkKind::Blob))
    }

    fn put_list(&self, links: Vec<Link>) -> DagResult<Link> {
        let size = links.iter().map(|l| l.size).sum();
        let digest = self.put_object(&Object::List { links })?;
        Ok(Link::new(digest, size, LinkKind::List))
    }

    /// Encode, hash with a fresh hasher, and store.
    fn put_object(&self, object: &Object) -> DagResult<Digest> {
        self.cancel.check()?;
        let bytes = codec::serialize(object);
        let digest = hash_bytes(&self.hasher, &bytes);
        self.store.put(&digest, &bytes)?;
        trace!(
            digest = %digest.short_hex(),
            kind = %object.kind(),
            encoded = bytes.len(),
            "object stored"
        );
        Ok(digest)
    }

    /// Map siblings to links, in parallel when configured, keeping order.
    /// The first failure aborts the whole level.
    fn map_ordered<T, F>(&self, items: Vec<T>, f: F) -> DagResult<Vec<Link>>
    where
        T: Send,
        F: Fn(T) -> DagResult<Link> + Send + Sync,
    {
        if self.config.parallel && items.len() > 1 {
            items.into_par_iter().map(f).collect()
        } else {
            items.into_iter().map(f).collect()
        }
    }
}

impl<S, H> std::fmt::Debug for DagBuilder<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagBuilder")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
