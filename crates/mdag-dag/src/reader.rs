//! Resolve digests back into objects and reassemble the original content.
//!
//! Every object is checked against the digest it was requested by before it
//! is decoded, so a store can never hand back content for the wrong key.

use std::collections::HashMap;
use std::io::Write;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use mdag_crypto::{hash_bytes, HashFactory};
use mdag_store::Store;
use mdag_types::Digest;

use crate::cancel::CancelToken;
use crate::codec;
use crate::config::DagConfig;
use crate::error::{CodecError, DagError, DagResult};
use crate::object::{Link, LinkKind, Object};

/// Reconstructed content of a DAG root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// The bytes of a file.
    File(Vec<u8>),
    /// Named entries of a directory, in link order.
    Directory(Vec<DirEntry>),
}

/// One named entry of a reconstructed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub content: Content,
}

impl Content {
    /// Raw bytes spanned: file length, or the sum over all files beneath a
    /// directory.
    pub fn size(&self) -> u64 {
        match self {
            Self::File(bytes) => bytes.len() as u64,
            Self::Directory(entries) => entries.iter().map(|e| e.content.size()).sum(),
        }
    }

    pub fn as_file(&self) -> Option<&[u8]> {
        match self {
            Self::File(bytes) => Some(bytes),
            Self::Directory(_) => None,
        }
    }

    pub fn entries(&self) -> Option<&[DirEntry]> {
        match self {
            Self::Directory(entries) => Some(entries),
            Self::File(_) => None,
        }
    }

    /// Look up a directory entry by name.
    pub fn get(&self, name: &str) -> Option<&Content> {
        self.entries()?
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.content)
    }
}

/// Summary of a full DAG walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// The digest the walk started from.
    pub root: Digest,
    /// Distinct objects visited.
    pub objects: u64,
    pub blobs: u64,
    pub lists: u64,
    pub trees: u64,
    /// Raw bytes spanned by the root.
    pub total_bytes: u64,
    /// Largest Blob payload seen.
    pub max_payload: u64,
    /// Largest link count seen on a List or Tree.
    pub max_links: u64,
}

/// Reads DAGs out of a [`Store`], verifying every object against its digest.
pub struct DagReader<S, H> {
    store: S,
    hasher: H,
    config: DagConfig,
    cancel: CancelToken,
}

impl<S: Store, H: HashFactory> DagReader<S, H> {
    /// Create a reader. `hasher` must be the factory the DAG was built with.
    pub fn new(store: S, hasher: H, config: DagConfig) -> DagResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            hasher,
            config,
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

    /// Fetch, verify and decode a single object.
    pub fn resolve(&self, digest: &Digest) -> DagResult<Object> {
        self.cancel.check()?;
        let bytes = self
            .store
            .get(digest)?
            .ok_or(DagError::NotFound(*digest))?;

        let computed = hash_bytes(&self.hasher, &bytes);
        if computed != *digest {
            return Err(DagError::IntegrityError {
                expected: *digest,
                computed,
            });
        }

        let object = codec::deserialize(&bytes).map_err(|source| DagError::CorruptObject {
            digest: *digest,
            source,
        })?;
        trace!(digest = %digest.short_hex(), kind = %object.kind(), "resolved");
        Ok(object)
    }

    /// Rebuild the file or directory rooted at `digest`.
    pub fn reconstruct(&self, digest: &Digest) -> DagResult<Content> {
        let object = self.resolve(digest)?;
        let content = self.content_of(digest, object)?;
        debug!(root = %digest.short_hex(), size = content.size(), "reconstructed");
        Ok(content)
    }

    /// Rebuild the file rooted at `digest`. Fails on a directory.
    pub fn read_file(&self, digest: &Digest) -> DagResult<Vec<u8>> {
        let object = self.resolve(digest)?;
        self.file_bytes(digest, object)
    }

    /// Stream the file rooted at `digest` into `out`, one leaf at a time.
    /// Returns the number of bytes written.
    pub fn write_file<W: Write>(&self, digest: &Digest, out: &mut W) -> DagResult<u64> {
        let object = self.resolve(digest)?;
        if object.kind() == LinkKind::Tree {
            return Err(DagError::UnexpectedKind {
                digest: *digest,
                expected: LinkKind::List,
                actual: LinkKind::Tree,
            });
        }
        let written = self.stream(object, out)?;
        out.flush().map_err(DagError::Sink)?;
        Ok(written)
    }

    /// The entries of the directory at `digest`.
    pub fn list(&self, digest: &Digest) -> DagResult<Vec<Link>> {
        match self.resolve(digest)? {
            Object::Tree { links } => Ok(links),
            other => Err(DagError::UnexpectedKind {
                digest: *digest,
                expected: LinkKind::Tree,
                actual: other.kind(),
            }),
        }
    }

    /// Walk every object reachable from `digest`, checking digests, link
    /// kinds and declared sizes regardless of `verify_sizes`.
    pub fn verify(&self, digest: &Digest) -> DagResult<VerifyReport> {
        let mut report = VerifyReport {
            root: *digest,
            objects: 0,
            blobs: 0,
            lists: 0,
            trees: 0,
            total_bytes: 0,
            max_payload: 0,
            max_links: 0,
        };
        let mut seen = HashMap::new();
        let object = self.resolve(digest)?;
        report.total_bytes = self.verify_object(digest, object, &mut seen, &mut report)?;
        debug!(
            root = %digest.short_hex(),
            objects = report.objects,
            bytes = report.total_bytes,
            "verified"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Resolve the target of `link` and check it is the kind the link says.
    fn follow(&self, link: &Link) -> DagResult<Object> {
        let object = self.resolve(&link.digest)?;
        if object.kind() != link.kind {
            return Err(DagError::CorruptObject {
                digest: link.digest,
                source: CodecError::LinkKindMismatch {
                    declared: link.kind,
                    actual: object.kind(),
                },
            });
        }
        Ok(object)
    }

    fn check_size(&self, link: &Link, actual: u64) -> DagResult<()> {
        if self.config.verify_sizes && link.size != actual {
            return Err(DagError::SizeMismatch {
                digest: link.digest,
                declared: link.size,
                actual,
            });
        }
        Ok(())
    }

    fn content_of(&self, digest: &Digest, object: Object) -> DagResult<Content> {
        match object {
            Object::Tree { links } => {
                let entries = self.map_ordered(links, |link| {
                    let child = self.follow(&link)?;
                    let content = self.content_of(&link.digest, child)?;
                    self.check_size(&link, content.size())?;
                    Ok(DirEntry {
                        name: link.name.unwrap_or_default(),
                        content,
                    })
                })?;
                Ok(Content::Directory(entries))
            }
            file => Ok(Content::File(self.file_bytes(digest, file)?)),
        }
    }

    fn file_bytes(&self, digest: &Digest, object: Object) -> DagResult<Vec<u8>> {
        match object {
            Object::Blob { payload } => Ok(payload),
            Object::List { links } => {
                let parts = self.map_ordered(links, |link| {
                    let child = self.follow(&link)?;
                    let bytes = self.file_bytes(&link.digest, child)?;
                    self.check_size(&link, bytes.len() as u64)?;
                    Ok(bytes)
                })?;
                Ok(parts.concat())
            }
            Object::Tree { .. } => Err(DagError::UnexpectedKind {
                digest: *digest,
                expected: LinkKind::List,
                actual: LinkKind::Tree,
            }),
        }
    }

    fn stream<W: Write>(&self, object: Object, out: &mut W) -> DagResult<u64> {
        match object {
            Object::Blob { payload } => {
                out.write_all(&payload).map_err(DagError::Sink)?;
                Ok(payload.len() as u64)
            }
            Object::List { links } => {
                let mut written = 0;
                for link in &links {
                    let n = self.stream(self.follow(link)?, out)?;
                    self.check_size(link, n)?;
                    written += n;
                }
                Ok(written)
            }
            // Lists never link Trees; the codec rejects them.
            Object::Tree { .. } => Ok(0),
        }
    }

    /// Returns the raw size of the subtree. Size and kind are memoized per
    /// digest in `seen`.
    fn verify_object(
        &self,
        digest: &Digest,
        object: Object,
        seen: &mut HashMap<Digest, (u64, LinkKind)>,
        report: &mut VerifyReport,
    ) -> DagResult<u64> {
        report.objects += 1;
        let kind = object.kind();
        let size = match object {
            Object::Blob { payload } => {
                report.blobs += 1;
                report.max_payload = report.max_payload.max(payload.len() as u64);
                payload.len() as u64
            }
            Object::List { links } => {
                report.lists += 1;
                self.verify_links(&links, seen, report)?
            }
            Object::Tree { links } => {
                report.trees += 1;
                self.verify_links(&links, seen, report)?
            }
        };
        seen.insert(*digest, (size, kind));
        Ok(size)
    }

    fn verify_links(
        &self,
        links: &[Link],
        seen: &mut HashMap<Digest, (u64, LinkKind)>,
        report: &mut VerifyReport,
    ) -> DagResult<u64> {
        report.max_links = report.max_links.max(links.len() as u64);
        let mut total = 0u64;
        for link in links {
            let actual = match seen.get(&link.digest) {
                Some(&(_, kind)) if kind != link.kind => {
                    return Err(DagError::CorruptObject {
                        digest: link.digest,
                        source: CodecError::LinkKindMismatch {
                            declared: link.kind,
                            actual: kind,
                        },
                    });
                }
                Some(&(size, _)) => size,
                None => {
                    let child = self.follow(link)?;
                    self.verify_object(&link.digest, child, seen, report)?
                }
            };
            if link.size != actual {
                return Err(DagError::SizeMismatch {
                    digest: link.digest,
                    declared: link.size,
                    actual,
                });
            }
            total = total.saturating_add(actual);
        }
        Ok(total)
    }

    /// Map sibling links, in parallel when configured, keeping order.
    fn map_ordered<T, F>(&self, links: Vec<Link>, f: F) -> DagResult<Vec<T>>
    where
        T: Send,
        F: Fn(Link) -> DagResult<T> + Send + Sync,
    {
        if self.config.parallel && links.len() > 1 {
            links.into_par_iter().map(f).collect()
        } else {
            links.into_iter().map(f).collect()
        }
    }
}

impl<S, H> std::fmt::Debug for DagReader<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagReader")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
