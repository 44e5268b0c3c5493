//! Filesystem adapters: a [`SourceNode`] over real paths, and writing a
//! reconstructed [`Content`] back to disk.

use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::reader::Content;
use crate::source::{NodeKind, SourceNode};

/// A file or directory on the local filesystem.
///
/// Directory children are yielded sorted by file name, so the same tree on
/// any machine builds to the same digest. Symlinks are followed.
#[derive(Clone, Debug)]
pub struct FsNode {
    path: PathBuf,
    kind: NodeKind,
    // File length from metadata; directories count entries on demand.
    len: u64,
}

impl FsNode {
    /// Inspect `path`. Fails on anything that is neither a regular file nor
    /// a directory.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path)?;
        let kind = if meta.is_file() {
            NodeKind::File
        } else if meta.is_dir() {
            NodeKind::Directory
        } else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is neither a file nor a directory", path.display()),
            ));
        };
        Ok(Self {
            path,
            kind,
            len: meta.len(),
        })
    }

    /// The path this node reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceNode for FsNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    /// For directories this reads the directory; an unreadable one counts
    /// as empty here and fails later in `children`.
    fn size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.len,
            NodeKind::Directory => std::fs::read_dir(&self.path)
                .map(|entries| entries.count() as u64)
                .unwrap_or(0),
        }
    }

    fn bytes(&self) -> io::Result<Cow<'_, [u8]>> {
        std::fs::read(&self.path).map(Cow::Owned)
    }

    fn children(&self) -> io::Result<Vec<(String, Self)>> {
        let mut children = Vec::new();
        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry.file_name().to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name under {}", self.path.display()),
                )
            })?;
            children.push((name.to_owned(), FsNode::open(entry.path())?));
        }
        Ok(children)
    }
}

/// Write `content` to `dest`: a file for file content, a directory tree
/// for directory content. Existing files are overwritten.
///
/// Entry names must be single, normal path components; anything that could
/// escape `dest` (`..`, separators, absolute paths) is rejected.
pub fn materialize(content: &Content, dest: &Path) -> io::Result<()> {
    match content {
        Content::File(bytes) => {
            std::fs::write(dest, bytes)?;
            debug!(path = %dest.display(), size = bytes.len(), "wrote file");
        }
        Content::Directory(entries) => {
            std::fs::create_dir_all(dest)?;
            for entry in entries {
                check_entry_name(&entry.name)?;
                materialize(&entry.content, &dest.join(&entry.name))?;
            }
            debug!(path = %dest.display(), entries = entries.len(), "wrote directory");
        }
    }
    Ok(())
}

fn check_entry_name(name: &str) -> io::Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("refusing to materialize entry named {name:?}"),
        )),
    }
}
