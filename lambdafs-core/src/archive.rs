//! Tar archiving of directory trees.
//!
//! [`Packer`] stands in for the file reader when the input is a directory and
//! [`Unpacker`] stands in for the file writer when the artifact is a tarball.
//! Entry paths are relative to the archived root, so a tree packed from `d`
//! unpacks into whatever directory the caller names.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tar::{Archive, Builder};
use walkdir::WalkDir;

use crate::stage::{Stage, StageIo, StageKind};

/// Source stage: walks `root` and emits it as a tar stream.
#[derive(Debug)]
pub struct Packer {
    root: PathBuf,
    chunk_size: usize,
}

impl Packer {
    pub fn new(root: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            root: root.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Stage for Packer {
    fn kind(&self) -> StageKind {
        StageKind::Packer
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let writer = io.writer()?;
        let entries = pack_tree(&self.root, &mut *writer)?;
        debug!("packed {entries} entries from {}", self.root.display());
        writer.flush()
    }
}

/// Write `root`'s contents to `writer` as a tar stream and return the number
/// of entries. Symlinks are stored as links.
pub fn pack_tree<W: Write>(root: &Path, writer: W) -> io::Result<usize> {
    let mut builder = Builder::new(writer);
    builder.follow_symlinks(false);

    let mut entries = 0;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let name = entry
            .path()
            .strip_prefix(root)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        if entry.file_type().is_dir() {
            builder.append_dir(name, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), name)?;
        }
        entries += 1;
    }

    builder.finish()?;
    Ok(entries)
}

/// Sink stage: unpacks a tar stream under `root`, creating it if needed.
#[derive(Debug)]
pub struct Unpacker {
    root: PathBuf,
}

impl Unpacker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Stage for Unpacker {
    fn kind(&self) -> StageKind {
        StageKind::Unpacker
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let reader = io.reader()?;
        fs::create_dir_all(&self.root)?;

        let mut archive = Archive::new(reader);
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive.set_overwrite(true);
        archive.unpack(&self.root)?;

        debug!("unpacked into {}", self.root.display());
        Ok(())
    }
}
