//! Path classification: entry kind, suffix-driven format detection and the
//! output naming rules shared by deflate and inflate.
//!
//! Everything here is a pure function of its inputs except [`PathSpec::stat`],
//! which performs a single `stat` of the input.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{LambdaError, Result};

/// Compression codecs known to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Fast, universally available.
    Gzip,
    /// Slower, higher ratio.
    Brotli,
}

impl Codec {
    /// File-name suffix, without the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            Codec::Gzip => "gz",
            Codec::Brotli => "br",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Codec::Gzip => "gzip",
            Codec::Brotli => "brotli",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// What an input path is, derived once when an operation starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSpec {
    path: PathBuf,
    kind: EntryKind,
    size: Option<u64>,
}

impl PathSpec {
    /// Stat `path` (following symlinks) and make it absolute.
    pub fn stat(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => LambdaError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => LambdaError::Io(err),
        })?;

        let (kind, size) = if metadata.is_dir() {
            (EntryKind::Directory, None)
        } else {
            (EntryKind::File, Some(metadata.len()))
        };

        Ok(Self {
            path: std::path::absolute(path)?,
            kind,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Byte size, files only.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Directories are always archived before compression; files never are.
    pub fn needs_archive(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// How an artifact was produced, as told by its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Format {
    pub codec: Option<Codec>,
    pub archived: bool,
}

impl Format {
    /// No codec, no container: a raw copy.
    pub const RAW: Format = Format {
        codec: None,
        archived: false,
    };
}

/// Recognised suffixes, longest first so `.tar.gz` wins over `.gz`.
const SUFFIXES: &[(&str, Format)] = &[
    (".tar.br", Format { codec: Some(Codec::Brotli), archived: true }),
    (".tar.gz", Format { codec: Some(Codec::Gzip), archived: true }),
    (".tbr", Format { codec: Some(Codec::Brotli), archived: true }),
    (".tgz", Format { codec: Some(Codec::Gzip), archived: true }),
    (".tar", Format { codec: None, archived: true }),
    (".br", Format { codec: Some(Codec::Brotli), archived: false }),
    (".gz", Format { codec: Some(Codec::Gzip), archived: false }),
];

/// Split a file name into its stem and the format named by its longest
/// recognised suffix, case-insensitively. Names without one are raw copies.
/// A bare suffix such as `.gz` has no stem and is also a raw copy.
pub fn detect(name: &str) -> (&str, Format) {
    let lower = name.to_ascii_lowercase();
    for (suffix, format) in SUFFIXES {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            return (&name[..name.len() - suffix.len()], *format);
        }
    }
    (name, Format::RAW)
}

/// Where deflate writes its artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Under a scratch directory (library form).
    Scratch(PathBuf),
    /// Next to the input (CLI form).
    Beside,
}

/// `<name>.tar.<codec>` for directories, `<name>.<codec>` for files.
pub fn deflate_output(input: &PathSpec, codec: Codec, placement: &Placement) -> Result<PathBuf> {
    let name = file_name(input.path())?;
    let artifact = if input.needs_archive() {
        format!("{name}.tar.{}", codec.suffix())
    } else {
        format!("{name}.{}", codec.suffix())
    };

    let dir = match placement {
        Placement::Scratch(dir) => dir.clone(),
        Placement::Beside => input
            .path()
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| LambdaError::InvalidPath {
                path: input.path().to_path_buf(),
            })?,
    };
    Ok(dir.join(artifact))
}

/// Strip the recognised suffix from `input`'s name and place it under `scratch`.
pub fn inflate_output(input: &Path, scratch: &Path) -> Result<(PathBuf, Format)> {
    let name = file_name(input)?;
    let (stem, format) = detect(&name);
    Ok((scratch.join(stem), format))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| LambdaError::InvalidPath {
            path: path.to_path_buf(),
        })
}
