//! Tunables shared by every operation a [`Coordinator`](crate::Coordinator) runs.

use std::env;
use std::path::PathBuf;

use stream_codecs::BrotliPreference;

use crate::pipeline::DEFAULT_CHANNEL_DEPTH;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Where library-form artifacts and inflated outputs go. `None` uses the
    /// system temporary directory.
    pub scratch_dir: Option<PathBuf>,

    /// Chunk size of the file reader and the archiver.
    pub read_chunk_size: usize,

    /// Chunk size of the codec stages.
    pub codec_chunk_size: usize,

    /// Chunks buffered between two stages.
    pub channel_depth: usize,

    /// gzip compression level, 0-9.
    pub gzip_level: u32,

    pub brotli_preference: BrotliPreference,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            read_chunk_size: 1 << 23,
            codec_chunk_size: 1 << 21,
            channel_depth: DEFAULT_CHANNEL_DEPTH,
            gzip_level: 6,
            brotli_preference: BrotliPreference::default(),
        }
    }
}

impl PipelineSettings {
    /// The command-line preset: 1 MiB chunks throughout.
    pub fn cli() -> Self {
        Self {
            read_chunk_size: 1 << 20,
            codec_chunk_size: 1 << 20,
            ..Self::default()
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(env::temp_dir)
    }
}
