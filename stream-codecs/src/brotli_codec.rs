use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use crate::external;
use crate::DEFAULT_BUFFER_SIZE;

/// Largest sliding window brotli supports (BROTLI_MAX_WINDOW_BITS).
pub const MAX_WINDOW_BITS: u32 = 24;
/// Largest input block (BROTLI_MAX_INPUT_BLOCK_BITS).
pub const MAX_INPUT_BLOCK_BITS: u32 = 24;
/// Highest quality setting (BROTLI_MAX_QUALITY).
pub const MAX_QUALITY: u32 = 11;

/// Settings for brotli compression.
///
/// Decompression needs none of these; a brotli stream is self-describing.
#[derive(Clone, Debug)]
pub struct BrotliOptions {
    pub quality: u32,

    /// log2 of the sliding window size.
    pub lgwin: u32,

    /// log2 of the input block size, 0 lets the encoder pick.
    pub lgblock: u32,

    /// Expected total input size in bytes, 0 when unknown.
    pub size_hint: usize,

    /// Buffer size used for the reader/writer wrappers.
    pub buffer_size: usize,
}

impl Default for BrotliOptions {
    fn default() -> Self {
        Self {
            quality: MAX_QUALITY,
            lgwin: 22,
            lgblock: 0,
            size_hint: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl BrotliOptions {
    /// Largest window, largest block, maximum quality.
    pub fn max_ratio(size_hint: u64) -> Self {
        Self {
            quality: MAX_QUALITY,
            lgwin: MAX_WINDOW_BITS,
            lgblock: MAX_INPUT_BLOCK_BITS,
            size_hint: usize::try_from(size_hint).unwrap_or(usize::MAX),
            ..Self::default()
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

/// Which brotli implementation a [`BrotliCodec`] drives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrotliBackend {
    /// The `brotli` crate, in process.
    Native,
    /// A `brotli` executable, fed through pipes.
    External(PathBuf),
}

/// Order in which [`BrotliBackend::probe`] tries the implementations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrotliPreference {
    #[default]
    Native,
    External,
}

impl BrotliBackend {
    /// In-process brotli, if this build carries it.
    pub fn native() -> Option<Self> {
        cfg!(feature = "native-brotli").then_some(Self::Native)
    }

    /// A `brotli` executable on `PATH`.
    pub fn external() -> Option<Self> {
        which::which("brotli").ok().map(Self::External)
    }

    /// Locate a usable implementation, preferred one first.
    pub fn probe(preference: BrotliPreference) -> Option<Self> {
        let found = match preference {
            BrotliPreference::Native => Self::native().or_else(Self::external),
            BrotliPreference::External => Self::external().or_else(Self::native),
        };
        match &found {
            Some(backend) => log::debug!("brotli backend: {backend:?}"),
            None => log::debug!("no brotli backend found"),
        }
        found
    }
}

#[derive(Clone, Debug)]
pub struct BrotliCodec {
    opts: BrotliOptions,
    backend: BrotliBackend,
}

impl BrotliCodec {
    pub fn new(opts: BrotliOptions, backend: BrotliBackend) -> Self {
        Self { opts, backend }
    }

    pub fn options(&self) -> &BrotliOptions {
        &self.opts
    }

    pub fn backend(&self) -> &BrotliBackend {
        &self.backend
    }

    pub fn compress_bytes(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.compress_reader_to_writer(input, &mut out)?;
        Ok(out)
    }

    pub fn decompress_bytes(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_reader_to_writer(input, &mut out)?;
        Ok(out)
    }

    /// Stream compression: reads from `reader`, writes a brotli stream into `writer`.
    pub fn compress_reader_to_writer<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: Read + Send,
        W: Write,
    {
        match &self.backend {
            BrotliBackend::Native => native::compress(&self.opts, reader, writer),
            BrotliBackend::External(program) => {
                let args = [
                    "-c".to_string(),
                    "-q".to_string(),
                    self.opts.quality.to_string(),
                    "-w".to_string(),
                    self.opts.lgwin.to_string(),
                ];
                external::pipe_through(program, &args, reader, writer)
            }
        }
    }

    /// Stream decompression: reads brotli from `reader`, writes plain bytes into `writer`.
    pub fn decompress_reader_to_writer<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: Read + Send,
        W: Write,
    {
        match &self.backend {
            BrotliBackend::Native => native::decompress(&self.opts, reader, writer),
            BrotliBackend::External(program) => {
                let args = ["-d".to_string(), "-c".to_string()];
                external::pipe_through(program, &args, reader, writer)
            }
        }
    }
}

#[cfg(feature = "native-brotli")]
mod native {
    use super::*;
    use brotli::enc::BrotliEncoderParams;

    pub(super) fn compress<R: Read, W: Write>(opts: &BrotliOptions, reader: R, mut writer: W) -> io::Result<()> {
        let mut params = BrotliEncoderParams::default();
        params.quality = opts.quality.min(MAX_QUALITY) as i32;
        params.lgwin = opts.lgwin.min(MAX_WINDOW_BITS) as i32;
        if opts.lgblock > 0 {
            params.lgblock = opts.lgblock.min(MAX_INPUT_BLOCK_BITS) as i32;
        }
        params.size_hint = opts.size_hint;

        let reader = BufReader::with_capacity(opts.buffer_size, reader);
        let mut encoder = brotli::CompressorReader::with_params(reader, opts.buffer_size, &params);
        io::copy(&mut encoder, &mut writer)?;
        writer.flush()
    }

    pub(super) fn decompress<R: Read, W: Write>(opts: &BrotliOptions, reader: R, mut writer: W) -> io::Result<()> {
        let mut decoder = brotli::Decompressor::new(reader, opts.buffer_size);
        io::copy(&mut decoder, &mut writer)?;
        writer.flush()
    }
}

#[cfg(not(feature = "native-brotli"))]
mod native {
    use super::*;

    fn missing() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, "built without native brotli support")
    }

    pub(super) fn compress<R: Read, W: Write>(_: &BrotliOptions, _: R, _: W) -> io::Result<()> {
        Err(missing())
    }

    pub(super) fn decompress<R: Read, W: Write>(_: &BrotliOptions, _: R, _: W) -> io::Result<()> {
        Err(missing())
    }
}

#[cfg(all(test, feature = "native-brotli"))]
mod tests {
    use super::*;

    #[test]
    fn native_roundtrip_default_preset() {
        let codec = BrotliCodec::new(BrotliOptions::default(), BrotliBackend::Native);
        let data = b"brotli brotli brotli, the quick brown fox".repeat(100);

        let compressed = codec.compress_bytes(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(codec.decompress_bytes(&compressed).unwrap(), data);
    }

    #[test]
    fn native_roundtrip_max_ratio_preset() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let opts = BrotliOptions::max_ratio(data.len() as u64);
        assert_eq!(opts.lgwin, MAX_WINDOW_BITS);
        assert_eq!(opts.lgblock, MAX_INPUT_BLOCK_BITS);
        assert_eq!(opts.size_hint, data.len());

        let codec = BrotliCodec::new(opts, BrotliBackend::Native);
        let compressed = codec.compress_bytes(&data).unwrap();
        assert_eq!(codec.decompress_bytes(&compressed).unwrap(), data);
    }

    #[test]
    fn empty_input_roundtrips() {
        let codec = BrotliCodec::new(BrotliOptions::default(), BrotliBackend::Native);
        let compressed = codec.compress_bytes(b"").unwrap();
        assert!(codec.decompress_bytes(&compressed).unwrap().is_empty());
    }

    #[test]
    fn probe_prefers_native_when_built_in() {
        assert_eq!(
            BrotliBackend::probe(BrotliPreference::Native),
            Some(BrotliBackend::Native)
        );
    }
}
