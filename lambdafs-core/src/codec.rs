//! Codec stages: gzip and brotli, each way, wrapping the `stream_codecs`
//! transforms around a stage's channel ends.

use std::io;

use stream_codecs::{BrotliBackend, BrotliCodec, BrotliOptions, GzipCodec, GzipOptions};

use crate::stage::{Stage, StageIo, StageKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

#[derive(Clone, Debug)]
enum Engine {
    Gzip(GzipCodec),
    Brotli(BrotliCodec),
}

#[derive(Debug)]
pub struct CodecStage {
    engine: Engine,
    direction: Direction,
    chunk_size: usize,
}

impl CodecStage {
    pub fn gzip_encoder(level: u32, chunk_size: usize) -> Self {
        Self::gzip(level, Direction::Encode, chunk_size)
    }

    pub fn gzip_decoder(chunk_size: usize) -> Self {
        Self::gzip(GzipOptions::default().level, Direction::Decode, chunk_size)
    }

    pub fn brotli_encoder(opts: BrotliOptions, backend: BrotliBackend, chunk_size: usize) -> Self {
        Self::brotli(opts, backend, Direction::Encode, chunk_size)
    }

    pub fn brotli_decoder(backend: BrotliBackend, chunk_size: usize) -> Self {
        Self::brotli(BrotliOptions::default(), backend, Direction::Decode, chunk_size)
    }

    fn gzip(level: u32, direction: Direction, chunk_size: usize) -> Self {
        let opts = GzipOptions {
            level,
            buffer_size: chunk_size.max(1),
        };
        Self {
            engine: Engine::Gzip(GzipCodec::new(opts)),
            direction,
            chunk_size: chunk_size.max(1),
        }
    }

    fn brotli(opts: BrotliOptions, backend: BrotliBackend, direction: Direction, chunk_size: usize) -> Self {
        let opts = opts.with_buffer_size(chunk_size.max(1));
        Self {
            engine: Engine::Brotli(BrotliCodec::new(opts, backend)),
            direction,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Stage for CodecStage {
    fn kind(&self) -> StageKind {
        match (&self.engine, self.direction) {
            (Engine::Gzip(_), Direction::Encode) => StageKind::GzipEncoder,
            (Engine::Gzip(_), Direction::Decode) => StageKind::GzipDecoder,
            (Engine::Brotli(_), Direction::Encode) => StageKind::BrotliEncoder,
            (Engine::Brotli(_), Direction::Decode) => StageKind::BrotliDecoder,
        }
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn run(self: Box<Self>, io: &mut StageIo) -> io::Result<()> {
        let (reader, writer) = io.split()?;
        match (&self.engine, self.direction) {
            (Engine::Gzip(codec), Direction::Encode) => codec.compress_reader_to_writer(reader, writer).map(drop),
            (Engine::Gzip(codec), Direction::Decode) => codec.decompress_reader_to_writer(reader, writer).map(drop),
            (Engine::Brotli(codec), Direction::Encode) => codec.compress_reader_to_writer(reader, writer),
            (Engine::Brotli(codec), Direction::Decode) => codec.decompress_reader_to_writer(reader, writer),
        }
    }
}
