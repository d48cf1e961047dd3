//! Streaming gzip and brotli transforms for LambdaFS.
//!
//! Every transform is a plain reader-to-writer copy returning `std::io::Result`,
//! so callers see the underlying I/O or codec error unchanged.

mod brotli_codec;
mod external;
mod gzip;

pub use brotli_codec::{
    BrotliBackend, BrotliCodec, BrotliOptions, BrotliPreference, MAX_INPUT_BLOCK_BITS, MAX_QUALITY,
    MAX_WINDOW_BITS,
};
pub use gzip::{GzipCodec, GzipOptions};

/// Reader/writer buffer size used when none is configured (2 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;
