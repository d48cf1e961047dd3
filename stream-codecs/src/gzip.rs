use flate2::bufread::{MultiGzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufRead, BufReader, Read, Write};

use crate::DEFAULT_BUFFER_SIZE;

/// First two bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Settings for gzip compression/decompression.
#[derive(Clone, Debug)]
pub struct GzipOptions {
    /// Compression level, 0-9.
    pub level: u32,

    /// Buffer size used for the reader wrapper.
    pub buffer_size: usize,
}

impl Default for GzipOptions {
    fn default() -> Self {
        Self {
            level: 6,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GzipCodec {
    opts: GzipOptions,
}

impl GzipCodec {
    pub fn new(opts: GzipOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &GzipOptions {
        &self.opts
    }

    /// Compress an in-memory buffer.
    pub fn compress_bytes(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.compress_reader_to_writer(input, &mut out)?;
        Ok(out)
    }

    /// Decompress an in-memory buffer.
    pub fn decompress_bytes(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_reader_to_writer(input, &mut out)?;
        Ok(out)
    }

    /// Stream compression: reads from `reader`, writes a gzip stream into `writer`.
    /// Returns number of uncompressed bytes read from `reader`.
    pub fn compress_reader_to_writer<R: Read, W: Write>(&self, reader: R, writer: W) -> io::Result<u64> {
        let mut reader = BufReader::with_capacity(self.opts.buffer_size, reader);
        let mut encoder = GzEncoder::new(writer, Compression::new(self.opts.level.min(9)));

        let bytes_in = io::copy(&mut reader, &mut encoder)?;

        // Writes the trailer; the stream is invalid without it.
        let mut writer = encoder.finish()?;
        writer.flush()?;

        Ok(bytes_in)
    }

    /// Stream decompression. Accepts gzip (concatenated members included) as
    /// well as zlib-wrapped deflate, picked from the leading bytes.
    /// Returns number of uncompressed bytes written to `writer`.
    pub fn decompress_reader_to_writer<R: Read, W: Write>(&self, reader: R, mut writer: W) -> io::Result<u64> {
        let mut reader = BufReader::with_capacity(self.opts.buffer_size, reader);
        let gzip = is_gzip_header(reader.fill_buf()?);

        let bytes_out = if gzip {
            io::copy(&mut MultiGzDecoder::new(reader), &mut writer)?
        } else {
            io::copy(&mut ZlibDecoder::new(reader), &mut writer)?
        };
        writer.flush()?;

        Ok(bytes_out)
    }
}

fn is_gzip_header(head: &[u8]) -> bool {
    head.starts_with(&GZIP_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;

    #[test]
    fn bytes_roundtrip() {
        let codec = GzipCodec::default();
        let data = b"Hello, World! This is a gzip test.".repeat(64);

        let compressed = codec.compress_bytes(&data).unwrap();
        assert!(is_gzip_header(&compressed));

        let decompressed = codec.decompress_bytes(&compressed).unwrap();
        assert_eq!(data, decompressed);
    }

    #[test]
    fn concatenated_members_decode_as_one_stream() {
        let codec = GzipCodec::default();
        let mut joined = codec.compress_bytes(b"first half, ").unwrap();
        joined.extend(codec.compress_bytes(b"second half").unwrap());

        let decompressed = codec.decompress_bytes(&joined).unwrap();
        assert_eq!(decompressed, b"first half, second half");
    }

    #[test]
    fn zlib_input_is_accepted() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zlib wrapped payload").unwrap();
        let zlib = encoder.finish().unwrap();

        let decompressed = GzipCodec::default().decompress_bytes(&zlib).unwrap();
        assert_eq!(decompressed, b"zlib wrapped payload");
    }

    #[test]
    fn plain_text_is_rejected() {
        assert!(GzipCodec::default()
            .decompress_bytes(b"definitely not compressed")
            .is_err());
    }
}
