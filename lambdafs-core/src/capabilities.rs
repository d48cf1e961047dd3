//! Which codecs this process can actually run.

use stream_codecs::{BrotliBackend, BrotliPreference};

use crate::classify::Codec;
use crate::error::{LambdaError, Result};

/// Codec implementations found at startup. gzip is always built in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub brotli: Option<BrotliBackend>,
}

impl Capabilities {
    pub fn negotiate(preference: BrotliPreference) -> Self {
        let brotli = BrotliBackend::probe(preference);
        if brotli.is_none() {
            log::warn!("no brotli implementation available; .br inputs and compress will fail");
        }
        Self { brotli }
    }

    /// gzip only.
    pub fn gzip_only() -> Self {
        Self { brotli: None }
    }

    pub fn supports(&self, codec: Codec) -> bool {
        match codec {
            Codec::Gzip => true,
            Codec::Brotli => self.brotli.is_some(),
        }
    }

    pub fn require(&self, codec: Codec) -> Result<()> {
        if self.supports(codec) {
            Ok(())
        } else {
            Err(LambdaError::CodecUnavailable { codec })
        }
    }

    pub fn brotli(&self) -> Result<&BrotliBackend> {
        self.brotli
            .as_ref()
            .ok_or(LambdaError::CodecUnavailable { codec: Codec::Brotli })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_is_always_supported() {
        let caps = Capabilities::gzip_only();
        assert!(caps.supports(Codec::Gzip));
        assert!(!caps.supports(Codec::Brotli));
        assert!(matches!(
            caps.require(Codec::Brotli),
            Err(LambdaError::CodecUnavailable { codec: Codec::Brotli })
        ));
    }

    #[cfg(feature = "native-brotli")]
    #[test]
    fn native_brotli_is_found_first() {
        let caps = Capabilities::negotiate(BrotliPreference::Native);
        assert_eq!(caps.brotli, Some(BrotliBackend::Native));
        assert!(caps.brotli().is_ok());
    }
}
