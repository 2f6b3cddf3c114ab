// src/video/compressor.rs

use crate::utils::error::{CoderError, Result};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Compresses the pixels of a changed block.
///
/// The encoder only compares blocks for equality; what a compressor does with
/// the pixels is opaque to it.
pub trait BlockCompressor: Send + Sync {
    fn compress(&self, pixels: &[u8]) -> Result<Vec<u8>>;

    /// Inverse of `compress`. Fails unless exactly `expected_len` bytes result.
    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// The zlib stream the screen codec uses for block data.
#[derive(Debug, Clone, Copy)]
pub struct ZlibBlockCompressor {
    level: Compression,
}

impl ZlibBlockCompressor {
    pub fn new(level: Compression) -> Self {
        ZlibBlockCompressor { level }
    }
}

impl Default for ZlibBlockCompressor {
    fn default() -> Self {
        ZlibBlockCompressor::new(Compression::default())
    }
}

impl BlockCompressor for ZlibBlockCompressor {
    fn compress(&self, pixels: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder.write_all(pixels)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut pixels = Vec::with_capacity(expected_len);
        ZlibDecoder::new(data)
            .take(expected_len as u64 + 1)
            .read_to_end(&mut pixels)?;
        if pixels.len() != expected_len {
            return Err(CoderError::invalid(format!(
                "block inflated to {} bytes, expected {}",
                pixels.len(),
                expected_len
            )));
        }
        Ok(pixels)
    }
}
