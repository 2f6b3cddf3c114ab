// src/movie/opaque.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, MAX_TAG_CODE, Tag, TagHeader};
use crate::utils::error::{CoderError, Result};
use std::sync::Arc;

/// A tag carried as raw bytes.
///
/// Only produced for codes a caller has explicitly registered with
/// `register_opaque`; the standard registry never falls back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueTag {
    code: u16,
    extended: bool,
    data: Arc<[u8]>,
}

impl OpaqueTag {
    pub fn new(code: u16, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        if code > MAX_TAG_CODE {
            return Err(CoderError::invalid(format!("tag code {} exceeds {}", code, MAX_TAG_CODE)));
        }
        Ok(OpaqueTag {
            code,
            extended: false,
            data: data.into(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Tag for OpaqueTag {
    fn code(&self) -> u16 {
        self.code
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(self.data.len() * 8)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        cursor.write_bytes(&self.data)
    }

    /// Keeps the length form the tag arrived with.
    fn always_extended(&self) -> bool {
        self.extended
    }
}

impl DecodeTag for OpaqueTag {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        header: &TagHeader,
    ) -> Result<Self> {
        let data = cursor.read_bytes(header.length)?;
        Ok(OpaqueTag {
            code: header.code,
            extended: header.extended,
            data: data.into(),
        })
    }
}
