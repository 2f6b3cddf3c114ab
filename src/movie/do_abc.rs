// src/movie/do_abc.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::movie::tags::{check_string, codes};
use crate::utils::error::Result;
use byteorder::LittleEndian;
use std::sync::Arc;

const DEFER: u32 = 0x01;

/// An embedded ActionScript 3 bytecode block.
///
/// The bytecode is opaque to the codec and shared between copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoAbc {
    name: String,
    deferred: bool,
    data: Arc<[u8]>,
}

impl DoAbc {
    pub fn new(name: impl Into<String>, deferred: bool, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let name = name.into();
        check_string(&name, "bytecode name")?;
        Ok(DoAbc {
            name,
            deferred,
            data: data.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether execution waits until the whole block has loaded.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Tag for DoAbc {
    fn code(&self) -> u16 {
        codes::DO_ABC
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok((4 + self.name.len() + 1 + self.data.len()) * 8)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        cursor.write_u32::<LittleEndian>(if self.deferred { DEFER } else { 0 })?;
        cursor.write_string(&self.name)?;
        cursor.write_bytes(&self.data)
    }

    fn always_extended(&self) -> bool {
        true
    }
}

impl DecodeTag for DoAbc {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        header: &TagHeader,
    ) -> Result<Self> {
        let flags = cursor.read_u32::<LittleEndian>()?;
        let name = cursor.read_string()?;
        let remaining = header.payload_end().saturating_sub(cursor.position()) / 8;
        let data = cursor.read_bytes(remaining)?;
        Ok(DoAbc {
            name,
            deferred: flags & DEFER != 0,
            data: data.into(),
        })
    }
}
