// src/datatype/color.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::record::{Decode, Record, RecordId};
use crate::utils::error::Result;

/// An RGBA colour.
///
/// Encoded as three bytes, or four when the surrounding record declares
/// transparent colours. An opaque encoding decodes with full alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Record for Color {
    fn record_id(&self) -> RecordId {
        RecordId::Value("color")
    }

    fn measure(&self, ctx: &mut Context) -> Result<usize> {
        Ok(if ctx.is_transparent() { 32 } else { 24 })
    }

    fn write(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        cursor.write_bytes(&[self.red, self.green, self.blue])?;
        if ctx.is_transparent() {
            cursor.write_u8(self.alpha)?;
        }
        Ok(())
    }
}

impl Decode for Color {
    fn decode(cursor: &mut BitReader<'_>, ctx: &mut Context) -> Result<Self> {
        let mut rgb = [0u8; 3];
        cursor.read_into(&mut rgb)?;
        let alpha = if ctx.is_transparent() {
            cursor.read_u8()?
        } else {
            255
        };
        Ok(Color::rgba(rgb[0], rgb[1], rgb[2], alpha))
    }
}
