// src/movie/frame.rs

//! Frame-level control tags.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::coder::record::{Decode, Record, write_checked};
use crate::datatype::color::Color;
use crate::movie::tags::codes;
use crate::utils::error::Result;

/// Displays the frame built up by the tags before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowFrame;

impl Tag for ShowFrame {
    fn code(&self) -> u16 {
        codes::SHOW_FRAME
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(0)
    }

    fn write_payload(&self, _cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

impl DecodeTag for ShowFrame {
    fn decode_payload(
        _cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        _header: &TagHeader,
    ) -> Result<Self> {
        Ok(ShowFrame)
    }
}

/// Sets the stage colour. Always opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetBackgroundColor {
    pub color: Color,
}

impl SetBackgroundColor {
    pub fn new(color: Color) -> Self {
        SetBackgroundColor { color }
    }
}

impl Tag for SetBackgroundColor {
    fn code(&self) -> u16 {
        codes::SET_BACKGROUND_COLOR
    }

    fn payload_bits(&self, ctx: &mut Context) -> Result<usize> {
        let mut scope = ctx.enter()?;
        scope.set_transparent(false);
        self.color.measure(&mut scope)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        let mut scope = ctx.enter()?;
        scope.set_transparent(false);
        write_checked(&self.color, cursor, &mut scope)
    }
}

impl DecodeTag for SetBackgroundColor {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        ctx: &mut Context,
        _header: &TagHeader,
    ) -> Result<Self> {
        let mut scope = ctx.enter()?;
        scope.set_transparent(false);
        Ok(SetBackgroundColor {
            color: Color::decode(cursor, &mut scope)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::framing::{encode_tag, read_tag};
    use crate::coder::bit_cursor::BitCursor;

    #[test]
    fn test_show_frame_is_bare_header() {
        let mut ctx = Context::new();
        assert_eq!(encode_tag(&ShowFrame, &mut ctx).unwrap(), vec![0x40, 0x00]);
    }

    #[test]
    fn test_background_ignores_transparency() {
        let mut ctx = Context::new();
        ctx.set_transparent(true);
        let tag = SetBackgroundColor::new(Color::rgb(0xF0, 0xF8, 0xFF));
        let bytes = encode_tag(&tag, &mut ctx).unwrap();
        assert_eq!(bytes, vec![0x43, 0x02, 0xF0, 0xF8, 0xFF]);

        let mut cursor = BitCursor::new(&bytes[..]);
        let back: SetBackgroundColor = read_tag(&mut cursor, &mut ctx).unwrap();
        assert_eq!(back, tag);
        assert!(ctx.is_transparent());
    }
}
