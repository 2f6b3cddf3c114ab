// src/movie/text/text_span.rs

//! One run of glyphs inside a static text tag.
//!
//! A span may change the font, colour and pen position before listing its
//! glyphs. Glyph indices and advances are written at widths chosen by the
//! enclosing tag, which picks the widest any of its spans needs.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::{
    align_bits, max_signed_bits, max_unsigned_bits, read_advance, read_glyph_index,
    write_advance, write_glyph_index,
};
use crate::coder::record::{Decode, Record, RecordId, write_checked};
use crate::datatype::color::Color;
use crate::movie::tags::check_identifier;
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;

const RECORD_TYPE: u8 = 0x80;
const HAS_FONT: u8 = 0x08;
const HAS_COLOR: u8 = 0x04;
const HAS_Y: u8 = 0x02;
const HAS_X: u8 = 0x01;

/// Most glyphs one span can hold.
pub const MAX_GLYPHS: usize = 255;

/// A glyph and the distance to the next one, in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlyphIndex {
    pub glyph: u32,
    pub advance: i32,
}

impl GlyphIndex {
    pub fn new(glyph: u32, advance: i32) -> Self {
        GlyphIndex { glyph, advance }
    }
}

/// Font and size the span switches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontSelection {
    pub identifier: u16,
    /// Em height in twips.
    pub height: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSpan {
    font: Option<FontSelection>,
    color: Option<Color>,
    offset_x: Option<i16>,
    offset_y: Option<i16>,
    glyphs: Vec<GlyphIndex>,
}

impl TextSpan {
    pub fn new(glyphs: Vec<GlyphIndex>) -> Result<Self> {
        if glyphs.len() > MAX_GLYPHS {
            return Err(CoderError::invalid(format!(
                "text span holds {} glyphs, at most {} allowed",
                glyphs.len(),
                MAX_GLYPHS
            )));
        }
        Ok(TextSpan {
            glyphs,
            ..Default::default()
        })
    }

    pub fn with_font(mut self, identifier: u16, height: u16) -> Result<Self> {
        self.font = Some(FontSelection {
            identifier: check_identifier(identifier)?,
            height,
        });
        Ok(self)
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_offset(mut self, x: Option<i16>, y: Option<i16>) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    pub fn font(&self) -> Option<FontSelection> {
        self.font
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn offset_x(&self) -> Option<i16> {
        self.offset_x
    }

    pub fn offset_y(&self) -> Option<i16> {
        self.offset_y
    }

    pub fn glyphs(&self) -> &[GlyphIndex] {
        &self.glyphs
    }

    /// Width this span needs for its glyph indices.
    pub fn glyph_bits(&self) -> u32 {
        max_unsigned_bits(self.glyphs.iter().map(|g| g.glyph))
    }

    /// Width this span needs for its advances.
    pub fn advance_bits(&self) -> u32 {
        max_signed_bits(self.glyphs.iter().map(|g| g.advance))
    }

    fn flags(&self) -> u8 {
        let mut flags = RECORD_TYPE;
        if self.font.is_some() {
            flags |= HAS_FONT;
        }
        if self.color.is_some() {
            flags |= HAS_COLOR;
        }
        if self.offset_y.is_some() {
            flags |= HAS_Y;
        }
        if self.offset_x.is_some() {
            flags |= HAS_X;
        }
        flags
    }

    fn check_widths(&self, ctx: &Context) -> Result<()> {
        if self.glyph_bits() > ctx.glyph_width() || self.advance_bits() > ctx.advance_width() {
            return Err(CoderError::invalid(format!(
                "span needs {}/{} glyph/advance bits but the text uses {}/{}",
                self.glyph_bits(),
                self.advance_bits(),
                ctx.glyph_width(),
                ctx.advance_width()
            )));
        }
        Ok(())
    }
}

impl Record for TextSpan {
    fn record_id(&self) -> RecordId {
        RecordId::Value("text span")
    }

    fn measure(&self, ctx: &mut Context) -> Result<usize> {
        self.check_widths(ctx)?;

        let mut bits = 8;
        if self.font.is_some() {
            bits += 32;
        }
        if let Some(color) = &self.color {
            bits += color.measure(ctx)?;
        }
        if self.offset_x.is_some() {
            bits += 16;
        }
        if self.offset_y.is_some() {
            bits += 16;
        }
        bits += 8;
        bits += self.glyphs.len() * (ctx.glyph_width() + ctx.advance_width()) as usize;
        Ok(align_bits(bits))
    }

    fn write(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        self.check_widths(ctx)?;

        cursor.write_u8(self.flags())?;
        if let Some(font) = &self.font {
            cursor.write_u16::<LittleEndian>(font.identifier)?;
        }
        if let Some(color) = &self.color {
            write_checked(color, cursor, ctx)?;
        }
        if let Some(x) = self.offset_x {
            cursor.write_i16::<LittleEndian>(x)?;
        }
        if let Some(y) = self.offset_y {
            cursor.write_i16::<LittleEndian>(y)?;
        }
        if let Some(font) = &self.font {
            cursor.write_u16::<LittleEndian>(font.height)?;
        }

        cursor.write_u8(self.glyphs.len() as u8)?;
        for glyph in &self.glyphs {
            write_glyph_index(cursor, ctx, glyph.glyph)?;
            write_advance(cursor, ctx, glyph.advance)?;
        }
        cursor.pad_to_byte()
    }
}

impl Decode for TextSpan {
    fn decode(cursor: &mut BitReader<'_>, ctx: &mut Context) -> Result<Self> {
        let flags = cursor.read_u8()?;
        if flags & RECORD_TYPE == 0 {
            return Err(CoderError::UnsupportedVariant {
                record: "text record",
                value: flags as u32,
            });
        }

        let identifier = if flags & HAS_FONT != 0 {
            Some(cursor.read_u16::<LittleEndian>()?)
        } else {
            None
        };
        let color = if flags & HAS_COLOR != 0 {
            Some(Color::decode(cursor, ctx)?)
        } else {
            None
        };
        let offset_x = if flags & HAS_X != 0 {
            Some(cursor.read_i16::<LittleEndian>()?)
        } else {
            None
        };
        let offset_y = if flags & HAS_Y != 0 {
            Some(cursor.read_i16::<LittleEndian>()?)
        } else {
            None
        };
        let font = match identifier {
            Some(identifier) => Some(FontSelection {
                identifier,
                height: cursor.read_u16::<LittleEndian>()?,
            }),
            None => None,
        };

        let count = cursor.read_u8()? as usize;
        let mut glyphs = Vec::with_capacity(count);
        for _ in 0..count {
            let glyph = read_glyph_index(cursor, ctx)?;
            let advance = read_advance(cursor, ctx)?;
            glyphs.push(GlyphIndex { glyph, advance });
        }
        cursor.align_to_byte()?;

        Ok(TextSpan {
            font,
            color,
            offset_x,
            offset_y,
            glyphs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::record::{decode, encode};

    fn glyphs(pairs: &[(u32, i32)]) -> Vec<GlyphIndex> {
        pairs.iter().map(|&(g, a)| GlyphIndex::new(g, a)).collect()
    }

    fn text_context(glyph_width: u32, advance_width: u32) -> Context {
        let mut ctx = Context::new();
        ctx.set_glyph_width(glyph_width);
        ctx.set_advance_width(advance_width);
        ctx
    }

    #[test]
    fn test_glyph_only_layout() {
        let span = TextSpan::new(glyphs(&[(1, 2), (3, -1)])).unwrap();
        let mut ctx = text_context(2, 3);
        let bytes = encode(&span, &mut ctx).unwrap();
        // flags, count, then 01 010 11 111 padded.
        assert_eq!(bytes, vec![0x80, 0x02, 0b0101_0111, 0b1100_0000]);
        assert_eq!(decode::<TextSpan>(&bytes, &mut ctx).unwrap(), span);
    }

    #[test]
    fn test_full_span() {
        let span = TextSpan::new(glyphs(&[(40, 220)]))
            .unwrap()
            .with_font(3, 240)
            .unwrap()
            .with_color(Color::rgba(255, 0, 0, 128))
            .with_offset(Some(-20), Some(300));

        let mut ctx = text_context(span.glyph_bits(), span.advance_bits());
        ctx.set_transparent(true);
        let bytes = encode(&span, &mut ctx).unwrap();
        assert_eq!(bytes[0], 0x8F);
        assert_eq!(bytes.len(), 1 + 2 + 4 + 2 + 2 + 2 + 1 + 2);
        assert_eq!(decode::<TextSpan>(&bytes, &mut ctx).unwrap(), span);
    }

    #[test]
    fn test_narrow_context_rejected() {
        let span = TextSpan::new(glyphs(&[(9, 0)])).unwrap();
        let mut ctx = text_context(3, 0);
        assert!(matches!(span.measure(&mut ctx), Err(CoderError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_text_record_rejected() {
        let mut ctx = text_context(1, 1);
        assert!(matches!(
            decode::<TextSpan>(&[0x40, 0x00], &mut ctx),
            Err(CoderError::UnsupportedVariant { value: 0x40, .. })
        ));
    }

    #[test]
    fn test_glyph_limit() {
        assert!(TextSpan::new(vec![GlyphIndex::default(); 255]).is_ok());
        assert!(TextSpan::new(vec![GlyphIndex::default(); 256]).is_err());
    }
}
