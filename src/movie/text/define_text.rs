// src/movie/text/define_text.rs

//! Static text definitions.
//!
//! A text tag establishes the glyph and advance widths for all of its spans,
//! and for the transparent variant, that span colours carry alpha. Both are
//! set in a context scope around the spans so they never leak into the
//! tags that follow.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::coder::record::{Decode, Record, write_checked};
use crate::datatype::bounds::Bounds;
use crate::datatype::coord_transform::CoordTransform;
use crate::movie::tags::{check_identifier, codes};
use crate::movie::text::text_span::TextSpan;
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;
use log::debug;

/// Zero bytes some authoring tools emit between the bounds and the transform.
const ZERO_RUN_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineText {
    identifier: u16,
    bounds: Bounds,
    transform: CoordTransform,
    spans: Vec<TextSpan>,
    /// Span colours carry alpha (the second text tag type).
    transparent: bool,
}

impl DefineText {
    pub fn new(
        identifier: u16,
        bounds: Bounds,
        transform: CoordTransform,
        spans: Vec<TextSpan>,
    ) -> Result<Self> {
        Ok(DefineText {
            identifier: check_identifier(identifier)?,
            bounds,
            transform,
            spans,
            transparent: false,
        })
    }

    /// Same as [`DefineText::new`], but span colours are written with alpha.
    pub fn transparent(
        identifier: u16,
        bounds: Bounds,
        transform: CoordTransform,
        spans: Vec<TextSpan>,
    ) -> Result<Self> {
        Ok(DefineText {
            transparent: true,
            ..DefineText::new(identifier, bounds, transform, spans)?
        })
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn transform(&self) -> &CoordTransform {
        &self.transform
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    pub fn add(&mut self, span: TextSpan) {
        self.spans.push(span);
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Glyph width shared by every span.
    pub fn glyph_bits(&self) -> u32 {
        self.spans.iter().map(TextSpan::glyph_bits).max().unwrap_or(0)
    }

    /// Advance width shared by every span.
    pub fn advance_bits(&self) -> u32 {
        self.spans.iter().map(TextSpan::advance_bits).max().unwrap_or(0)
    }

    fn prepare(&self, ctx: &mut Context) {
        ctx.set_transparent(self.transparent);
        ctx.set_glyph_width(self.glyph_bits());
        ctx.set_advance_width(self.advance_bits());
    }
}

/// Skips the run of sixteen zero bytes that may precede the transform.
///
/// Only probes when the tag still has room for the run; the cursor is left
/// where it was unless all sixteen bytes are zero.
fn skip_zero_run(cursor: &mut BitReader<'_>, header: &TagHeader) -> Result<()> {
    let left = header.payload_end().saturating_sub(cursor.position());
    if left < ZERO_RUN_BYTES * 8 {
        return Ok(());
    }
    let mark = cursor.position();
    let mut run = [0u8; ZERO_RUN_BYTES];
    cursor.read_into(&mut run)?;
    if run.iter().all(|&b| b == 0) {
        debug!(
            "text {}: skipped {} zero bytes before transform",
            header.code, ZERO_RUN_BYTES
        );
    } else {
        cursor.set_position(mark)?;
    }
    Ok(())
}

impl Tag for DefineText {
    fn code(&self) -> u16 {
        if self.transparent {
            codes::DEFINE_TEXT_2
        } else {
            codes::DEFINE_TEXT
        }
    }

    fn payload_bits(&self, ctx: &mut Context) -> Result<usize> {
        let mut scope = ctx.enter()?;
        self.prepare(&mut scope);

        let mut bits = 16;
        bits += self.bounds.measure(&mut scope)?;
        bits += self.transform.measure(&mut scope)?;
        bits += 16;
        for span in &self.spans {
            bits += span.measure(&mut scope)?;
        }
        Ok(bits + 8)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        let mut scope = ctx.enter()?;
        self.prepare(&mut scope);

        cursor.write_u16::<LittleEndian>(self.identifier)?;
        write_checked(&self.bounds, cursor, &mut scope)?;
        write_checked(&self.transform, cursor, &mut scope)?;
        cursor.write_u8(scope.glyph_width() as u8)?;
        cursor.write_u8(scope.advance_width() as u8)?;
        for span in &self.spans {
            write_checked(span, cursor, &mut scope)?;
        }
        cursor.write_u8(0)
    }
}

impl DecodeTag for DefineText {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        ctx: &mut Context,
        header: &TagHeader,
    ) -> Result<Self> {
        let transparent = match header.code {
            codes::DEFINE_TEXT => false,
            codes::DEFINE_TEXT_2 => true,
            code => return Err(CoderError::UnsupportedTag { code }),
        };

        let mut scope = ctx.enter()?;
        scope.set_transparent(transparent);

        let identifier = cursor.read_u16::<LittleEndian>()?;
        let bounds = Bounds::decode(cursor, &mut scope)?;
        skip_zero_run(cursor, header)?;
        let transform = CoordTransform::decode(cursor, &mut scope)?;

        let glyph_width = cursor.read_u8()? as u32;
        let advance_width = cursor.read_u8()? as u32;
        scope.set_glyph_width(glyph_width);
        scope.set_advance_width(advance_width);

        let mut spans = Vec::new();
        while cursor.peek_bits(8)? != 0 {
            spans.push(TextSpan::decode(cursor, &mut scope)?);
        }
        // The terminating zero byte.
        cursor.read_u8()?;

        Ok(DefineText {
            identifier,
            bounds,
            transform,
            spans,
            transparent,
        })
    }
}
