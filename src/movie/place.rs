// src/movie/place.rs

//! Placing, moving and replacing objects on the display list.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::coder::record::{Decode, Record, write_checked};
use crate::datatype::color_transform::ColorTransform;
use crate::datatype::coord_transform::CoordTransform;
use crate::movie::tags::{check_identifier, check_string, codes};
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;

const HAS_CLIP_ACTIONS: u8 = 0x80;
const HAS_CLIP_DEPTH: u8 = 0x40;
const HAS_NAME: u8 = 0x20;
const HAS_RATIO: u8 = 0x10;
const HAS_COLOR_TRANSFORM: u8 = 0x08;
const HAS_TRANSFORM: u8 = 0x04;
const HAS_CHARACTER: u8 = 0x02;
const MOVE: u8 = 0x01;

/// Adds or updates the object at a display-list depth.
///
/// Every field except `depth` is optional; absent fields keep the value the
/// object already had. Colour transforms always carry alpha terms here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceObject2 {
    pub depth: u16,
    /// Set when the tag modifies (or with `character`, replaces) an existing object.
    pub is_move: bool,
    pub character: Option<u16>,
    pub transform: Option<CoordTransform>,
    pub color_transform: Option<ColorTransform>,
    /// Morph progress, or the frame of a video stream.
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
}

impl PlaceObject2 {
    /// Places a new instance of `character` at (`x`, `y`).
    pub fn show(character: u16, depth: u16, x: i32, y: i32) -> Result<Self> {
        Ok(PlaceObject2 {
            depth,
            character: Some(check_identifier(character)?),
            transform: Some(CoordTransform::translation(x, y)),
            ..Default::default()
        })
    }

    /// Moves the object at `depth` to (`x`, `y`).
    pub fn move_to(depth: u16, x: i32, y: i32) -> Self {
        PlaceObject2 {
            depth,
            is_move: true,
            transform: Some(CoordTransform::translation(x, y)),
            ..Default::default()
        }
    }

    /// Replaces the object at `depth` with an instance of `character`.
    pub fn replace(character: u16, depth: u16) -> Result<Self> {
        Ok(PlaceObject2 {
            depth,
            is_move: true,
            character: Some(check_identifier(character)?),
            ..Default::default()
        })
    }

    pub fn with_ratio(mut self, ratio: u16) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_string(&name, "instance name")?;
        self.name = Some(name);
        Ok(self)
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.clip_depth.is_some() {
            flags |= HAS_CLIP_DEPTH;
        }
        if self.name.is_some() {
            flags |= HAS_NAME;
        }
        if self.ratio.is_some() {
            flags |= HAS_RATIO;
        }
        if self.color_transform.is_some() {
            flags |= HAS_COLOR_TRANSFORM;
        }
        if self.transform.is_some() {
            flags |= HAS_TRANSFORM;
        }
        if self.character.is_some() {
            flags |= HAS_CHARACTER;
        }
        if self.is_move {
            flags |= MOVE;
        }
        flags
    }
}

impl Tag for PlaceObject2 {
    fn code(&self) -> u16 {
        codes::PLACE_OBJECT_2
    }

    fn payload_bits(&self, ctx: &mut Context) -> Result<usize> {
        let mut scope = ctx.enter()?;
        scope.set_transparent(true);

        let mut bits = 8 + 16;
        if self.character.is_some() {
            bits += 16;
        }
        if let Some(transform) = &self.transform {
            bits += transform.measure(&mut scope)?;
        }
        if let Some(cxform) = &self.color_transform {
            bits += cxform.measure(&mut scope)?;
        }
        if self.ratio.is_some() {
            bits += 16;
        }
        if let Some(name) = &self.name {
            bits += (name.len() + 1) * 8;
        }
        if self.clip_depth.is_some() {
            bits += 16;
        }
        Ok(bits)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        let mut scope = ctx.enter()?;
        scope.set_transparent(true);

        cursor.write_u8(self.flags())?;
        cursor.write_u16::<LittleEndian>(self.depth)?;
        if let Some(character) = self.character {
            cursor.write_u16::<LittleEndian>(character)?;
        }
        if let Some(transform) = &self.transform {
            write_checked(transform, cursor, &mut scope)?;
        }
        if let Some(cxform) = &self.color_transform {
            write_checked(cxform, cursor, &mut scope)?;
        }
        if let Some(ratio) = self.ratio {
            cursor.write_u16::<LittleEndian>(ratio)?;
        }
        if let Some(name) = &self.name {
            cursor.write_string(name)?;
        }
        if let Some(clip_depth) = self.clip_depth {
            cursor.write_u16::<LittleEndian>(clip_depth)?;
        }
        Ok(())
    }
}

impl DecodeTag for PlaceObject2 {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        ctx: &mut Context,
        _header: &TagHeader,
    ) -> Result<Self> {
        let flags = cursor.read_u8()?;
        if flags & HAS_CLIP_ACTIONS != 0 {
            return Err(CoderError::UnsupportedVariant {
                record: "place object clip actions",
                value: flags as u32,
            });
        }

        let mut scope = ctx.enter()?;
        scope.set_transparent(true);

        let depth = cursor.read_u16::<LittleEndian>()?;
        let character = if flags & HAS_CHARACTER != 0 {
            Some(cursor.read_u16::<LittleEndian>()?)
        } else {
            None
        };
        let transform = if flags & HAS_TRANSFORM != 0 {
            Some(CoordTransform::decode(cursor, &mut scope)?)
        } else {
            None
        };
        let color_transform = if flags & HAS_COLOR_TRANSFORM != 0 {
            Some(ColorTransform::decode(cursor, &mut scope)?)
        } else {
            None
        };
        let ratio = if flags & HAS_RATIO != 0 {
            Some(cursor.read_u16::<LittleEndian>()?)
        } else {
            None
        };
        let name = if flags & HAS_NAME != 0 {
            Some(cursor.read_string()?)
        } else {
            None
        };
        let clip_depth = if flags & HAS_CLIP_DEPTH != 0 {
            Some(cursor.read_u16::<LittleEndian>()?)
        } else {
            None
        };

        Ok(PlaceObject2 {
            depth,
            is_move: flags & MOVE != 0,
            character,
            transform,
            color_transform,
            ratio,
            name,
            clip_depth,
        })
    }
}
