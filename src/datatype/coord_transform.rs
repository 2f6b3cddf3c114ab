// src/datatype/coord_transform.rs

//! Two-dimensional affine transform applied to placed objects and text.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::{
    FIXED_16_16, align_bits, check_width, from_fixed, max_signed_bits, to_fixed,
};
use crate::coder::record::{Decode, Record, RecordId};
use crate::utils::error::Result;

const WIDTH_PREFIX: u32 = 5;
const FIXED_ONE: i32 = 1 << FIXED_16_16;

/// Scale and rotate terms are 16.16 fixed point, translation is in twips.
///
/// Values are held in their encoded fixed-point form so that a decoded
/// transform re-encodes to the same bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordTransform {
    scale_x: i32,
    scale_y: i32,
    shear_x: i32,
    shear_y: i32,
    translate_x: i32,
    translate_y: i32,
}

impl Default for CoordTransform {
    fn default() -> Self {
        CoordTransform::identity()
    }
}

impl CoordTransform {
    pub const fn identity() -> Self {
        CoordTransform {
            scale_x: FIXED_ONE,
            scale_y: FIXED_ONE,
            shear_x: 0,
            shear_y: 0,
            translate_x: 0,
            translate_y: 0,
        }
    }

    pub fn translation(x: i32, y: i32) -> Self {
        CoordTransform {
            translate_x: x,
            translate_y: y,
            ..Self::identity()
        }
    }

    pub fn scaling(x: f64, y: f64) -> Self {
        CoordTransform {
            scale_x: to_fixed(x, FIXED_16_16),
            scale_y: to_fixed(y, FIXED_16_16),
            ..Self::identity()
        }
    }

    /// A rotation by `degrees` about the origin.
    pub fn rotation(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        CoordTransform {
            scale_x: to_fixed(cos, FIXED_16_16),
            scale_y: to_fixed(cos, FIXED_16_16),
            shear_x: to_fixed(sin, FIXED_16_16),
            shear_y: to_fixed(-sin, FIXED_16_16),
            ..Self::identity()
        }
    }

    pub fn with_translation(mut self, x: i32, y: i32) -> Self {
        self.translate_x = x;
        self.translate_y = y;
        self
    }

    pub fn scale_x(&self) -> f64 {
        from_fixed(self.scale_x, FIXED_16_16)
    }

    pub fn scale_y(&self) -> f64 {
        from_fixed(self.scale_y, FIXED_16_16)
    }

    pub fn shear_x(&self) -> f64 {
        from_fixed(self.shear_x, FIXED_16_16)
    }

    pub fn shear_y(&self) -> f64 {
        from_fixed(self.shear_y, FIXED_16_16)
    }

    pub fn translate_x(&self) -> i32 {
        self.translate_x
    }

    pub fn translate_y(&self) -> i32 {
        self.translate_y
    }

    #[inline]
    fn has_scale(&self) -> bool {
        self.scale_x != FIXED_ONE || self.scale_y != FIXED_ONE
    }

    #[inline]
    fn has_shear(&self) -> bool {
        self.shear_x != 0 || self.shear_y != 0
    }

    /// Widths of the scale, shear and translate groups.
    fn widths(&self) -> Result<(u32, u32, u32)> {
        let scale = check_width(
            max_signed_bits([self.scale_x, self.scale_y]),
            WIDTH_PREFIX,
            "transform scale",
        )?;
        let shear = check_width(
            max_signed_bits([self.shear_x, self.shear_y]),
            WIDTH_PREFIX,
            "transform shear",
        )?;
        let translate = check_width(
            max_signed_bits([self.translate_x, self.translate_y]),
            WIDTH_PREFIX,
            "transform translation",
        )?;
        Ok((scale, shear, translate))
    }
}

impl Record for CoordTransform {
    fn record_id(&self) -> RecordId {
        RecordId::Value("coordinate transform")
    }

    fn measure(&self, _ctx: &mut Context) -> Result<usize> {
        let (scale, shear, translate) = self.widths()?;
        let mut bits = 2 + WIDTH_PREFIX as usize + 2 * translate as usize;
        if self.has_scale() {
            bits += WIDTH_PREFIX as usize + 2 * scale as usize;
        }
        if self.has_shear() {
            bits += WIDTH_PREFIX as usize + 2 * shear as usize;
        }
        Ok(align_bits(bits))
    }

    fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        let (scale, shear, translate) = self.widths()?;

        cursor.write_bool(self.has_scale())?;
        if self.has_scale() {
            cursor.write_bits(scale as i64, WIDTH_PREFIX)?;
            cursor.write_bits(self.scale_x as i64, scale)?;
            cursor.write_bits(self.scale_y as i64, scale)?;
        }

        cursor.write_bool(self.has_shear())?;
        if self.has_shear() {
            cursor.write_bits(shear as i64, WIDTH_PREFIX)?;
            cursor.write_bits(self.shear_x as i64, shear)?;
            cursor.write_bits(self.shear_y as i64, shear)?;
        }

        cursor.write_bits(translate as i64, WIDTH_PREFIX)?;
        cursor.write_bits(self.translate_x as i64, translate)?;
        cursor.write_bits(self.translate_y as i64, translate)?;
        cursor.pad_to_byte()
    }
}

impl Decode for CoordTransform {
    fn decode(cursor: &mut BitReader<'_>, _ctx: &mut Context) -> Result<Self> {
        let mut transform = CoordTransform::identity();

        if cursor.read_bool()? {
            let bits = cursor.read_ub(WIDTH_PREFIX)?;
            transform.scale_x = cursor.read_sb(bits)?;
            transform.scale_y = cursor.read_sb(bits)?;
        }
        if cursor.read_bool()? {
            let bits = cursor.read_ub(WIDTH_PREFIX)?;
            transform.shear_x = cursor.read_sb(bits)?;
            transform.shear_y = cursor.read_sb(bits)?;
        }
        let bits = cursor.read_ub(WIDTH_PREFIX)?;
        transform.translate_x = cursor.read_sb(bits)?;
        transform.translate_y = cursor.read_sb(bits)?;
        cursor.align_to_byte()?;

        Ok(transform)
    }
}
