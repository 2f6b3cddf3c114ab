// src/datatype/bounds.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::{align_bits, check_width, max_signed_bits};
use crate::coder::record::{Decode, Record, RecordId};
use crate::utils::error::Result;

/// Bits in the width prefix of a bounds rectangle.
const WIDTH_PREFIX: u32 = 5;

/// An axis-aligned rectangle in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A rectangle of the given size anchored at the origin.
    pub fn with_size(width: i32, height: i32) -> Self {
        Bounds::new(0, 0, width, height)
    }

    /// Horizontal extent. Widened so opposite extremes cannot overflow.
    #[inline]
    pub fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64
    }

    fn field_width(&self) -> Result<u32> {
        let bits = max_signed_bits([self.min_x, self.max_x, self.min_y, self.max_y]);
        check_width(bits, WIDTH_PREFIX, "bounds coordinate")
    }
}

impl Record for Bounds {
    fn record_id(&self) -> RecordId {
        RecordId::Value("bounds")
    }

    fn measure(&self, _ctx: &mut Context) -> Result<usize> {
        let bits = self.field_width()? as usize;
        Ok(align_bits(WIDTH_PREFIX as usize + 4 * bits))
    }

    fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        let bits = self.field_width()?;
        cursor.write_bits(bits as i64, WIDTH_PREFIX)?;
        for value in [self.min_x, self.max_x, self.min_y, self.max_y] {
            cursor.write_bits(value as i64, bits)?;
        }
        cursor.pad_to_byte()
    }
}

impl Decode for Bounds {
    fn decode(cursor: &mut BitReader<'_>, _ctx: &mut Context) -> Result<Self> {
        let bits = cursor.read_ub(WIDTH_PREFIX)?;
        let min_x = cursor.read_sb(bits)?;
        let max_x = cursor.read_sb(bits)?;
        let min_y = cursor.read_sb(bits)?;
        let max_y = cursor.read_sb(bits)?;
        cursor.align_to_byte()?;
        Ok(Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}
