// src/datatype/color_transform.rs

//! Per-channel colour adjustment: `out = in * multiply + add`.
//!
//! Multiply terms are 8.8 fixed point, add terms are plain integers. All
//! terms present in an encoding share one bit width, the smallest that holds
//! the largest of them. The alpha terms are only encoded when the
//! surrounding record uses transparent colours.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::{FIXED_8_8, align_bits, from_fixed, max_signed_bits, signed_bits, to_fixed};
use crate::coder::record::{Decode, Record, RecordId};
use crate::utils::error::{CoderError, Result};

const WIDTH_PREFIX: u32 = 4;
/// Widest term the four-bit width prefix can describe.
const MAX_TERM_BITS: u32 = (1 << WIDTH_PREFIX) - 1;
const FIXED_ONE: i32 = 1 << FIXED_8_8;

/// Channel order of the term arrays.
pub const RED: usize = 0;
pub const GREEN: usize = 1;
pub const BLUE: usize = 2;
pub const ALPHA: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTransform {
    multiply: [i32; 4],
    add: [i32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        ColorTransform::identity()
    }
}

fn check_term(value: i32, what: &str) -> Result<i32> {
    if signed_bits(value) > MAX_TERM_BITS {
        return Err(CoderError::invalid(format!(
            "{} term {} does not fit in {} bits",
            what, value, MAX_TERM_BITS
        )));
    }
    Ok(value)
}

impl ColorTransform {
    pub const fn identity() -> Self {
        ColorTransform {
            multiply: [FIXED_ONE; 4],
            add: [0; 4],
        }
    }

    /// A transform that only scales the channels.
    pub fn multiply(red: f64, green: f64, blue: f64, alpha: f64) -> Result<Self> {
        ColorTransform::identity().with_multiply(red, green, blue, alpha)
    }

    /// A transform that only offsets the channels.
    pub fn add(red: i32, green: i32, blue: i32, alpha: i32) -> Result<Self> {
        ColorTransform::identity().with_add(red, green, blue, alpha)
    }

    pub fn with_multiply(mut self, red: f64, green: f64, blue: f64, alpha: f64) -> Result<Self> {
        for (slot, value) in self.multiply.iter_mut().zip([red, green, blue, alpha]) {
            *slot = check_term(to_fixed(value, FIXED_8_8), "multiply")?;
        }
        Ok(self)
    }

    pub fn with_add(mut self, red: i32, green: i32, blue: i32, alpha: i32) -> Result<Self> {
        for (slot, value) in self.add.iter_mut().zip([red, green, blue, alpha]) {
            *slot = check_term(value, "add")?;
        }
        Ok(self)
    }

    /// Multiply term for `channel` (see [`RED`] and friends).
    pub fn multiply_term(&self, channel: usize) -> f64 {
        from_fixed(self.multiply[channel], FIXED_8_8)
    }

    pub fn add_term(&self, channel: usize) -> i32 {
        self.add[channel]
    }

    /// Number of channels encoded under `ctx`.
    #[inline]
    fn channels(ctx: &Context) -> usize {
        if ctx.is_transparent() { 4 } else { 3 }
    }

    fn has_multiply(&self, channels: usize) -> bool {
        self.multiply[..channels].iter().any(|&m| m != FIXED_ONE)
    }

    fn has_add(&self, channels: usize) -> bool {
        self.add[..channels].iter().any(|&a| a != 0)
    }

    /// Shared width of the terms that will be encoded.
    fn term_width(&self, channels: usize) -> u32 {
        let multiply: &[i32] = if self.has_multiply(channels) {
            &self.multiply[..channels]
        } else {
            &[]
        };
        let add: &[i32] = if self.has_add(channels) {
            &self.add[..channels]
        } else {
            &[]
        };
        max_signed_bits(multiply.iter().chain(add).copied())
    }
}

impl Record for ColorTransform {
    fn record_id(&self) -> RecordId {
        RecordId::Value("color transform")
    }

    fn measure(&self, ctx: &mut Context) -> Result<usize> {
        let channels = Self::channels(ctx);
        let width = self.term_width(channels) as usize;
        let groups = self.has_multiply(channels) as usize + self.has_add(channels) as usize;
        Ok(align_bits(2 + WIDTH_PREFIX as usize + groups * channels * width))
    }

    fn write(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        let channels = Self::channels(ctx);
        let width = self.term_width(channels);
        let has_multiply = self.has_multiply(channels);
        let has_add = self.has_add(channels);

        cursor.write_bool(has_add)?;
        cursor.write_bool(has_multiply)?;
        cursor.write_bits(width as i64, WIDTH_PREFIX)?;
        if has_multiply {
            for &term in &self.multiply[..channels] {
                cursor.write_bits(term as i64, width)?;
            }
        }
        if has_add {
            for &term in &self.add[..channels] {
                cursor.write_bits(term as i64, width)?;
            }
        }
        cursor.pad_to_byte()
    }
}

impl Decode for ColorTransform {
    fn decode(cursor: &mut BitReader<'_>, ctx: &mut Context) -> Result<Self> {
        let channels = Self::channels(ctx);
        let has_add = cursor.read_bool()?;
        let has_multiply = cursor.read_bool()?;
        let width = cursor.read_ub(WIDTH_PREFIX)?;

        let mut transform = ColorTransform::identity();
        if has_multiply {
            for slot in &mut transform.multiply[..channels] {
                *slot = cursor.read_sb(width)?;
            }
        }
        if has_add {
            for slot in &mut transform.add[..channels] {
                *slot = cursor.read_sb(width)?;
            }
        }
        cursor.align_to_byte()?;
        Ok(transform)
    }
}
