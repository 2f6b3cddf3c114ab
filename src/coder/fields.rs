// src/coder/fields.rs

//! Primitive field shapes and the width arithmetic behind them.
//!
//! Variable-width fields are sized by the smallest width able to hold every
//! value that shares it. The helpers here compute those widths during a
//! measurement pass and read/write the fields whose width comes from the
//! [`Context`].

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::utils::error::{CoderError, Result};

/// Fractional bits in the 16.16 values of a coordinate transform.
pub const FIXED_16_16: u32 = 16;
/// Fractional bits in the 8.8 values of colour multiply terms and frame rates.
pub const FIXED_8_8: u32 = 8;

/// Bits needed to hold `value` as an unsigned field. Zero needs none.
#[inline]
pub fn unsigned_bits(value: u32) -> u32 {
    32 - value.leading_zeros()
}

/// Bits needed to hold `value` as a two's-complement field. Zero needs none.
#[inline]
pub fn signed_bits(value: i32) -> u32 {
    if value == 0 {
        return 0;
    }
    let magnitude = (if value < 0 { !value } else { value }) as u32;
    33 - magnitude.leading_zeros()
}

/// Widest unsigned width among `values`.
pub fn max_unsigned_bits<I: IntoIterator<Item = u32>>(values: I) -> u32 {
    values.into_iter().map(unsigned_bits).max().unwrap_or(0)
}

/// Widest signed width among `values`.
pub fn max_signed_bits<I: IntoIterator<Item = i32>>(values: I) -> u32 {
    values.into_iter().map(signed_bits).max().unwrap_or(0)
}

/// Converts a decimal into a fixed-point integer with `fraction` fractional bits.
#[inline]
pub fn to_fixed(value: f64, fraction: u32) -> i32 {
    (value * (1u64 << fraction) as f64).round() as i32
}

#[inline]
pub fn from_fixed(value: i32, fraction: u32) -> f64 {
    value as f64 / (1u64 << fraction) as f64
}

/// Fails unless `bits` fits in a width prefix of `prefix_bits` bits.
pub fn check_width(bits: u32, prefix_bits: u32, what: &str) -> Result<u32> {
    let limit = (1u32 << prefix_bits) - 1;
    if bits > limit {
        return Err(CoderError::invalid(format!(
            "{} needs {} bits, more than the {} a {}-bit width prefix allows",
            what, bits, limit, prefix_bits
        )));
    }
    Ok(bits)
}

/// Reads a glyph index using the context's glyph width.
#[inline]
pub fn read_glyph_index(cursor: &mut BitReader<'_>, ctx: &Context) -> Result<u32> {
    cursor.read_ub(ctx.glyph_width())
}

/// Reads a glyph advance using the context's advance width.
#[inline]
pub fn read_advance(cursor: &mut BitReader<'_>, ctx: &Context) -> Result<i32> {
    cursor.read_sb(ctx.advance_width())
}

pub fn write_glyph_index(cursor: &mut BitWriter<'_>, ctx: &Context, index: u32) -> Result<()> {
    cursor.write_bits(index as i64, ctx.glyph_width())
}

pub fn write_advance(cursor: &mut BitWriter<'_>, ctx: &Context, advance: i32) -> Result<()> {
    cursor.write_bits(advance as i64, ctx.advance_width())
}

/// Whole bytes needed for `bits` bits.
#[inline]
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Rounds a bit count up to a byte boundary.
#[inline]
pub fn align_bits(bits: usize) -> usize {
    bits.next_multiple_of(8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::bit_cursor::BitCursor;
    use proptest::prelude::*;

    #[test]
    fn test_unsigned_bits() {
        assert_eq!(unsigned_bits(0), 0);
        assert_eq!(unsigned_bits(1), 1);
        assert_eq!(unsigned_bits(5), 3);
        assert_eq!(unsigned_bits(255), 8);
        assert_eq!(unsigned_bits(u32::MAX), 32);
    }

    #[test]
    fn test_signed_bits() {
        assert_eq!(signed_bits(0), 0);
        assert_eq!(signed_bits(1), 2);
        assert_eq!(signed_bits(-1), 1);
        assert_eq!(signed_bits(3), 3);
        assert_eq!(signed_bits(-4), 3);
        assert_eq!(signed_bits(768), 11);
        assert_eq!(signed_bits(i32::MIN), 32);
        assert_eq!(signed_bits(i32::MAX), 32);
    }

    #[test]
    fn test_shared_widths() {
        assert_eq!(max_signed_bits([3, 15, 1]), 5);
        assert_eq!(max_unsigned_bits([2, 9, 0]), 4);
        assert_eq!(max_signed_bits(std::iter::empty()), 0);
    }

    #[test]
    fn test_fixed_conversion() {
        assert_eq!(to_fixed(1.0, FIXED_8_8), 256);
        assert_eq!(to_fixed(-0.5, FIXED_16_16), -32768);
        assert_eq!(from_fixed(768, FIXED_8_8), 3.0);
    }

    #[test]
    fn test_check_width() {
        assert_eq!(check_width(15, 4, "colour term").unwrap(), 15);
        assert!(matches!(
            check_width(16, 4, "colour term"),
            Err(CoderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_context_width_fields() {
        let mut ctx = Context::new();
        ctx.set_glyph_width(4);
        ctx.set_advance_width(6);

        let mut buf = [0u8; 2];
        {
            let mut cursor = BitCursor::new(&mut buf[..]);
            write_glyph_index(&mut cursor, &ctx, 9).unwrap();
            write_advance(&mut cursor, &ctx, -20).unwrap();
            assert_eq!(cursor.position(), 10);
        }
        let mut cursor = BitCursor::new(&buf[..]);
        assert_eq!(read_glyph_index(&mut cursor, &ctx).unwrap(), 9);
        assert_eq!(read_advance(&mut cursor, &ctx).unwrap(), -20);
    }

    proptest! {
        #[test]
        fn prop_signed_width_holds_value(value in any::<i32>()) {
            let bits = signed_bits(value);
            prop_assume!(bits > 0);
            let mut buf = [0u8; 4];
            {
                let mut cursor = BitCursor::new(&mut buf[..]);
                cursor.write_bits(value as i64, bits).unwrap();
            }
            let mut cursor = BitCursor::new(&buf[..]);
            prop_assert_eq!(cursor.read_sb(bits).unwrap(), value);
        }
    }
}
