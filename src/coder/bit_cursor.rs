// src/coder/bit_cursor.rs

//! Bit-addressable cursor over a fixed byte buffer.
//!
//! Bits are numbered most-significant first inside each byte, which is the
//! packing used by every bit field in the container. The same type serves
//! both directions: a `BitCursor<&[u8]>` can only read, a
//! `BitCursor<&mut [u8]>` (or `BitCursor<Vec<u8>>`) can also write. The
//! buffer never grows; encoders size it from the measurement pass.

use crate::utils::error::{CoderError, Result};
use bitvec::prelude::*;
use byteorder::ByteOrder;

/// Widest single field the cursor reads or writes in one call.
pub const MAX_FIELD_BITS: u32 = 32;

/// A read-only cursor, used by every decoder.
pub type BitReader<'a> = BitCursor<&'a [u8]>;

/// A cursor over a pre-sized output buffer, used by every `write` pass.
pub type BitWriter<'a> = BitCursor<&'a mut [u8]>;

/// Tracks a bit offset in `[0, 8 * len]` over a byte buffer.
#[derive(Debug, Clone)]
pub struct BitCursor<B> {
    data: B,
    position: usize,
}

impl<B: AsRef<[u8]>> BitCursor<B> {
    /// Creates a cursor positioned at bit 0.
    #[inline]
    pub fn new(data: B) -> Self {
        BitCursor { data, position: 0 }
    }

    /// Gives the underlying buffer back.
    #[inline]
    pub fn into_inner(self) -> B {
        self.data
    }

    /// Returns the whole underlying buffer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Current offset in bits from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total addressable bits.
    #[inline]
    pub fn len_bits(&self) -> usize {
        self.data.as_ref().len() * 8
    }

    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.len_bits() - self.position
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.position == self.len_bits()
    }

    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.position % 8 == 0
    }

    /// Moves to an absolute bit offset.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.len_bits() {
            return Err(CoderError::OutOfBounds {
                position: self.position,
                requested: position as i64 - self.position as i64,
                limit: self.len_bits(),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Moves forwards or backwards by `delta` bits.
    pub fn skip(&mut self, delta: isize) -> Result<()> {
        let target = self.position as i64 + delta as i64;
        if target < 0 || target as usize > self.len_bits() {
            return Err(CoderError::OutOfBounds {
                position: self.position,
                requested: delta as i64,
                limit: self.len_bits(),
            });
        }
        self.position = target as usize;
        Ok(())
    }

    /// Rounds the offset up to the next byte boundary.
    pub fn align_to_byte(&mut self) -> Result<()> {
        let aligned = self.position.next_multiple_of(8);
        self.set_position(aligned)
    }

    /// Fails with `OutOfBounds` unless `count` more bits are available.
    #[inline]
    fn ensure(&self, count: usize) -> Result<()> {
        if count > self.remaining_bits() {
            return Err(CoderError::OutOfBounds {
                position: self.position,
                requested: count as i64,
                limit: self.len_bits(),
            });
        }
        Ok(())
    }

    #[inline]
    fn bits(&self) -> &BitSlice<u8, Msb0> {
        self.data.as_ref().view_bits::<Msb0>()
    }

    /// Reads an `n`-bit field, sign-extending it when `signed` is set.
    pub fn read_bits(&mut self, n: u32, signed: bool) -> Result<i64> {
        if n > MAX_FIELD_BITS {
            return Err(CoderError::invalid(format!(
                "field width {} exceeds {} bits",
                n, MAX_FIELD_BITS
            )));
        }
        if n == 0 {
            return Ok(0);
        }
        let width = n as usize;
        self.ensure(width)?;
        let raw: u32 = self.bits()[self.position..self.position + width].load_be();
        self.position += width;

        let value = if signed {
            let shift = 64 - n;
            ((raw as i64) << shift) >> shift
        } else {
            raw as i64
        };

        #[cfg(feature = "debug-logging")]
        log::trace!("read {} bits -> {} at {}", n, value, self.position - width);

        Ok(value)
    }

    /// Reads an unsigned bit field.
    #[inline]
    pub fn read_ub(&mut self, n: u32) -> Result<u32> {
        Ok(self.read_bits(n, false)? as u32)
    }

    /// Reads a signed bit field.
    #[inline]
    pub fn read_sb(&mut self, n: u32) -> Result<i32> {
        Ok(self.read_bits(n, true)? as i32)
    }

    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1, false)? == 1)
    }

    /// Reads an unsigned field without moving the cursor.
    pub fn peek_bits(&mut self, n: u32) -> Result<u32> {
        let mark = self.position;
        let value = self.read_ub(n)?;
        self.position = mark;
        Ok(value)
    }

    /// Reads a signed fixed-point field of `n` bits with `fraction` fractional bits.
    pub fn read_fixed_point(&mut self, n: u32, fraction: u32) -> Result<f64> {
        let raw = self.read_bits(n, true)?;
        Ok(raw as f64 / (1u64 << fraction) as f64)
    }

    /// Fills `out` with the next `out.len()` bytes.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<()> {
        self.ensure(out.len() * 8)?;
        if self.is_aligned() {
            let start = self.position / 8;
            out.copy_from_slice(&self.data.as_ref()[start..start + out.len()]);
            self.position += out.len() * 8;
        } else {
            for byte in out.iter_mut() {
                *byte = self.read_ub(8)? as u8;
            }
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; count];
        self.read_into(&mut out)?;
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_ub(8)? as u8)
    }

    pub fn read_u16<E: ByteOrder>(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(E::read_u16(&buf))
    }

    pub fn read_i16<E: ByteOrder>(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(E::read_i16(&buf))
    }

    pub fn read_u24<E: ByteOrder>(&mut self) -> Result<u32> {
        let mut buf = [0u8; 3];
        self.read_into(&mut buf)?;
        Ok(E::read_u24(&buf))
    }

    pub fn read_u32<E: ByteOrder>(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(E::read_u32(&buf))
    }

    pub fn read_f32<E: ByteOrder>(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(E::read_f32(&buf))
    }

    pub fn read_f64<E: ByteOrder>(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(E::read_f64(&buf))
    }

    /// Reads a null-terminated string, replacing invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitCursor<B> {
    #[inline]
    fn bits_mut(&mut self) -> &mut BitSlice<u8, Msb0> {
        self.data.as_mut().view_bits_mut::<Msb0>()
    }

    /// Writes the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: i64, n: u32) -> Result<()> {
        if n > MAX_FIELD_BITS {
            return Err(CoderError::invalid(format!(
                "field width {} exceeds {} bits",
                n, MAX_FIELD_BITS
            )));
        }
        if n == 0 {
            return Ok(());
        }
        let width = n as usize;
        self.ensure(width)?;
        let mask = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
        let raw = (value as u32) & mask;
        let start = self.position;
        self.bits_mut()[start..start + width].store_be(raw);
        self.position += width;

        #[cfg(feature = "debug-logging")]
        log::trace!("wrote {} bits <- {} at {}", n, value, start);

        Ok(())
    }

    #[inline]
    pub fn write_bool(&mut self, flag: bool) -> Result<()> {
        self.write_bits(flag as i64, 1)
    }

    /// Writes a signed fixed-point field of `n` bits with `fraction` fractional bits.
    pub fn write_fixed_point(&mut self, value: f64, n: u32, fraction: u32) -> Result<()> {
        let raw = (value * (1u64 << fraction) as f64).round() as i64;
        self.write_bits(raw, n)
    }

    /// Writes zero bits up to the next byte boundary.
    pub fn pad_to_byte(&mut self) -> Result<()> {
        let pad = self.position.next_multiple_of(8) - self.position;
        self.write_bits(0, pad as u32)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure(bytes.len() * 8)?;
        if self.is_aligned() {
            let start = self.position / 8;
            self.data.as_mut()[start..start + bytes.len()].copy_from_slice(bytes);
            self.position += bytes.len() * 8;
        } else {
            for &b in bytes {
                self.write_bits(b as i64, 8)?;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bits(value as i64, 8)
    }

    pub fn write_u16<E: ByteOrder>(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        E::write_u16(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_i16<E: ByteOrder>(&mut self, value: i16) -> Result<()> {
        let mut buf = [0u8; 2];
        E::write_i16(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_u24<E: ByteOrder>(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 3];
        E::write_u24(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_u32<E: ByteOrder>(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        E::write_u32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_f32<E: ByteOrder>(&mut self, value: f32) -> Result<()> {
        let mut buf = [0u8; 4];
        E::write_f32(&mut buf, value);
        self.write_bytes(&buf)
    }

    pub fn write_f64<E: ByteOrder>(&mut self, value: f64) -> Result<()> {
        let mut buf = [0u8; 8];
        E::write_f64(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Writes `text` followed by a terminating zero byte.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())?;
        self.write_u8(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};
    use proptest::prelude::*;

    #[test]
    fn test_msb_first_across_bytes() {
        let data = [0b0000_0011u8, 0b1100_0000];
        let mut cursor = BitCursor::new(&data[..]);
        cursor.skip(6).unwrap();
        assert_eq!(cursor.read_ub(4).unwrap(), 0b1111);
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn test_signed_extension() {
        let data = [0b1110_0000u8];
        let mut cursor = BitCursor::new(&data[..]);
        assert_eq!(cursor.read_sb(3).unwrap(), -1);
        cursor.set_position(0).unwrap();
        assert_eq!(cursor.read_ub(3).unwrap(), 7);
    }

    #[test]
    fn test_zero_width_reads_nothing() {
        let data: [u8; 0] = [];
        let mut cursor = BitCursor::new(&data[..]);
        assert_eq!(cursor.read_bits(0, true).unwrap(), 0);
        assert!(cursor.at_end());
    }

    #[test]
    fn test_read_past_end_is_out_of_bounds() {
        let data = [0xFFu8];
        let mut cursor = BitCursor::new(&data[..]);
        cursor.read_ub(5).unwrap();
        let err = cursor.read_ub(4).unwrap_err();
        assert!(matches!(
            err,
            CoderError::OutOfBounds { position: 5, requested: 4, limit: 8 }
        ));
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_write_past_capacity_is_out_of_bounds() {
        let mut buf = [0u8; 1];
        let mut cursor = BitCursor::new(&mut buf[..]);
        cursor.write_bits(3, 6).unwrap();
        assert!(matches!(
            cursor.write_bits(1, 3),
            Err(CoderError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_skip_and_set_position_bounds() {
        let data = [0u8; 2];
        let mut cursor = BitCursor::new(&data[..]);
        assert!(cursor.skip(-1).is_err());
        cursor.skip(16).unwrap();
        assert!(cursor.at_end());
        assert!(cursor.set_position(17).is_err());
        cursor.skip(-9).unwrap();
        assert_eq!(cursor.position(), 7);
        cursor.align_to_byte().unwrap();
        assert_eq!(cursor.position(), 8);
        cursor.align_to_byte().unwrap();
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_word_byte_orders() {
        let mut buf = [0u8; 9];
        {
            let mut cursor = BitCursor::new(&mut buf[..]);
            cursor.write_u16::<LittleEndian>(0x1144).unwrap();
            cursor.write_u32::<BigEndian>(0x0102_0304).unwrap();
            cursor.write_u24::<BigEndian>(0x0A0B0C).unwrap();
            assert!(cursor.at_end());
        }
        assert_eq!(buf, [0x44, 0x11, 1, 2, 3, 4, 0x0A, 0x0B, 0x0C]);

        let mut cursor = BitCursor::new(&buf[..]);
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 0x1144);
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0x0102_0304);
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 0x0A0B0C);
    }

    #[test]
    fn test_unaligned_bytes() {
        let mut buf = [0u8; 3];
        {
            let mut cursor = BitCursor::new(&mut buf[..]);
            cursor.write_bits(0b1010, 4).unwrap();
            cursor.write_bytes(&[0xFF, 0x00]).unwrap();
            cursor.pad_to_byte().unwrap();
        }
        assert_eq!(buf, [0xAF, 0xF0, 0x00]);

        let mut cursor = BitCursor::new(&buf[..]);
        cursor.skip(4).unwrap();
        assert_eq!(cursor.read_bytes(2).unwrap(), vec![0xFF, 0x00]);
    }

    #[test]
    fn test_fixed_point() {
        let mut buf = [0u8; 4];
        {
            let mut cursor = BitCursor::new(&mut buf[..]);
            cursor.write_fixed_point(-1.5, 16, 8).unwrap();
            cursor.write_fixed_point(2.25, 16, 8).unwrap();
        }
        let mut cursor = BitCursor::new(&buf[..]);
        assert_eq!(cursor.read_fixed_point(16, 8).unwrap(), -1.5);
        assert_eq!(cursor.read_fixed_point(16, 8).unwrap(), 2.25);
    }

    #[test]
    fn test_strings_and_floats() {
        let mut buf = [0u8; 10];
        {
            let mut cursor = BitCursor::new(&mut buf[..]);
            cursor.write_string("abc").unwrap();
            cursor.write_f32::<LittleEndian>(0.5).unwrap();
            cursor.write_u16::<LittleEndian>(7).unwrap();
        }
        let mut cursor = BitCursor::new(&buf[..]);
        assert_eq!(cursor.read_string().unwrap(), "abc");
        assert_eq!(cursor.read_f32::<LittleEndian>().unwrap(), 0.5);
        assert_eq!(cursor.peek_bits(8).unwrap(), 7);
        assert_eq!(cursor.position(), 64);
    }

    #[test]
    fn test_owned_buffer() {
        let mut cursor = BitCursor::new(vec![0u8; 2]);
        cursor.write_bits(-2, 4).unwrap();
        cursor.pad_to_byte().unwrap();
        cursor.write_u8(9).unwrap();
        assert_eq!(cursor.into_inner(), vec![0xE0, 9]);
    }

    proptest! {
        #[test]
        fn prop_fields_read_back(fields in proptest::collection::vec((1u32..=32, any::<i64>()), 1..40)) {
            let total: usize = fields.iter().map(|(n, _)| *n as usize).sum();
            let mut buf = vec![0u8; total.div_ceil(8)];
            {
                let mut cursor = BitCursor::new(&mut buf[..]);
                for (n, v) in &fields {
                    cursor.write_bits(*v, *n).unwrap();
                }
                prop_assert_eq!(cursor.position(), total);
            }
            let mut cursor = BitCursor::new(&buf[..]);
            for (n, v) in &fields {
                let shift = 64 - n;
                let expected = (v << shift) >> shift;
                prop_assert_eq!(cursor.read_bits(*n, true).unwrap(), expected);
            }
        }
    }
}
