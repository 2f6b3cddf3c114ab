// src/coder/record.rs

//! The measure-then-write contract shared by every structured value.
//!
//! A record first reports how many bits it will occupy, then writes exactly
//! that many. The measurement may depend on the [`Context`] (for example the
//! glyph widths a text tag establishes for its spans), which is why the two
//! passes are separate operations. [`write_exact`] is the single place that
//! checks the promise; composite records write their children through
//! [`write_checked`] so every level is verified.

use crate::coder::bit_cursor::{BitCursor, BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::bytes_for_bits;
use crate::utils::error::{CoderError, Result};
use std::fmt;

/// Names the record a framing error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordId {
    /// A top-level tag, by type code.
    Tag(u16),
    /// A value type such as a bounds rectangle or colour transform.
    Value(&'static str),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Tag(code) => write!(f, "tag {}", code),
            RecordId::Value(name) => f.write_str(name),
        }
    }
}

/// A value with an exact, context-dependent bit encoding.
pub trait Record {
    /// Identifies the record in error reports.
    fn record_id(&self) -> RecordId;

    /// Number of bits `write` will produce under `ctx`.
    fn measure(&self, ctx: &mut Context) -> Result<usize>;

    /// Writes the record. Must advance the cursor by exactly `measure` bits.
    fn write(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()>;
}

/// A value that can be read back from its encoding.
pub trait Decode: Sized {
    fn decode(cursor: &mut BitReader<'_>, ctx: &mut Context) -> Result<Self>;
}

/// Writes `record` and fails with `FramingMismatch` unless exactly
/// `measured_bits` bits were produced.
pub fn write_exact<R: Record + ?Sized>(
    record: &R,
    cursor: &mut BitWriter<'_>,
    ctx: &mut Context,
    measured_bits: usize,
) -> Result<()> {
    let start = cursor.position();
    record.write(cursor, ctx)?;
    let written = cursor.position() as i64 - start as i64;

    #[cfg(feature = "debug-logging")]
    log::trace!("{}: measured {} bits, wrote {}", record.record_id(), measured_bits, written);

    if written != measured_bits as i64 {
        return Err(CoderError::FramingMismatch {
            record: record.record_id(),
            declared: bytes_for_bits(measured_bits),
            delta_bits: written - measured_bits as i64,
        });
    }
    Ok(())
}

/// Measures `record`, then writes it through [`write_exact`].
pub fn write_checked<R: Record + ?Sized>(
    record: &R,
    cursor: &mut BitWriter<'_>,
    ctx: &mut Context,
) -> Result<()> {
    let bits = record.measure(ctx)?;
    write_exact(record, cursor, ctx, bits)
}

/// Encodes a record into a buffer sized by its own measurement.
pub fn encode<R: Record + ?Sized>(record: &R, ctx: &mut Context) -> Result<Vec<u8>> {
    let bits = record.measure(ctx)?;
    let mut buffer = vec![0u8; bytes_for_bits(bits)];
    let mut cursor = BitCursor::new(&mut buffer[..]);
    write_exact(record, &mut cursor, ctx, bits)?;
    Ok(buffer)
}

/// Decodes one record from the start of `data`.
pub fn decode<T: Decode>(data: &[u8], ctx: &mut Context) -> Result<T> {
    let mut cursor = BitCursor::new(data);
    T::decode(&mut cursor, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes one more byte than it measures.
    struct Overrun;

    impl Record for Overrun {
        fn record_id(&self) -> RecordId {
            RecordId::Value("overrun")
        }

        fn measure(&self, _ctx: &mut Context) -> Result<usize> {
            Ok(8)
        }

        fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
            cursor.write_u8(1)?;
            cursor.write_u8(2)
        }
    }

    struct Byte(u8);

    impl Record for Byte {
        fn record_id(&self) -> RecordId {
            RecordId::Value("byte")
        }

        fn measure(&self, _ctx: &mut Context) -> Result<usize> {
            Ok(8)
        }

        fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
            cursor.write_u8(self.0)
        }
    }

    #[test]
    fn test_encode_sizes_buffer_exactly() {
        let mut ctx = Context::new();
        assert_eq!(encode(&Byte(7), &mut ctx).unwrap(), vec![7]);
    }

    #[test]
    fn test_corrupted_measure_is_framing_mismatch() {
        let mut ctx = Context::new();
        let mut buf = [0u8; 4];
        let mut cursor = BitCursor::new(&mut buf[..]);
        let err = write_exact(&Byte(7), &mut cursor, &mut ctx, 16).unwrap_err();
        assert!(matches!(
            err,
            CoderError::FramingMismatch {
                record: RecordId::Value("byte"),
                declared: 2,
                delta_bits: -8
            }
        ));
    }

    #[test]
    fn test_overrun_is_caught() {
        let mut ctx = Context::new();
        let mut buf = [0u8; 2];
        let mut cursor = BitCursor::new(&mut buf[..]);
        let err = write_checked(&Overrun, &mut cursor, &mut ctx).unwrap_err();
        assert!(matches!(err, CoderError::FramingMismatch { delta_bits: 8, .. }));
    }

    #[test]
    fn test_overrun_without_room_is_out_of_bounds() {
        let mut ctx = Context::new();
        assert!(matches!(
            encode(&Overrun, &mut ctx),
            Err(CoderError::OutOfBounds { .. })
        ));
    }
}
