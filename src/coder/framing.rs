// src/coder/framing.rs

//! Length-prefixed, type-coded tag framing.
//!
//! Every tag starts with a little-endian 16-bit word holding the type code in
//! the upper ten bits and the payload length in the lower six. A length field
//! of `0x3F` is an escape: the real length follows as a 32-bit little-endian
//! word. Payloads of 63 bytes or more must use the escape; shorter payloads
//! may use either form.

use crate::coder::bit_cursor::{BitCursor, BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::fields::bytes_for_bits;
use crate::coder::record::RecordId;
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;

/// Short-length value that announces an extended length word.
pub const LENGTH_ESCAPE: u16 = 0x3F;
/// Largest type code the ten-bit field holds.
pub const MAX_TAG_CODE: u16 = 0x3FF;

/// The framing envelope of one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub code: u16,
    /// Payload length in bytes.
    pub length: usize,
    /// Whether the length was (or will be) carried in the 32-bit word.
    pub extended: bool,
    /// Bit offset of the first payload bit.
    pub start: usize,
}

impl TagHeader {
    /// Header for a payload of `length` bytes, in the shortest legal form.
    pub fn new(code: u16, length: usize) -> Self {
        TagHeader {
            code,
            length,
            extended: length >= LENGTH_ESCAPE as usize,
            start: 0,
        }
    }

    /// Bytes taken by the header itself.
    #[inline]
    pub fn header_len(&self) -> usize {
        if self.extended { 6 } else { 2 }
    }

    /// Header plus payload, in bytes.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.header_len() + self.length
    }

    /// Bit offset just past the payload.
    #[inline]
    pub fn payload_end(&self) -> usize {
        self.start + self.length * 8
    }

    /// Reads a header and records where its payload starts.
    pub fn read(cursor: &mut BitReader<'_>) -> Result<TagHeader> {
        let word = cursor.read_u16::<LittleEndian>()?;
        let code = word >> 6;
        let short = word & LENGTH_ESCAPE;
        let (length, extended) = if short == LENGTH_ESCAPE {
            (cursor.read_u32::<LittleEndian>()? as usize, true)
        } else {
            (short as usize, false)
        };
        Ok(TagHeader {
            code,
            length,
            extended,
            start: cursor.position(),
        })
    }

    /// Writes the header, then updates `start` to the payload offset.
    pub fn write(&mut self, cursor: &mut BitWriter<'_>) -> Result<()> {
        if self.code > MAX_TAG_CODE {
            return Err(CoderError::invalid(format!(
                "tag code {} exceeds {}",
                self.code, MAX_TAG_CODE
            )));
        }
        if !self.extended && self.length >= LENGTH_ESCAPE as usize {
            return Err(CoderError::invalid(format!(
                "{} byte payload needs the extended length form",
                self.length
            )));
        }
        if self.extended {
            let length = u32::try_from(self.length).map_err(|_| {
                CoderError::invalid(format!("{} byte payload is too long to frame", self.length))
            })?;
            cursor.write_u16::<LittleEndian>((self.code << 6) | LENGTH_ESCAPE)?;
            cursor.write_u32::<LittleEndian>(length)?;
        } else {
            cursor.write_u16::<LittleEndian>((self.code << 6) | self.length as u16)?;
        }
        self.start = cursor.position();
        Ok(())
    }
}

/// A top-level record framed by a [`TagHeader`].
///
/// Implementors describe only the payload; [`write_tag`] adds the envelope and
/// checks that the payload matched its measurement.
pub trait Tag {
    fn code(&self) -> u16;

    /// Bits in the payload under `ctx`. Tags end on a byte boundary, so this
    /// is always a multiple of eight for a well-formed tag.
    fn payload_bits(&self, ctx: &mut Context) -> Result<usize>;

    fn write_payload(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()>;

    /// Tags that must always carry the 32-bit length word override this.
    fn always_extended(&self) -> bool {
        false
    }
}

/// Decodes a tag payload once its header has been read.
pub trait DecodeTag: Sized {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        ctx: &mut Context,
        header: &TagHeader,
    ) -> Result<Self>;
}

/// Header for `tag` as it will be written under `ctx`.
pub fn measure_header<T: Tag + ?Sized>(tag: &T, ctx: &mut Context) -> Result<TagHeader> {
    let length = bytes_for_bits(tag.payload_bits(ctx)?);
    let mut header = TagHeader::new(tag.code(), length);
    header.extended |= tag.always_extended();
    Ok(header)
}

/// Total encoded size of `tag` in bits, header included.
pub fn measure_tag<T: Tag + ?Sized>(tag: &T, ctx: &mut Context) -> Result<usize> {
    Ok(measure_header(tag, ctx)?.total_len() * 8)
}

/// Writes the header and payload of `tag`.
///
/// Fails with `FramingMismatch` if the payload does not end exactly where the
/// header says it does.
pub fn write_tag<T: Tag + ?Sized>(tag: &T, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
    let mut header = measure_header(tag, ctx)?;
    header.write(cursor)?;
    tag.write_payload(cursor, ctx)?;
    let delta = cursor.position() as i64 - header.payload_end() as i64;
    if delta != 0 {
        return Err(CoderError::FramingMismatch {
            record: RecordId::Tag(header.code),
            declared: header.length,
            delta_bits: delta,
        });
    }
    Ok(())
}

/// Runs `decode` over the payload framed by `header`.
///
/// The payload must lie inside the buffer (`OutOfBounds` otherwise) and the
/// decoder must consume all of it and no more (`FramingMismatch` otherwise).
pub fn decode_framed<T, F>(
    cursor: &mut BitReader<'_>,
    ctx: &mut Context,
    header: &TagHeader,
    decode: F,
) -> Result<T>
where
    F: FnOnce(&mut BitReader<'_>, &mut Context, &TagHeader) -> Result<T>,
{
    let end = header.payload_end();
    if end > cursor.len_bits() {
        return Err(CoderError::OutOfBounds {
            position: header.start,
            requested: (header.length * 8) as i64,
            limit: cursor.len_bits(),
        });
    }
    let value = decode(cursor, ctx, header)?;
    let delta = cursor.position() as i64 - end as i64;
    if delta != 0 {
        return Err(CoderError::FramingMismatch {
            record: RecordId::Tag(header.code),
            declared: header.length,
            delta_bits: delta,
        });
    }
    Ok(value)
}

/// Reads one complete tag of a known type.
pub fn read_tag<T: DecodeTag>(cursor: &mut BitReader<'_>, ctx: &mut Context) -> Result<T> {
    let header = TagHeader::read(cursor)?;
    decode_framed(cursor, ctx, &header, T::decode_payload)
}

/// Encodes one tag into a buffer of exactly its measured size.
pub fn encode_tag<T: Tag + ?Sized>(tag: &T, ctx: &mut Context) -> Result<Vec<u8>> {
    let bits = measure_tag(tag, ctx)?;
    let mut buffer = vec![0u8; bytes_for_bits(bits)];
    let mut cursor = BitCursor::new(&mut buffer[..]);
    write_tag(tag, &mut cursor, ctx)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tag whose payload is `len` copies of one byte.
    struct Filler {
        len: usize,
        lie: isize,
    }

    impl Tag for Filler {
        fn code(&self) -> u16 {
            700
        }

        fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
            Ok(((self.len as isize + self.lie) * 8) as usize)
        }

        fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
            cursor.write_bytes(&vec![0xAB; self.len])
        }
    }

    #[test]
    fn test_short_and_extended_boundary() {
        let mut ctx = Context::new();

        let short = encode_tag(&Filler { len: 61, lie: 0 }, &mut ctx).unwrap();
        assert_eq!(short.len(), 63);
        assert_eq!(u16::from_le_bytes([short[0], short[1]]) & 0x3F, 61);

        let edge = encode_tag(&Filler { len: 62, lie: 0 }, &mut ctx).unwrap();
        assert_eq!(edge.len(), 64);

        let long = encode_tag(&Filler { len: 63, lie: 0 }, &mut ctx).unwrap();
        assert_eq!(long.len(), 69);
        assert_eq!(u16::from_le_bytes([long[0], long[1]]), (700 << 6) | 0x3F);
        assert_eq!(&long[2..6], &[63, 0, 0, 0]);
    }

    #[test]
    fn test_header_read_back() {
        let data = [0x7F, 0x11, 0x04, 0, 0, 0, 1, 2, 3, 4];
        let mut cursor = BitCursor::new(&data[..]);
        let header = TagHeader::read(&mut cursor).unwrap();
        assert_eq!(header.code, 69);
        assert_eq!(header.length, 4);
        assert!(header.extended);
        assert_eq!(header.start, 48);
        assert_eq!(header.payload_end(), 80);
    }

    #[test]
    fn test_lying_measurement_is_framing_mismatch() {
        let mut ctx = Context::new();
        let err = encode_tag(&Filler { len: 4, lie: 1 }, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            CoderError::FramingMismatch {
                record: RecordId::Tag(700),
                declared: 5,
                delta_bits: -8
            }
        ));
    }

    #[test]
    fn test_payload_past_buffer_is_out_of_bounds() {
        let data = [0x05, 0x00, 1, 2];
        let mut cursor = BitCursor::new(&data[..]);
        let header = TagHeader::read(&mut cursor).unwrap();
        let mut ctx = Context::new();
        let err = decode_framed(&mut cursor, &mut ctx, &header, |_, _, _| Ok(())).unwrap_err();
        assert!(matches!(err, CoderError::OutOfBounds { .. }));
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn test_underconsumed_payload_is_framing_mismatch() {
        let data = [0x02, 0x00, 1, 2];
        let mut cursor = BitCursor::new(&data[..]);
        let header = TagHeader::read(&mut cursor).unwrap();
        let mut ctx = Context::new();
        let err = decode_framed(&mut cursor, &mut ctx, &header, |c, _, _| c.read_u8()).unwrap_err();
        assert!(matches!(
            err,
            CoderError::FramingMismatch { declared: 2, delta_bits: -8, .. }
        ));
    }

    #[test]
    fn test_oversized_code_rejected() {
        let mut buf = [0u8; 2];
        let mut cursor = BitCursor::new(&mut buf[..]);
        let mut header = TagHeader::new(1024, 0);
        assert!(matches!(
            header.write(&mut cursor),
            Err(CoderError::InvalidArgument(_))
        ));
    }
}
