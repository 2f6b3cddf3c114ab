// src/movie/file_attributes.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::movie::tags::codes;
use crate::utils::error::Result;
use byteorder::LittleEndian;

const USE_DIRECT_BLIT: u32 = 0x40;
const USE_GPU: u32 = 0x20;
const HAS_METADATA: u32 = 0x10;
const ACTIONSCRIPT3: u32 = 0x08;
const USE_NETWORK: u32 = 0x01;

/// Movie-wide capability flags. Must be the first tag of a version 8+ movie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub use_direct_blit: bool,
    pub use_gpu: bool,
    pub has_metadata: bool,
    pub has_actionscript3: bool,
    /// Grants network access to a movie played from the local file system.
    pub use_network: bool,
}

impl FileAttributes {
    pub fn new(has_metadata: bool, has_actionscript3: bool, use_network: bool) -> Self {
        FileAttributes {
            has_metadata,
            has_actionscript3,
            use_network,
            ..Default::default()
        }
    }

    fn flags(&self) -> u32 {
        let mut flags = 0;
        for (set, bit) in [
            (self.use_direct_blit, USE_DIRECT_BLIT),
            (self.use_gpu, USE_GPU),
            (self.has_metadata, HAS_METADATA),
            (self.has_actionscript3, ACTIONSCRIPT3),
            (self.use_network, USE_NETWORK),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }
}

impl Tag for FileAttributes {
    fn code(&self) -> u16 {
        codes::FILE_ATTRIBUTES
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(32)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        cursor.write_u32::<LittleEndian>(self.flags())
    }
}

impl DecodeTag for FileAttributes {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        _header: &TagHeader,
    ) -> Result<Self> {
        let flags = cursor.read_u32::<LittleEndian>()?;
        Ok(FileAttributes {
            use_direct_blit: flags & USE_DIRECT_BLIT != 0,
            use_gpu: flags & USE_GPU != 0,
            has_metadata: flags & HAS_METADATA != 0,
            has_actionscript3: flags & ACTIONSCRIPT3 != 0,
            use_network: flags & USE_NETWORK != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::bit_cursor::BitCursor;
    use crate::coder::framing::{encode_tag, read_tag};

    const EMPTY: [u8; 6] = [0x44, 0x11, 0x00, 0x00, 0x00, 0x00];
    const ENCODED: [u8; 6] = [0x44, 0x11, 0x19, 0x00, 0x00, 0x00];
    const EXTENDED: [u8; 10] = [0x7F, 0x11, 0x04, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00];

    #[test]
    fn test_encode() {
        let mut ctx = Context::new();
        let tag = FileAttributes::new(true, true, true);
        assert_eq!(encode_tag(&tag, &mut ctx).unwrap(), ENCODED);
        assert_eq!(encode_tag(&FileAttributes::default(), &mut ctx).unwrap(), EMPTY);
    }

    #[test]
    fn test_decode_short_and_extended() {
        for data in [&ENCODED[..], &EXTENDED[..]] {
            let mut ctx = Context::new();
            let mut cursor = BitCursor::new(data);
            let tag: FileAttributes = read_tag(&mut cursor, &mut ctx).unwrap();
            assert!(cursor.at_end());
            assert!(tag.has_metadata);
            assert!(tag.has_actionscript3);
            assert!(tag.use_network);
            assert!(!tag.use_gpu);
        }
    }

    #[test]
    fn test_copy_is_equal() {
        let tag = FileAttributes {
            use_gpu: true,
            ..FileAttributes::new(false, true, false)
        };
        let copy = tag;
        assert_eq!(copy, tag);
        assert_eq!(format!("{:?}", copy), format!("{:?}", tag));
    }
}
