// src/video/screen_packet.rs

//! One frame of the screen-video codec.
//!
//! Layout (big-endian):
//!
//! ```text
//! frame_type:4  codec:4
//! block_width/16-1:4   image_width:12
//! block_height/16-1:4  image_height:12
//! per block: size:u16, then `size` bytes (0 = unchanged)
//! ```

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::record::{Decode, Record, RecordId};
use crate::utils::error::{CoderError, Result};
use crate::video::grid::{BLOCK_UNIT, BlockGrid};
use byteorder::BigEndian;
use std::sync::Arc;

const KEY_FRAME: u32 = 1;
const INTER_FRAME: u32 = 2;
const SCREEN_CODEC: u32 = 3;
const HEADER_BITS: usize = 40;

/// A block entry in a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockData {
    /// Same pixels as the previous frame.
    Unchanged,
    /// Compressed pixels, 1 to 65535 bytes.
    Changed(Arc<[u8]>),
}

impl BlockData {
    pub fn is_changed(&self) -> bool {
        matches!(self, BlockData::Changed(_))
    }

    fn encoded_len(&self) -> usize {
        match self {
            BlockData::Unchanged => 0,
            BlockData::Changed(data) => data.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenPacket {
    keyframe: bool,
    grid: BlockGrid,
    blocks: Vec<BlockData>,
}

impl ScreenPacket {
    pub fn new(keyframe: bool, grid: BlockGrid, blocks: Vec<BlockData>) -> Result<Self> {
        if blocks.len() != grid.block_count() {
            return Err(CoderError::invalid(format!(
                "{} blocks for a grid of {}",
                blocks.len(),
                grid.block_count()
            )));
        }
        for (index, block) in blocks.iter().enumerate() {
            match block {
                BlockData::Unchanged if keyframe => {
                    return Err(CoderError::invalid(format!(
                        "keyframe block {} is marked unchanged",
                        index
                    )));
                }
                BlockData::Changed(data) if data.is_empty() || data.len() > u16::MAX as usize => {
                    return Err(CoderError::invalid(format!(
                        "block {} has {} bytes, outside 1..=65535",
                        index,
                        data.len()
                    )));
                }
                _ => {}
            }
        }
        Ok(ScreenPacket {
            keyframe,
            grid,
            blocks,
        })
    }

    pub fn is_keyframe(&self) -> bool {
        self.keyframe
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub fn blocks(&self) -> &[BlockData] {
        &self.blocks
    }

    pub fn changed_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_changed()).count()
    }
}

impl Record for ScreenPacket {
    fn record_id(&self) -> RecordId {
        RecordId::Value("screen packet")
    }

    fn measure(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(HEADER_BITS
            + self
                .blocks
                .iter()
                .map(|b| 16 + b.encoded_len() * 8)
                .sum::<usize>())
    }

    fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        let frame_type = if self.keyframe { KEY_FRAME } else { INTER_FRAME };
        cursor.write_bits(frame_type as i64, 4)?;
        cursor.write_bits(SCREEN_CODEC as i64, 4)?;
        cursor.write_bits((self.grid.block_width() / BLOCK_UNIT - 1) as i64, 4)?;
        cursor.write_bits(self.grid.image_width() as i64, 12)?;
        cursor.write_bits((self.grid.block_height() / BLOCK_UNIT - 1) as i64, 4)?;
        cursor.write_bits(self.grid.image_height() as i64, 12)?;

        for block in &self.blocks {
            match block {
                BlockData::Unchanged => cursor.write_u16::<BigEndian>(0)?,
                BlockData::Changed(data) => {
                    cursor.write_u16::<BigEndian>(data.len() as u16)?;
                    cursor.write_bytes(data)?;
                }
            }
        }
        Ok(())
    }
}

impl Decode for ScreenPacket {
    fn decode(cursor: &mut BitReader<'_>, _ctx: &mut Context) -> Result<Self> {
        let keyframe = match cursor.read_ub(4)? {
            KEY_FRAME => true,
            INTER_FRAME => false,
            other => {
                return Err(CoderError::UnsupportedVariant {
                    record: "screen frame type",
                    value: other,
                });
            }
        };
        let codec = cursor.read_ub(4)?;
        if codec != SCREEN_CODEC {
            return Err(CoderError::UnsupportedVariant {
                record: "screen codec",
                value: codec,
            });
        }

        let block_width = (cursor.read_ub(4)? as u16 + 1) * BLOCK_UNIT;
        let image_width = cursor.read_ub(12)? as u16;
        let block_height = (cursor.read_ub(4)? as u16 + 1) * BLOCK_UNIT;
        let image_height = cursor.read_ub(12)? as u16;
        let grid = BlockGrid::new(image_width, image_height, block_width, block_height)?;

        let mut blocks = Vec::with_capacity(grid.block_count());
        for _ in 0..grid.block_count() {
            let size = cursor.read_u16::<BigEndian>()? as usize;
            blocks.push(if size == 0 {
                BlockData::Unchanged
            } else {
                BlockData::Changed(cursor.read_bytes(size)?.into())
            });
        }
        ScreenPacket::new(keyframe, grid, blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::record::{decode, encode};

    fn grid() -> BlockGrid {
        BlockGrid::new(100, 40, 64, 32).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let blocks = vec![BlockData::Unchanged; 4];
        let packet = ScreenPacket::new(false, grid(), blocks).unwrap();
        let bytes = encode(&packet, &mut Context::new()).unwrap();
        // inter frame, codec 3; 64 = (3+1)*16 wide 100; 32 = (1+1)*16 high 40
        assert_eq!(&bytes[..5], &[0x23, 0x30, 0x64, 0x10, 0x28]);
        assert_eq!(bytes.len(), 5 + 4 * 2);
        assert!(bytes[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_round_trip() {
        let blocks = vec![
            BlockData::Changed(vec![1, 2, 3].into()),
            BlockData::Unchanged,
            BlockData::Changed(vec![9].into()),
            BlockData::Unchanged,
        ];
        let packet = ScreenPacket::new(false, grid(), blocks).unwrap();
        assert_eq!(packet.changed_count(), 2);
        let mut ctx = Context::new();
        let bytes = encode(&packet, &mut ctx).unwrap();
        assert_eq!(&bytes[5..10], &[0x00, 0x03, 1, 2, 3]);
        assert_eq!(decode::<ScreenPacket>(&bytes, &mut ctx).unwrap(), packet);
    }

    #[test]
    fn test_construction_checks() {
        assert!(ScreenPacket::new(false, grid(), vec![BlockData::Unchanged; 3]).is_err());
        assert!(ScreenPacket::new(true, grid(), vec![BlockData::Unchanged; 4]).is_err());
        let empty = BlockData::Changed(Vec::<u8>::new().into());
        assert!(ScreenPacket::new(false, grid(), vec![empty, BlockData::Unchanged, BlockData::Unchanged, BlockData::Unchanged]).is_err());
    }

    #[test]
    fn test_rejects_other_codecs() {
        let mut ctx = Context::new();
        assert!(matches!(
            decode::<ScreenPacket>(&[0x14, 0, 0, 0, 0], &mut ctx),
            Err(CoderError::UnsupportedVariant { record: "screen codec", value: 4 })
        ));
        assert!(matches!(
            decode::<ScreenPacket>(&[0x33, 0, 0, 0, 0], &mut ctx),
            Err(CoderError::UnsupportedVariant { record: "screen frame type", value: 3 })
        ));
    }

    #[test]
    fn test_truncated_block_data() {
        let packet = ScreenPacket::new(true, BlockGrid::new(16, 16, 16, 16).unwrap(), vec![BlockData::Changed(vec![7; 10].into())]).unwrap();
        let bytes = encode(&packet, &mut Context::new()).unwrap();
        assert!(matches!(
            decode::<ScreenPacket>(&bytes[..bytes.len() - 1], &mut Context::new()),
            Err(CoderError::OutOfBounds { .. })
        ));
    }
}
