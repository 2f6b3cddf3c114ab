// src/video/delta.rs

//! Block-delta coding of consecutive frames.
//!
//! The first frame of a stream is a keyframe carrying every block. After that
//! a block is sent only when its pixels differ from the block at the same index
//! in the previous frame; identical blocks become zero-length placeholders.

use crate::utils::error::{CoderError, Result};
use crate::video::compressor::{BlockCompressor, ZlibBlockCompressor};
use crate::video::grid::{BlockGrid, ImageBlock};
use crate::video::screen_packet::{BlockData, ScreenPacket};
use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn check_blocks(grid: &BlockGrid, blocks: &[ImageBlock]) -> Result<()> {
    if blocks.len() != grid.block_count() {
        return Err(CoderError::invalid(format!(
            "frame has {} blocks, grid has {}",
            blocks.len(),
            grid.block_count()
        )));
    }
    for (index, block) in blocks.iter().enumerate() {
        let size = grid.block_size(index);
        if size != Some((block.width(), block.height())) {
            return Err(CoderError::invalid(format!(
                "block {} is {}x{}, grid expects {:?}",
                index,
                block.width(),
                block.height(),
                size
            )));
        }
    }
    Ok(())
}

/// Indices of the blocks that differ from `previous`, or all of them.
fn changed_indices(previous: Option<&[ImageBlock]>, current: &[ImageBlock]) -> Vec<usize> {
    match previous {
        None => (0..current.len()).collect(),
        Some(previous) => current
            .iter()
            .zip(previous)
            .enumerate()
            .filter(|(_, (now, before))| now.pixels() != before.pixels())
            .map(|(index, _)| index)
            .collect(),
    }
}

fn compress_blocks<C: BlockCompressor>(
    compressor: &C,
    blocks: &[ImageBlock],
    indices: &[usize],
) -> Result<Vec<Vec<u8>>> {
    #[cfg(feature = "rayon")]
    let compressed: Result<Vec<_>> = indices
        .par_iter()
        .map(|&index| compressor.compress(blocks[index].pixels()))
        .collect();

    #[cfg(not(feature = "rayon"))]
    let compressed: Result<Vec<_>> = indices
        .iter()
        .map(|&index| compressor.compress(blocks[index].pixels()))
        .collect();

    compressed
}

/// Places compressed blocks at their indices; the rest stay unchanged.
fn assemble(count: usize, changed: &[usize], compressed: Vec<Vec<u8>>) -> Vec<BlockData> {
    let mut data = vec![BlockData::Unchanged; count];
    for (&index, bytes) in changed.iter().zip(compressed) {
        data[index] = BlockData::Changed(bytes.into());
    }
    data
}

/// Produces screen packets for one video stream.
pub struct BlockDeltaEncoder<C = ZlibBlockCompressor> {
    grid: BlockGrid,
    compressor: C,
    previous: Option<Vec<ImageBlock>>,
}

impl BlockDeltaEncoder {
    pub fn new(grid: BlockGrid) -> Self {
        BlockDeltaEncoder::with_compressor(grid, ZlibBlockCompressor::default())
    }
}

impl<C: BlockCompressor> BlockDeltaEncoder<C> {
    pub fn with_compressor(grid: BlockGrid, compressor: C) -> Self {
        BlockDeltaEncoder {
            grid,
            compressor,
            previous: None,
        }
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Encodes the next frame. `blocks` must follow the grid's block order.
    pub fn encode_frame(&mut self, blocks: &[ImageBlock]) -> Result<ScreenPacket> {
        check_blocks(&self.grid, blocks)?;

        let keyframe = self.previous.is_none();
        let changed = changed_indices(self.previous.as_deref(), blocks);
        let compressed = compress_blocks(&self.compressor, blocks, &changed)?;

        let data = assemble(blocks.len(), &changed, compressed);
        if keyframe {
            debug!("screen video keyframe: {} blocks", blocks.len());
        } else {
            debug!("screen video frame: {} of {} blocks changed", changed.len(), blocks.len());
        }

        let packet = ScreenPacket::new(keyframe, self.grid, data)?;
        self.previous = Some(blocks.to_vec());
        Ok(packet)
    }

    /// Forgets the previous frame so the next one is a keyframe.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Encodes `current` against `previous` without keeping any state.
///
/// With no previous frame the result is a keyframe.
pub fn encode_delta<C: BlockCompressor>(
    grid: &BlockGrid,
    compressor: &C,
    previous: Option<&[ImageBlock]>,
    current: &[ImageBlock],
) -> Result<ScreenPacket> {
    if let Some(previous) = previous {
        check_blocks(grid, previous)?;
    }
    check_blocks(grid, current)?;

    let changed = changed_indices(previous, current);
    let compressed = compress_blocks(compressor, current, &changed)?;
    let data = assemble(current.len(), &changed, compressed);
    ScreenPacket::new(previous.is_none(), *grid, data)
}

/// Rebuilds the frames of a stream from its packets.
pub struct ScreenFrameDecoder<C = ZlibBlockCompressor> {
    compressor: C,
    grid: Option<BlockGrid>,
    blocks: Vec<ImageBlock>,
}

impl ScreenFrameDecoder {
    pub fn new() -> Self {
        ScreenFrameDecoder::with_compressor(ZlibBlockCompressor::default())
    }
}

impl Default for ScreenFrameDecoder {
    fn default() -> Self {
        ScreenFrameDecoder::new()
    }
}

impl<C: BlockCompressor> ScreenFrameDecoder<C> {
    pub fn with_compressor(compressor: C) -> Self {
        ScreenFrameDecoder {
            compressor,
            grid: None,
            blocks: Vec::new(),
        }
    }

    /// Applies `packet` and returns the full block list of the frame.
    ///
    /// An inter frame needs a preceding keyframe with the same grid.
    pub fn decode_frame(&mut self, packet: &ScreenPacket) -> Result<&[ImageBlock]> {
        let grid = *packet.grid();
        if !packet.is_keyframe() && self.grid != Some(grid) {
            return Err(CoderError::invalid(
                "inter frame without a keyframe for the same grid",
            ));
        }

        let mut blocks = Vec::with_capacity(grid.block_count());
        for (index, data) in packet.blocks().iter().enumerate() {
            let block = match data {
                BlockData::Unchanged => self
                    .blocks
                    .get(index)
                    .cloned()
                    .ok_or_else(|| CoderError::invalid("unchanged block has no predecessor"))?,
                BlockData::Changed(bytes) => {
                    let (width, height) = grid
                        .block_size(index)
                        .ok_or_else(|| CoderError::invalid("block index outside the grid"))?;
                    let len = width as usize * height as usize * 3;
                    let pixels = self.compressor.decompress(bytes, len)?;
                    ImageBlock::new(width, height, pixels)?
                }
            };
            blocks.push(block);
        }

        self.grid = Some(grid);
        self.blocks = blocks;
        Ok(&self.blocks)
    }

    /// Reassembles the current frame into a packed BGR raster.
    pub fn raster(&self) -> Option<Vec<u8>> {
        let grid = self.grid?;
        let stride = grid.image_width() as usize * 3;
        let mut raster = vec![0u8; stride * grid.image_height() as usize];
        for (index, block) in self.blocks.iter().enumerate() {
            let column = index % grid.columns();
            let row = index / grid.columns();
            let x = column * grid.block_width() as usize * 3;
            let y = row * grid.block_height() as usize;
            let line_len = block.width() as usize * 3;
            for (line, pixels) in block.pixels().chunks_exact(line_len.max(1)).enumerate() {
                let start = (y + line) * stride + x;
                raster[start..start + line_len].copy_from_slice(pixels);
            }
        }
        Some(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::grid::tile_raster;

    fn frame(grid: &BlockGrid, seed: u8) -> Vec<ImageBlock> {
        let raster: Vec<u8> = (0..grid.image_width() as usize * grid.image_height() as usize * 3)
            .map(|i| (i as u8).wrapping_mul(seed))
            .collect();
        tile_raster(&raster, grid).unwrap()
    }

    #[test]
    fn test_first_frame_is_keyframe() {
        let grid = BlockGrid::new(96, 64, 32, 32).unwrap();
        let mut encoder = BlockDeltaEncoder::new(grid);
        let packet = encoder.encode_frame(&frame(&grid, 3)).unwrap();
        assert!(packet.is_keyframe());
        assert_eq!(packet.changed_count(), 6);
    }

    #[test]
    fn test_identical_frame_is_all_unchanged() {
        let grid = BlockGrid::new(96, 64, 32, 32).unwrap();
        let mut encoder = BlockDeltaEncoder::new(grid);
        let blocks = frame(&grid, 3);
        encoder.encode_frame(&blocks).unwrap();
        let packet = encoder.encode_frame(&blocks).unwrap();
        assert!(!packet.is_keyframe());
        assert!(packet.blocks().iter().all(|b| *b == BlockData::Unchanged));
    }

    #[test]
    fn test_reset_forces_keyframe() {
        let grid = BlockGrid::new(32, 32, 32, 32).unwrap();
        let mut encoder = BlockDeltaEncoder::new(grid);
        let blocks = frame(&grid, 1);
        encoder.encode_frame(&blocks).unwrap();
        encoder.reset();
        assert!(encoder.encode_frame(&blocks).unwrap().is_keyframe());
    }

    #[test]
    fn test_block_count_mismatch() {
        let grid = BlockGrid::new(96, 64, 32, 32).unwrap();
        let mut encoder = BlockDeltaEncoder::new(grid);
        let mut blocks = frame(&grid, 3);
        blocks.pop();
        assert!(matches!(
            encoder.encode_frame(&blocks),
            Err(CoderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_stateless_delta_matches_encoder() {
        let grid = BlockGrid::new(64, 48, 32, 16).unwrap();
        let zlib = ZlibBlockCompressor::default();
        let first = frame(&grid, 5);
        let mut second = first.clone();
        second[4] = ImageBlock::new(32, 16, vec![0xAB; 32 * 16 * 3]).unwrap();

        let mut encoder = BlockDeltaEncoder::new(grid);
        encoder.encode_frame(&first).unwrap();
        let stateful = encoder.encode_frame(&second).unwrap();
        let stateless = encode_delta(&grid, &zlib, Some(&first), &second).unwrap();
        assert_eq!(stateful, stateless);
        assert_eq!(stateless.changed_count(), 1);
        assert!(stateless.blocks()[4].is_changed());
    }

    #[test]
    fn test_decoder_rebuilds_frames() {
        let grid = BlockGrid::new(80, 40, 32, 32).unwrap();
        let first = frame(&grid, 7);
        let mut second = first.clone();
        let (w, h) = grid.block_size(5).unwrap();
        second[5] = ImageBlock::new(w, h, vec![9; w as usize * h as usize * 3]).unwrap();

        let mut encoder = BlockDeltaEncoder::new(grid);
        let mut decoder = ScreenFrameDecoder::new();
        assert!(decoder.raster().is_none());

        let key = encoder.encode_frame(&first).unwrap();
        assert_eq!(decoder.decode_frame(&key).unwrap(), &first[..]);
        let delta = encoder.encode_frame(&second).unwrap();
        assert_eq!(delta.changed_count(), 1);
        assert_eq!(decoder.decode_frame(&delta).unwrap(), &second[..]);
    }

    #[test]
    fn test_decoder_needs_keyframe() {
        let grid = BlockGrid::new(32, 32, 32, 32).unwrap();
        let packet = ScreenPacket::new(false, grid, vec![BlockData::Unchanged]).unwrap();
        let mut decoder = ScreenFrameDecoder::new();
        assert!(decoder.decode_frame(&packet).is_err());
    }

    #[test]
    fn test_raster_reassembly() {
        let grid = BlockGrid::new(40, 20, 16, 16).unwrap();
        let raster: Vec<u8> = (0..40 * 20 * 3).map(|i| (i % 251) as u8).collect();
        let blocks = tile_raster(&raster, &grid).unwrap();
        let mut encoder = BlockDeltaEncoder::new(grid);
        let mut decoder = ScreenFrameDecoder::new();
        decoder.decode_frame(&encoder.encode_frame(&blocks).unwrap()).unwrap();
        assert_eq!(decoder.raster().unwrap(), raster);
    }
}
