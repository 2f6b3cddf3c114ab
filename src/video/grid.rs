// src/video/grid.rs

//! Block layout of a screen-video stream.
//!
//! A frame is cut into fixed-size blocks, numbered row-major from the
//! top-left. The blocks in the last column and the last row are truncated to
//! the image edge.

use crate::utils::error::{CoderError, Result};
use std::sync::Arc;

/// Largest image side a packet header can carry (12 bits).
pub const MAX_IMAGE_SIDE: u16 = 0x0FFF;
/// Block sides are multiples of this, up to sixteen of them.
pub const BLOCK_UNIT: u16 = 16;
pub const MAX_BLOCK_SIDE: u16 = BLOCK_UNIT * 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockGrid {
    image_width: u16,
    image_height: u16,
    block_width: u16,
    block_height: u16,
}

fn check_block_side(side: u16, what: &str) -> Result<u16> {
    if side == 0 || side % BLOCK_UNIT != 0 || side > MAX_BLOCK_SIDE {
        return Err(CoderError::invalid(format!(
            "{} {} is not a multiple of {} in {}..={}",
            what, side, BLOCK_UNIT, BLOCK_UNIT, MAX_BLOCK_SIDE
        )));
    }
    Ok(side)
}

fn check_image_side(side: u16, what: &str) -> Result<u16> {
    if side > MAX_IMAGE_SIDE {
        return Err(CoderError::invalid(format!(
            "{} {} exceeds {}",
            what, side, MAX_IMAGE_SIDE
        )));
    }
    Ok(side)
}

impl BlockGrid {
    pub fn new(image_width: u16, image_height: u16, block_width: u16, block_height: u16) -> Result<Self> {
        Ok(BlockGrid {
            image_width: check_image_side(image_width, "image width")?,
            image_height: check_image_side(image_height, "image height")?,
            block_width: check_block_side(block_width, "block width")?,
            block_height: check_block_side(block_height, "block height")?,
        })
    }

    pub fn image_width(&self) -> u16 {
        self.image_width
    }

    pub fn image_height(&self) -> u16 {
        self.image_height
    }

    pub fn block_width(&self) -> u16 {
        self.block_width
    }

    pub fn block_height(&self) -> u16 {
        self.block_height
    }

    pub fn columns(&self) -> usize {
        (self.image_width as usize).div_ceil(self.block_width as usize)
    }

    pub fn rows(&self) -> usize {
        (self.image_height as usize).div_ceil(self.block_height as usize)
    }

    pub fn block_count(&self) -> usize {
        self.columns() * self.rows()
    }

    /// Pixel size of block `index`, or `None` past the last block.
    pub fn block_size(&self, index: usize) -> Option<(u16, u16)> {
        if index >= self.block_count() {
            return None;
        }
        let (row, column) = (index / self.columns(), index % self.columns());
        let x = column * self.block_width as usize;
        let y = row * self.block_height as usize;
        let width = (self.image_width as usize - x).min(self.block_width as usize);
        let height = (self.image_height as usize - y).min(self.block_height as usize);
        Some((width as u16, height as u16))
    }
}

/// The pixels of one block: BGR triples, rows from top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    width: u16,
    height: u16,
    pixels: Arc<[u8]>,
}

impl ImageBlock {
    pub fn new(width: u16, height: u16, pixels: impl Into<Arc<[u8]>>) -> Result<Self> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(CoderError::invalid(format!(
                "{}x{} block needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(ImageBlock {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Shares the pixel buffer.
    pub fn shared_pixels(&self) -> Arc<[u8]> {
        Arc::clone(&self.pixels)
    }
}

/// Splits a packed BGR raster into the blocks of `grid`, in block order.
pub fn tile_raster(raster: &[u8], grid: &BlockGrid) -> Result<Vec<ImageBlock>> {
    let pixels: &[[u8; 3]] = bytemuck::try_cast_slice(raster)
        .map_err(|_| CoderError::invalid("raster length is not a whole number of pixels"))?;
    let stride = grid.image_width() as usize;
    if pixels.len() != stride * grid.image_height() as usize {
        return Err(CoderError::invalid(format!(
            "raster of {} pixels does not match {}x{}",
            pixels.len(),
            grid.image_width(),
            grid.image_height()
        )));
    }

    let mut blocks = Vec::with_capacity(grid.block_count());
    for row in 0..grid.rows() {
        for column in 0..grid.columns() {
            let index = row * grid.columns() + column;
            let Some((width, height)) = grid.block_size(index) else {
                break;
            };
            let x = column * grid.block_width() as usize;
            let y = row * grid.block_height() as usize;
            let mut data = Vec::with_capacity(width as usize * height as usize * 3);
            for line in y..y + height as usize {
                let start = line * stride + x;
                data.extend_from_slice(bytemuck::cast_slice(&pixels[start..start + width as usize]));
            }
            blocks.push(ImageBlock::new(width, height, data)?);
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_blocks_are_truncated() {
        let grid = BlockGrid::new(100, 70, 64, 32).unwrap();
        assert_eq!((grid.columns(), grid.rows()), (2, 3));
        assert_eq!(grid.block_count(), 6);
        assert_eq!(grid.block_size(0), Some((64, 32)));
        assert_eq!(grid.block_size(1), Some((36, 32)));
        assert_eq!(grid.block_size(5), Some((36, 6)));
        assert_eq!(grid.block_size(6), None);
    }

    #[test]
    fn test_grid_limits() {
        assert!(BlockGrid::new(4096, 10, 16, 16).is_err());
        assert!(BlockGrid::new(10, 10, 24, 16).is_err());
        assert!(BlockGrid::new(10, 10, 16, 272).is_err());
        assert!(BlockGrid::new(10, 10, 0, 16).is_err());
        assert!(BlockGrid::new(4095, 4095, 256, 16).is_ok());
    }

    #[test]
    fn test_empty_image_has_no_blocks() {
        let grid = BlockGrid::new(0, 0, 64, 64).unwrap();
        assert_eq!(grid.block_count(), 0);
        assert!(tile_raster(&[], &grid).unwrap().is_empty());
    }

    #[test]
    fn test_block_pixel_length() {
        assert!(ImageBlock::new(2, 2, vec![0u8; 12]).is_ok());
        assert!(ImageBlock::new(2, 2, vec![0u8; 11]).is_err());
    }

    #[test]
    fn test_tile_raster_order() {
        let width = 20usize;
        let height = 2usize;
        let raster: Vec<u8> = (0..width * height)
            .flat_map(|i| [i as u8, 0, 0])
            .collect();
        let grid = BlockGrid::new(width as u16, height as u16, 16, 16).unwrap();
        let blocks = tile_raster(&raster, &grid).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].width(), blocks[0].height()), (16, 2));
        assert_eq!((blocks[1].width(), blocks[1].height()), (4, 2));
        // second block starts at pixel 16 of row 0, then pixel 16 of row 1
        assert_eq!(blocks[1].pixels()[0], 16);
        assert_eq!(blocks[1].pixels()[12], 36);
    }

    #[test]
    fn test_tile_raster_rejects_bad_length() {
        let grid = BlockGrid::new(2, 2, 16, 16).unwrap();
        assert!(tile_raster(&[0u8; 11], &grid).is_err());
        assert!(tile_raster(&[0u8; 9], &grid).is_err());
    }
}
