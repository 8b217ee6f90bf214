use brotzoom_core::RasterSize;

use crate::job::TileResult;
use crate::tile::Tile;

/// The displayable RGBA raster tiles are composed into.
///
/// Only the coordinating thread writes here, one finished tile at a time;
/// workers never see it.
#[derive(Debug, Clone)]
pub struct RenderBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major order.
    pub pixels: Vec<u8>,
}

impl RenderBuffer {
    /// Unrendered background colour; failed tiles stay this colour.
    pub const BLANK: [u8; 4] = [0, 0, 0, 0];

    /// Create a blank (fully transparent) buffer.
    pub fn new(raster: &RasterSize) -> Self {
        Self {
            width: raster.width,
            height: raster.height,
            pixels: vec![0u8; raster.pixel_count() * 4],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy a tile's RGBA data into place. Rows or columns that fall outside
    /// the buffer are skipped.
    pub fn blit_tile(&mut self, tile: &Tile, tile_pixels: &[u8]) {
        debug_assert_eq!(tile_pixels.len(), tile.pixel_count() * 4);
        if tile.x >= self.width {
            return;
        }
        let stride = self.width as usize * 4;
        let src_stride = tile.width as usize * 4;
        let copy_len = tile.width.min(self.width - tile.x) as usize * 4;
        for row in 0..tile.height {
            let y = tile.y + row;
            if y >= self.height {
                break;
            }
            let src_start = row as usize * src_stride;
            let dst_start = y as usize * stride + tile.x as usize * 4;
            self.pixels[dst_start..dst_start + copy_len]
                .copy_from_slice(&tile_pixels[src_start..src_start + copy_len]);
        }
    }

    /// Write a finished tile at its raster offset.
    pub fn write_result(&mut self, result: &TileResult) {
        self.blit_tile(&result.tile, &result.pixels);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}
