use brotzoom_core::RasterSize;

use crate::error::RenderError;

/// Default tile edge in pixels. A 64×64 tile is 16 KB of RGBA.
pub const TILE_SIZE: u32 = 64;

/// A rectangular tile within the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    /// Tile width in pixels (may be smaller at the right edge).
    pub width: u32,
    /// Tile height in pixels (may be smaller at the bottom edge).
    pub height: u32,
}

impl Tile {
    /// Number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Partition a `width × height` raster into tiles of at most
/// `tile_width × tile_height`, row-major.
///
/// Edge tiles are clipped to the raster, never padded, so the tiles are
/// disjoint and cover every pixel exactly once. Callers must not depend on
/// the order once tiles are handed to the scheduler.
pub fn decompose(
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
) -> crate::Result<Vec<Tile>> {
    if tile_width == 0 || tile_height == 0 {
        return Err(RenderError::InvalidTileSize {
            width: tile_width,
            height: tile_height,
        });
    }

    Ok(grid(width, height, tile_width, tile_height))
}

/// Square [`TILE_SIZE`] grid over `raster`.
pub fn build_tile_grid(raster: &RasterSize) -> Vec<Tile> {
    grid(raster.width, raster.height, TILE_SIZE, TILE_SIZE)
}

fn grid(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(
        width.div_ceil(tile_width) as usize * height.div_ceil(tile_height) as usize,
    );
    let mut y = 0;
    while y < height {
        let th = tile_height.min(height - y);
        let mut x = 0;
        while x < width {
            let tw = tile_width.min(width - x);
            tiles.push(Tile {
                x,
                y,
                width: tw,
                height: th,
            });
            x += tw;
        }
        y += th;
    }
    tiles
}
