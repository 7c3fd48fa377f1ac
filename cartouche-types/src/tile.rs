use crate::bounds::Bounds;
use crate::error::CartoucheTypesError;

/// Half of the width of the world in spherical mercator, in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;

const MAX_ZOOM: u32 = 30;

/// Address of a tile in the standard web-mercator ("slippy map") tiling scheme. Tile `0/0/0`
/// covers the whole world, rows grow from north to south.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct TileIndex {
    /// X index (column).
    pub x: u32,
    /// Y index (row).
    pub y: u32,
    /// Z index (zoom level).
    pub z: u32,
}

impl TileIndex {
    /// Creates a new index instance, checking that the tile exists on its zoom level.
    pub fn new(x: u32, y: u32, z: u32) -> Result<Self, CartoucheTypesError> {
        if z > MAX_ZOOM || x >= (1 << z) || y >= (1 << z) {
            return Err(CartoucheTypesError::InvalidTile { z, x, y });
        }

        Ok(Self { x, y, z })
    }

    /// Number of tiles along each axis on the zoom level of the tile.
    pub fn tiles_per_axis(&self) -> u32 {
        1 << self.z
    }

    /// Extent of the tile in spherical mercator meters.
    pub fn web_mercator_bounds(&self) -> Bounds {
        let tile_size = 2.0 * WEB_MERCATOR_EXTENT / self.tiles_per_axis() as f64;

        let x_min = -WEB_MERCATOR_EXTENT + self.x as f64 * tile_size;
        let y_max = WEB_MERCATOR_EXTENT - self.y as f64 * tile_size;

        Bounds::from_corners(x_min + tile_size, y_max, x_min, y_max - tile_size)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn top_left_tile_of_first_level() {
        let bounds = TileIndex::new(0, 0, 1).unwrap().web_mercator_bounds();
        assert_abs_diff_eq!(bounds.nw().x, -20037508.34, epsilon = 0.01);
        assert_abs_diff_eq!(bounds.nw().y, 20037508.34, epsilon = 0.01);
        assert_abs_diff_eq!(bounds.se().x, 0.0, epsilon = 0.001);
        assert_abs_diff_eq!(bounds.se().y, 0.0, epsilon = 0.001);
    }

    #[test]
    fn whole_world() {
        let bounds = TileIndex::new(0, 0, 0).unwrap().web_mercator_bounds();
        assert_abs_diff_eq!(bounds.width(), 2.0 * WEB_MERCATOR_EXTENT, epsilon = 0.001);
        assert_abs_diff_eq!(bounds.height(), 2.0 * WEB_MERCATOR_EXTENT, epsilon = 0.001);
    }

    #[test]
    fn deep_tile() {
        let index = TileIndex::new(1219, 1539, 12).unwrap();
        let bounds = index.web_mercator_bounds();
        let tile_size = 2.0 * WEB_MERCATOR_EXTENT / 4096.0;
        assert_abs_diff_eq!(bounds.width(), tile_size, epsilon = 1e-6);
        assert_abs_diff_eq!(
            bounds.nw().x,
            -WEB_MERCATOR_EXTENT + 1219.0 * tile_size,
            epsilon = 1e-6
        );
    }

    #[test]
    fn tile_outside_of_grid() {
        assert_matches!(
            TileIndex::new(2, 0, 1),
            Err(CartoucheTypesError::InvalidTile { z: 1, x: 2, y: 0 })
        );
        assert_matches!(TileIndex::new(0, 0, 31), Err(_));
    }
}
