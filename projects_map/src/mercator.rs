//! Project the lon/lat coordinates into a 2D x/y using the Web Mercator.
//! <https://en.wikipedia.org/wiki/Web_Mercator_projection>
//! <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>

use std::f64::consts::PI;

use crate::position::{BoundingBox, Pixels, Position, lon_lat};

/// Size of a single tile of the "world bitmap". Sources with larger tiles are mapped onto it by
/// lowering their zoom level.
pub const TILE_SIZE: u32 = 256;

/// Web Mercator is undefined beyond this latitude.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Zoom specifies how many pixels are in the whole map. Zoom 0 means that the whole map is just
/// one 256x256 tile, zoom 1 means that it is 2x2 tiles, and so on.
pub(crate) fn total_pixels(zoom: f64) -> f64 {
    2f64.powf(zoom) * (TILE_SIZE as f64)
}

pub fn total_tiles(zoom: u8) -> u32 {
    2u32.pow(zoom as u32)
}

/// Project the position into the Mercator projection and normalize it to 0-1 range.
fn mercator_normalized(position: Position) -> (f64, f64) {
    let x = position.x().to_radians();
    let y = position
        .y()
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
        .to_radians()
        .tan()
        .asinh();

    let x = (1. + (x / PI)) / 2.;
    let y = (1. - (y / PI)) / 2.;

    (x, y)
}

/// Coordinates of the slippy-map tile.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TileId {
    /// X number of the tile.
    pub x: u32,

    /// Y number of the tile.
    pub y: u32,

    /// Zoom level, where 0 means no zoom.
    /// See: <https://wiki.openstreetmap.org/wiki/Zoom_levels>
    pub zoom: u8,
}

impl TileId {
    pub fn valid(&self) -> bool {
        self.x < total_tiles(self.zoom) && self.y < total_tiles(self.zoom)
    }

    /// Geographical extent covered by this tile.
    pub fn bounding_box(&self) -> BoundingBox {
        let n = total_tiles(self.zoom) as f64;
        let lon = |x: u32| x as f64 / n * 360. - 180.;
        let lat = |y: u32| (PI * (1. - 2. * y as f64 / n)).sinh().atan().to_degrees();

        BoundingBox {
            west: lon(self.x),
            south: lat(self.y + 1),
            east: lon(self.x + 1),
            north: lat(self.y),
        }
    }
}

/// Project geographical position into a 2D plane using Mercator.
pub fn project(position: Position, zoom: f64) -> Pixels {
    let total_pixels = total_pixels(zoom);
    let (x, y) = mercator_normalized(position);
    Pixels::new(x * total_pixels, y * total_pixels)
}

/// Transforms pixels of the world bitmap back into a geographical position.
pub fn unproject(pixels: Pixels, zoom: f64) -> Position {
    let total_pixels = total_pixels(zoom);

    let lon = (pixels.x() / total_pixels * 2. - 1.) * PI;
    let lat = (-pixels.y() / total_pixels * 2. + 1.) * PI;

    lon_lat(lon.to_degrees(), lat.sinh().atan().to_degrees())
}

/// Tiles of `tile_zoom` needed to cover a `width` x `height` viewport centered at `center` and
/// viewed at (possibly fractional) `zoom`.
pub fn visible_tiles(
    center: Position,
    zoom: f64,
    width: f64,
    height: f64,
    tile_zoom: u8,
) -> Vec<TileId> {
    let tile_pixels = TILE_SIZE as f64 * 2f64.powf(zoom - tile_zoom as f64);
    let center = project(center, zoom);
    let last = (total_tiles(tile_zoom) - 1) as f64;

    let range = |middle: f64, extent: f64| {
        let first = ((middle - extent / 2.) / tile_pixels).floor().clamp(0., last) as u32;
        let last = ((middle + extent / 2.) / tile_pixels).floor().clamp(0., last) as u32;
        first..=last
    };

    let xs = range(center.x(), width);
    range(center.y(), height)
        .flat_map(|y| xs.clone().map(move |x| TileId { x, y, zoom: tile_zoom }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tile_under(position: Position, zoom: u8) -> TileId {
        let pixels = project(position, zoom as f64);
        TileId {
            x: (pixels.x() / TILE_SIZE as f64).floor() as u32,
            y: (pixels.y() / TILE_SIZE as f64).floor() as u32,
            zoom,
        }
    }

    #[test]
    fn single_tile_covers_the_whole_world() {
        let bbox = TileId { x: 0, y: 0, zoom: 0 }.bounding_box();

        assert_relative_eq!(bbox.west, -180.);
        assert_relative_eq!(bbox.east, 180.);
        assert_relative_eq!(bbox.north, MAX_LATITUDE, max_relative = 1e-9);
        assert_relative_eq!(bbox.south, -MAX_LATITUDE, max_relative = 1e-9);
    }

    #[test]
    fn bounding_box_of_a_quarter() {
        let bbox = TileId { x: 1, y: 0, zoom: 1 }.bounding_box();

        assert_relative_eq!(bbox.west, 0.);
        assert_relative_eq!(bbox.east, 180.);
        assert_relative_eq!(bbox.south, 0., epsilon = 1e-9);
    }

    #[test]
    fn tile_contains_the_position_it_was_computed_from() {
        let empire_state = lon_lat(-73.98994, 40.749844);

        for zoom in [0, 5, 9, 12, 18] {
            let tile = tile_under(empire_state, zoom);
            assert!(tile.valid());

            let bbox = tile.bounding_box();
            assert!((bbox.west..=bbox.east).contains(&empire_state.x()), "zoom {zoom}");
            assert!((bbox.south..=bbox.north).contains(&empire_state.y()), "zoom {zoom}");
        }
    }

    #[test]
    fn project_there_and_back() {
        let position = lon_lat(21.00027, 52.26470);
        let calculated = unproject(project(position, 16.), 16.);

        assert_relative_eq!(calculated.x(), position.x(), max_relative = 1e-9);
        assert_relative_eq!(calculated.y(), position.y(), max_relative = 1e-9);
    }

    #[test]
    fn positions_beyond_mercator_limit_are_clamped() {
        assert_eq!(
            vec![TileId { x: 0, y: 0, zoom: 2 }],
            visible_tiles(lon_lat(-180., 89.), 2., 1., 1., 2)
        );
        assert_eq!(
            vec![TileId { x: 3, y: 3, zoom: 2 }],
            visible_tiles(lon_lat(180., -89.), 2., 1., 1., 2)
        );
    }

    #[test]
    fn visible_tiles_around_center() {
        // 256x256 viewport centered exactly on the corner of four tiles.
        let tiles = visible_tiles(lon_lat(0., 0.), 1., 256., 256., 1);
        assert_eq!(4, tiles.len());

        // Whole world at zoom 0 is just one tile, no matter how big the viewport is.
        let tiles = visible_tiles(lon_lat(0., 0.), 0., 4000., 4000., 0);
        assert_eq!(vec![TileId { x: 0, y: 0, zoom: 0 }], tiles);
    }

    #[test]
    fn visible_tiles_of_a_lower_zoom_are_stretched() {
        // Viewed at zoom 3, but tiles come from zoom 2, so each one spans 512 pixels.
        let tiles = visible_tiles(lon_lat(-73.98994, 40.749844), 3., 100., 100., 2);
        assert_eq!(1, tiles.len());
        assert_eq!(tile_under(lon_lat(-73.98994, 40.749844), 2), tiles[0]);
    }
}
