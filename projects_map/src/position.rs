//! Geographical positions, bounding boxes and screen pixels.

/// Geographical position with longitude (x) and latitude (y).
pub type Position = geo_types::Point;

/// Construct `Position` from longitude and latitude, which is the order used by the tile
/// servers and style descriptions (`[lon, lat]`).
pub fn lon_lat(lon: f64, lat: f64) -> Position {
    Position::new(lon, lat)
}

/// Location projected on the screen or on the "world bitmap" of a given zoom.
pub type Pixels = geo_types::Point;

pub trait PixelsExt {
    fn to_vec2(&self) -> egui::Vec2;
    fn from_vec2(_: egui::Vec2) -> Self;
}

impl PixelsExt for Pixels {
    fn to_vec2(&self) -> egui::Vec2 {
        egui::Vec2::new(self.x() as f32, self.y() as f32)
    }

    fn from_vec2(vec2: egui::Vec2) -> Self {
        Pixels::new(vec2.x as f64, vec2.y as f64)
    }
}

/// Geographical extent of a tile, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn north_west(&self) -> Position {
        lon_lat(self.west, self.north)
    }

    pub fn south_east(&self) -> Position {
        lon_lat(self.east, self.south)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longitude_comes_first() {
        assert_eq!(-73.98994, lon_lat(-73.98994, 40.749844).x());
        assert_eq!(40.749844, lon_lat(-73.98994, 40.749844).y());
    }

    #[test]
    fn bounding_box_corners() {
        let bbox = BoundingBox {
            west: -10.0,
            south: 20.0,
            east: 10.0,
            north: 40.0,
        };

        assert_eq!(lon_lat(-10.0, 40.0), bbox.north_west());
        assert_eq!(lon_lat(10.0, 20.0), bbox.south_east());
    }
}
