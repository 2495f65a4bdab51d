use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Radius of the WGS84 ellipsoid used by web mercator, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Length of the equator in web mercator meters.
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * PI * EARTH_RADIUS;
/// Highest zoom level addressable with `u32` tile indexes.
pub const MAX_ZOOM: u8 = 30;
/// Latitude at which the web mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Edge length of a tile rendered with scale `1`.
pub const TILE_SIZE: u32 = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Create a tile coordinate, returning `None` if it is outside of the tile pyramid.
    #[must_use]
    pub fn new_checked(z: u8, x: u32, y: u32) -> Option<Self> {
        let xyz = Self { z, x, y };
        xyz.is_valid().then_some(xyz)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.z <= MAX_ZOOM && self.x < tiles_at(self.z) && self.y < tiles_at(self.z)
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

/// Number of tiles along one axis at the given zoom.
#[must_use]
pub fn tiles_at(zoom: u8) -> u32 {
    1_u32 << zoom.min(MAX_ZOOM)
}

/// Convert web mercator coordinates (EPSG:3857) to longitude/latitude (EPSG:4326).
#[must_use]
pub fn webmercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lng = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lng, lat)
}

/// Convert longitude/latitude (EPSG:4326) to web mercator coordinates (EPSG:3857).
#[must_use]
pub fn wgs84_to_webmercator(lng: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lng.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Tile bounds in web mercator meters as `[min_x, min_y, max_x, max_y]`.
#[must_use]
pub fn tile_bounds_mercator(xyz: TileCoord) -> [f64; 4] {
    let size = EARTH_CIRCUMFERENCE / f64::from(tiles_at(xyz.z));
    let min_x = -EARTH_CIRCUMFERENCE / 2.0 + f64::from(xyz.x) * size;
    let max_y = EARTH_CIRCUMFERENCE / 2.0 - f64::from(xyz.y) * size;
    [min_x, max_y - size, min_x + size, max_y]
}

/// Tile bounds in degrees as `[west, south, east, north]`.
#[must_use]
pub fn tile_bounds_lnglat(xyz: TileCoord) -> [f64; 4] {
    let n = f64::from(tiles_at(xyz.z));
    let lng = |x: u32| f64::from(x) / n * 360.0 - 180.0;
    let lat = |y: u32| (PI * (1.0 - 2.0 * f64::from(y) / n)).sinh().atan().to_degrees();
    [lng(xyz.x), lat(xyz.y + 1), lng(xyz.x + 1), lat(xyz.y)]
}

/// Tile containing the given point at a zoom level. Points outside of the
/// web mercator square are clamped to the nearest edge tile.
#[must_use]
pub fn lnglat_to_tile(lng: f64, lat: f64, zoom: u8) -> TileCoord {
    let n = tiles_at(zoom);
    let max = f64::from(n - 1);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = ((lng + 180.0) / 360.0 * f64::from(n)).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * f64::from(n)).floor();
    TileCoord {
        z: zoom,
        x: x.clamp(0.0, max) as u32,
        y: y.clamp(0.0, max) as u32,
    }
}

/// All tiles at `zoom` intersecting `[west, south, east, north]`, row by row.
pub fn tiles_covering(bounds: [f64; 4], zoom: u8) -> impl Iterator<Item = TileCoord> {
    // Shrink the bbox slightly so that edges lying exactly on a tile
    // boundary do not pull in the neighbouring tiles.
    const EPSILON: f64 = 1e-9;
    let [west, south, east, north] = bounds;
    let top_left = lnglat_to_tile(
        (west + EPSILON).min(east),
        (north - EPSILON).max(south),
        zoom,
    );
    let bottom_right = lnglat_to_tile(
        (east - EPSILON).max(west),
        (south + EPSILON).min(north),
        zoom,
    );
    (top_left.y..=bottom_right.y).flat_map(move |y| {
        (top_left.x..=bottom_right.x).map(move |x| TileCoord { z: zoom, x, y })
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0, 0, true)]
    #[case(1, 1, 1, true)]
    #[case(1, 2, 0, false)]
    #[case(5, 31, 31, true)]
    #[case(5, 3, 32, false)]
    #[case(31, 0, 0, false)]
    fn tile_validity(#[case] z: u8, #[case] x: u32, #[case] y: u32, #[case] valid: bool) {
        assert_eq!(TileCoord::new_checked(z, x, y).is_some(), valid);
    }

    #[test]
    fn display() {
        let xyz = TileCoord { z: 5, x: 3, y: 2 };
        assert_eq!(xyz.to_string(), "5,3,2");
        assert_eq!(format!("{xyz:#}"), "5/3/2");
    }

    #[test]
    fn world_tile_bounds() {
        let [west, south, east, north] = tile_bounds_lnglat(TileCoord { z: 0, x: 0, y: 0 });
        assert_relative_eq!(west, -180.0);
        assert_relative_eq!(east, 180.0);
        assert_relative_eq!(north, MAX_LATITUDE, epsilon = 1e-9);
        assert_relative_eq!(south, -MAX_LATITUDE, epsilon = 1e-9);

        let [min_x, min_y, max_x, max_y] = tile_bounds_mercator(TileCoord { z: 0, x: 0, y: 0 });
        assert_relative_eq!(min_x, -20_037_508.342_789_244, epsilon = 1e-6);
        assert_relative_eq!(max_y, 20_037_508.342_789_244, epsilon = 1e-6);
        assert_relative_eq!(max_x, -min_x);
        assert_relative_eq!(min_y, -max_y);
    }

    #[test]
    fn mercator_round_trip() {
        let (x, y) = wgs84_to_webmercator(-121.3, 41.9);
        let (lng, lat) = webmercator_to_wgs84(x, y);
        assert_relative_eq!(lng, -121.3, epsilon = 1e-9);
        assert_relative_eq!(lat, 41.9, epsilon = 1e-9);
    }

    #[test]
    fn tile_bounds_agree() {
        let xyz = TileCoord { z: 7, x: 21, y: 47 };
        let [west, south, east, north] = tile_bounds_lnglat(xyz);
        let [min_x, min_y, max_x, max_y] = tile_bounds_mercator(xyz);
        let (lng, lat) = webmercator_to_wgs84(min_x, min_y);
        assert_relative_eq!(lng, west, epsilon = 1e-9);
        assert_relative_eq!(lat, south, epsilon = 1e-9);
        let (lng, lat) = webmercator_to_wgs84(max_x, max_y);
        assert_relative_eq!(lng, east, epsilon = 1e-9);
        assert_relative_eq!(lat, north, epsilon = 1e-9);
    }

    #[rstest]
    #[case(0.0, 0.0, 1, TileCoord { z: 1, x: 1, y: 1 })]
    #[case(-180.0, 90.0, 3, TileCoord { z: 3, x: 0, y: 0 })]
    #[case(180.0, -90.0, 3, TileCoord { z: 3, x: 7, y: 7 })]
    #[case(-121.35, 41.97, 10, TileCoord { z: 10, x: 166, y: 380 })]
    fn point_to_tile(#[case] lng: f64, #[case] lat: f64, #[case] z: u8, #[case] exp: TileCoord) {
        assert_eq!(lnglat_to_tile(lng, lat, z), exp);
    }

    #[test]
    fn covering_exact_tile() {
        let xyz = TileCoord { z: 4, x: 5, y: 6 };
        let tiles: Vec<_> = tiles_covering(tile_bounds_lnglat(xyz), 4).collect();
        assert_eq!(tiles, vec![xyz]);
    }

    #[test]
    fn covering_several_tiles() {
        let tiles: Vec<_> = tiles_covering([-10.0, -10.0, 10.0, 10.0], 2).collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord { z: 2, x: 1, y: 1 },
                TileCoord { z: 2, x: 2, y: 1 },
                TileCoord { z: 2, x: 1, y: 2 },
                TileCoord { z: 2, x: 2, y: 2 },
            ]
        );
    }
}
