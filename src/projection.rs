//! Coordinate conversions between the three reference systems in use:
//!
//! * lon/lat degrees (EPSG:4326): the datasets and the web map
//! * cylindrical equal-area metres (`+proj=cea`): centroid computation
//! * web-mercator metres (EPSG:3857): the static map
//!
//! All coordinates are `geo::Coord` with `x = lon / easting`, `y = lat / northing`.

use std::f64::consts::PI;

use geo::{Coord, MapCoords, MultiPolygon};

/// Authalic radius of the WGS84 ellipsoid, so spherical areas match the ellipsoid's.
pub const AUTHALIC_RADIUS: f64 = 6_371_007.181;

/// Radius used by EPSG:3857.
pub const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Web-mercator is undefined at the poles; clamp like the tile servers do.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

#[inline]
pub fn lonlat_to_equal_area(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: AUTHALIC_RADIUS * c.x.to_radians(),
        y: AUTHALIC_RADIUS * c.y.to_radians().sin(),
    }
}

#[inline]
pub fn equal_area_to_lonlat(c: Coord<f64>) -> Coord<f64> {
    let sin_lat = (c.y / AUTHALIC_RADIUS).clamp(-1.0, 1.0);
    Coord {
        x: (c.x / AUTHALIC_RADIUS).to_degrees(),
        y: sin_lat.asin().to_degrees(),
    }
}

#[inline]
pub fn lonlat_to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    Coord {
        x: MERCATOR_RADIUS * c.x.to_radians(),
        y: MERCATOR_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln(),
    }
}

pub fn multipolygon_to_equal_area(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.map_coords(lonlat_to_equal_area)
}

pub fn multipolygon_to_mercator(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.map_coords(lonlat_to_mercator)
}
