//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

use crate::distance::EARTH_RADIUS_M;

/// A rectangular region given by its latitude and longitude bounds.
///
/// Coordinates are in decimal degrees (WGS84). No range validation is
/// performed: a box with `north < south` is passed to the data source as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern boundary latitude.
    pub north: f64,
    /// Southern boundary latitude.
    pub south: f64,
    /// Eastern boundary longitude.
    pub east: f64,
    /// Western boundary longitude.
    pub west: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Check whether a coordinate lies inside the box (bounds inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat <= self.north && lat >= self.south && lon <= self.east && lon >= self.west
    }

    /// Whether all four bounds are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Grow the box by `meters` on every side.
    ///
    /// The longitude delta is scaled by the cosine of the box's middle
    /// latitude, so the buffer is roughly uniform on the ground. Results are
    /// clamped to valid latitudes and longitudes. A box with a non-finite
    /// bound is returned unchanged.
    pub fn buffered(&self, meters: f64) -> Self {
        if !self.is_finite() {
            return *self;
        }

        let dlat = (meters / EARTH_RADIUS_M).to_degrees();
        let mid_lat = ((self.north + self.south) / 2.0).to_radians();
        let cos = mid_lat.cos().abs().max(1e-6);
        let dlon = dlat / cos;

        Self {
            north: (self.north + dlat).min(90.0),
            south: (self.south - dlat).max(-90.0),
            east: (self.east + dlon).min(180.0),
            west: (self.west - dlon).max(-180.0),
        }
    }

    /// Split the box into a grid of cells no larger than `max_side_meters`
    /// on either side, ordered south to north then west to east.
    ///
    /// Boxes that already fit, inverted boxes and non-finite boxes come
    /// back as a single cell.
    pub fn subdivide(&self, max_side_meters: f64) -> Vec<BoundingBox> {
        let height = (self.north - self.south).to_radians() * EARTH_RADIUS_M;
        let mid_lat = ((self.north + self.south) / 2.0).to_radians();
        let width = (self.east - self.west).to_radians() * EARTH_RADIUS_M * mid_lat.cos().abs();

        if !self.is_finite() || max_side_meters <= 0.0 || height <= 0.0 || width <= 0.0 {
            return vec![*self];
        }

        let rows = (height / max_side_meters).ceil().max(1.0) as usize;
        let cols = (width / max_side_meters).ceil().max(1.0) as usize;
        let dlat = (self.north - self.south) / rows as f64;
        let dlon = (self.east - self.west) / cols as f64;

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let south = self.south + dlat * row as f64;
            let north = if row + 1 == rows { self.north } else { south + dlat };
            for col in 0..cols {
                let west = self.west + dlon * col as f64;
                let east = if col + 1 == cols { self.east } else { west + dlon };
                cells.push(BoundingBox::new(north, south, east, west));
            }
        }
        cells
    }

    /// Render as an Overpass `(south,west,north,east)` bbox filter body.
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}
