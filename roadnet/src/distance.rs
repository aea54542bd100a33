//! Great-circle distances.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Great-circle distance in meters between two points, using the haversine
/// formula.
///
/// # Example
///
/// ```
/// use roadnet::distance::great_circle;
///
/// // One degree of latitude is ~111.2 km
/// let d = great_circle(0.0, 0.0, 1.0, 0.0);
/// assert!((d - 111_195.0).abs() < 10.0);
/// ```
pub fn great_circle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let y1 = lat1.to_radians();
    let y2 = lat2.to_radians();
    let dy = y2 - y1;
    let dx = (lon2 - lon1).to_radians();

    let h = (dy / 2.0).sin().powi(2) + y1.cos() * y2.cos() * (dx / 2.0).sin().powi(2);
    // floating point error can push h slightly above 1
    let h = h.min(1.0);

    2.0 * h.sqrt().asin() * EARTH_RADIUS_M
}

/// Round a length in meters to millimetre precision.
pub fn round_mm(meters: f64) -> f64 {
    (meters * 1000.0).round() / 1000.0
}
