/// Geographic position in degrees.
///
/// Callers always speak `(lat, lng)`; GeoJSON geometry stores `(lon, lat)`.
/// The conversions below are the only place the two orders meet.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Tolerance used when comparing camera positions.
pub const LATLNG_EPSILON: f64 = 1e-9;

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a position from a caller-supplied `[lat, lng]` pair.
    pub fn from_lat_lng(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }

    /// Builds a position from a GeoJSON `[lon, lat]` pair.
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub fn approx_eq(self, other: Self) -> bool {
        (self.lat - other.lat).abs() <= LATLNG_EPSILON
            && (self.lng - other.lng).abs() <= LATLNG_EPSILON
    }
}
