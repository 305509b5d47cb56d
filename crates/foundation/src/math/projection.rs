use crate::geo::LatLng;
use crate::math::Vec2;

/// Earth radius used by the spherical mercator projection (meters).
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Latitude where the square mercator world ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
/// Pixel size of the zoom-0 world.
pub const TILE_SIZE: f64 = 256.0;

/// World size in pixels at `zoom`.
pub fn scale(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Projects a geographic position to absolute pixel coordinates at `zoom`.
///
/// Origin is the north-west corner of the world; y grows southwards.
pub fn project(at: LatLng, zoom: f64) -> Vec2 {
    let d = std::f64::consts::PI / 180.0;
    let lat = at.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = (lat * d).sin();

    let x = EARTH_RADIUS * at.lng * d;
    let y = EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0;

    let k = 0.5 / (std::f64::consts::PI * EARTH_RADIUS);
    let s = scale(zoom);
    Vec2::new(s * (k * x + 0.5), s * (-k * y + 0.5))
}

/// Inverse of [`project`].
pub fn unproject(point: Vec2, zoom: f64) -> LatLng {
    let d = 180.0 / std::f64::consts::PI;
    let k = 0.5 / (std::f64::consts::PI * EARTH_RADIUS);
    let s = scale(zoom);

    let x = (point.x / s - 0.5) / k;
    let y = (point.y / s - 0.5) / -k;

    LatLng::new(
        (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2) * d,
        x * d / EARTH_RADIUS,
    )
}
