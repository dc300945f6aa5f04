//! Mathematical utilities and nalgebra extensions for the leveling engine

use nalgebra::Vector3;

/// Mathematical constants
pub const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
pub const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Standard gravity in m/s²
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Clamp a value into [-1, 1]
///
/// NaN is mapped to zero so that a broken sample can never reach `asin`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// Wrap an angle in degrees into [0, 360)
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest signed arc from `from` to `to`, in degrees
///
/// The result lies in [-180, 180).
pub fn shortest_arc(from: f64, to: f64) -> f64 {
    (to - from + 540.0).rem_euclid(360.0) - 180.0
}

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning zero vector if magnitude is zero
    fn safe_normalize(&self) -> Vector3<f64>;
}

impl Vector3Ext for Vector3<f64> {
    fn safe_normalize(&self) -> Vector3<f64> {
        let magnitude_squared = self.magnitude_squared();
        if magnitude_squared > 0.0 {
            *self / magnitude_squared.sqrt()
        } else {
            Vector3::zeros()
        }
    }
}
