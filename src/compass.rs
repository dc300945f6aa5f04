//! Tilt-compensated compass heading with wrap-aware smoothing

use core::fmt;

use log::trace;
use nalgebra::Vector3;

use crate::math::{RAD_TO_DEG, Vector3Ext, shortest_arc, wrap_degrees};

/// Minimum magnitude of the east vector (µT·m/s²) for a usable solution
///
/// Below this the field and gravity are close to parallel, which happens when
/// the device points at the magnetic pole direction or the field reading is
/// near zero.
const MIN_EAST_MAGNITUDE: f64 = 0.1;

/// Fraction of g below which the device is considered in free fall
const FREE_FALL_FRACTION: f64 = 0.1;

/// Calculate the compass azimuth of the device's top edge
///
/// Uses the two-vector attitude solution: east is the cross product of the
/// magnetic field with gravity, north is the cross product of gravity with
/// east. The azimuth is the angle of the device y axis measured clockwise
/// from north in the horizontal plane, so tilt does not disturb it.
///
/// # Arguments
/// * `accelerometer` - Filtered acceleration in m/s² (reaction to gravity, pointing up)
/// * `magnetometer` - Filtered magnetic field in µT
/// * `gravity` - Gravitational acceleration used for the free-fall check
///
/// # Returns
/// Azimuth in degrees in [0, 360), or `None` if the solution is degenerate
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use vehicle_level::compass::calculate_azimuth;
///
/// let accel = Vector3::new(0.0, 0.0, 9.81);  // Flat on a table
/// let mag = Vector3::new(0.0, 22.0, -40.0);  // Top edge pointing north
/// let azimuth = calculate_azimuth(accel, mag, 9.81).unwrap();
/// assert!(azimuth < 1e-9 || azimuth > 360.0 - 1e-9);
/// ```
pub fn calculate_azimuth(accelerometer: Vector3<f64>, magnetometer: Vector3<f64>, gravity: f64) -> Option<f64> {
    let free_fall = FREE_FALL_FRACTION * gravity;
    if accelerometer.magnitude_squared() < free_fall * free_fall {
        return None;
    }

    let east = magnetometer.cross(&accelerometer);
    if east.magnitude() < MIN_EAST_MAGNITUDE {
        return None;
    }

    let east = east.safe_normalize();
    let up = accelerometer.safe_normalize();
    let north = up.cross(&east);

    let azimuth = east.y.atan2(north.y) * RAD_TO_DEG;
    Some(wrap_degrees(azimuth))
}

/// Eight-point compass rose direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Cardinal {
    const ROSE: [Cardinal; 8] = [
        Cardinal::N,
        Cardinal::NE,
        Cardinal::E,
        Cardinal::SE,
        Cardinal::S,
        Cardinal::SW,
        Cardinal::W,
        Cardinal::NW,
    ];

    /// Nearest 45° bucket for a heading in degrees (any range)
    pub fn from_degrees(degrees: f64) -> Self {
        let index = (wrap_degrees(degrees) / 45.0).round() as usize % 8;
        Self::ROSE[index]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinal::N => "N",
            Cardinal::NE => "NE",
            Cardinal::E => "E",
            Cardinal::SE => "SE",
            Cardinal::S => "S",
            Cardinal::SW => "SW",
            Cardinal::W => "W",
            Cardinal::NW => "NW",
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one heading update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReading {
    /// Unsmoothed azimuth of this sample in [0, 360)
    pub azimuth_deg: f64,
    /// Smoothed heading in [0, 360)
    pub heading_deg: f64,
    /// Compass rose direction of the smoothed heading
    pub cardinal: Cardinal,
}

/// Circularly smoothed compass heading
///
/// Smoothing always moves along the shorter arc, so a heading oscillating
/// around north never swings the long way through south.
#[derive(Debug, Clone, Copy)]
pub struct HeadingEstimator {
    alpha: f64,
    gravity: f64,
    smoothed: Option<f64>,
}

impl HeadingEstimator {
    pub fn new(alpha: f64, gravity: f64) -> Self {
        Self {
            alpha,
            gravity,
            smoothed: None,
        }
    }

    /// Update from filtered acceleration and magnetic field
    ///
    /// Returns `None` and keeps the previous heading when the attitude
    /// solution is degenerate.
    pub fn update(&mut self, accelerometer: Vector3<f64>, magnetometer: Vector3<f64>) -> Option<HeadingReading> {
        let Some(azimuth_deg) = calculate_azimuth(accelerometer, magnetometer, self.gravity) else {
            trace!(target: "vehicle_level::compass", "degenerate attitude solution, heading update skipped");
            return None;
        };

        let heading_deg = self.smooth(azimuth_deg);
        Some(HeadingReading {
            azimuth_deg,
            heading_deg,
            cardinal: Cardinal::from_degrees(heading_deg),
        })
    }

    /// Feed one azimuth into the circular smoother and return the new heading
    pub fn smooth(&mut self, azimuth_deg: f64) -> f64 {
        let next = match self.smoothed {
            Some(current) => wrap_degrees(current + self.alpha * shortest_arc(current, azimuth_deg)),
            None => wrap_degrees(azimuth_deg),
        };
        self.smoothed = Some(next);
        next
    }

    /// Smoothed heading, `None` before the first valid fix
    pub fn heading(&self) -> Option<f64> {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{DEG_TO_RAD, STANDARD_GRAVITY};

    const LEVEL_ACCEL: Vector3<f64> = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);

    /// Field seen by a level device whose top edge points at `heading` degrees
    fn field_for_heading(heading: f64) -> Vector3<f64> {
        let (sin, cos) = (heading * DEG_TO_RAD).sin_cos();
        Vector3::new(-22.0 * sin, 22.0 * cos, -40.0)
    }

    fn angular_distance(a: f64, b: f64) -> f64 {
        shortest_arc(a, b).abs()
    }

    #[test]
    fn test_cardinal_headings() {
        for (heading, expected) in [(0.0, 0.0), (90.0, 90.0), (180.0, 180.0), (270.0, 270.0)] {
            let azimuth = calculate_azimuth(LEVEL_ACCEL, field_for_heading(heading), STANDARD_GRAVITY).unwrap();
            assert!(
                angular_distance(azimuth, expected) < 1e-9,
                "heading {} should read {}, got {}",
                heading,
                expected,
                azimuth
            );
        }
    }

    #[test]
    fn test_azimuth_range() {
        for step in 0..72 {
            let heading = step as f64 * 5.0;
            let azimuth = calculate_azimuth(LEVEL_ACCEL, field_for_heading(heading), STANDARD_GRAVITY).unwrap();
            assert!((0.0..360.0).contains(&azimuth), "azimuth {} out of range", azimuth);
            assert!(angular_distance(azimuth, heading) < 1e-9);
        }
    }

    #[test]
    fn test_tilt_compensation() {
        // Device pitched 20° top-up while pointing east
        let pitch = 20.0 * DEG_TO_RAD;
        let accel = Vector3::new(0.0, pitch.sin(), pitch.cos()) * STANDARD_GRAVITY;

        // World field (east 0, north 22, up -40) expressed in the pitched device frame
        let north_world = Vector3::new(0.0, 22.0, -40.0);
        // Device y axis points east and up, x axis points south
        let x_axis = Vector3::new(0.0, -1.0, 0.0);
        let y_axis = Vector3::new(pitch.cos(), 0.0, pitch.sin());
        let z_axis = x_axis.cross(&y_axis);
        let mag = Vector3::new(
            north_world.dot(&x_axis),
            north_world.dot(&y_axis),
            north_world.dot(&z_axis),
        );

        let azimuth = calculate_azimuth(accel, mag, STANDARD_GRAVITY).unwrap();
        assert!(angular_distance(azimuth, 90.0) < 1e-6, "got {}", azimuth);
    }

    #[test]
    fn test_degenerate_solutions() {
        // Field parallel to gravity
        let vertical = Vector3::new(0.0, 0.0, -45.0);
        assert_eq!(calculate_azimuth(LEVEL_ACCEL, vertical, STANDARD_GRAVITY), None);
        // No field at all
        assert_eq!(calculate_azimuth(LEVEL_ACCEL, Vector3::zeros(), STANDARD_GRAVITY), None);
        // Free fall
        let falling = Vector3::new(0.0, 0.0, 0.2);
        assert_eq!(calculate_azimuth(falling, field_for_heading(0.0), STANDARD_GRAVITY), None);
    }

    #[test]
    fn test_cardinal_buckets() {
        assert_eq!(Cardinal::from_degrees(0.0), Cardinal::N);
        assert_eq!(Cardinal::from_degrees(22.4), Cardinal::N);
        assert_eq!(Cardinal::from_degrees(22.6), Cardinal::NE);
        assert_eq!(Cardinal::from_degrees(90.0), Cardinal::E);
        assert_eq!(Cardinal::from_degrees(200.0), Cardinal::S);
        assert_eq!(Cardinal::from_degrees(350.0), Cardinal::N);
        assert_eq!(Cardinal::from_degrees(-45.0), Cardinal::NW);
        assert_eq!(Cardinal::SW.to_string(), "SW");
    }

    #[test]
    fn test_first_fix_is_taken_directly() {
        let mut estimator = HeadingEstimator::new(0.18, STANDARD_GRAVITY);
        assert_eq!(estimator.heading(), None);
        assert_eq!(estimator.smooth(123.0), 123.0);
        assert_eq!(estimator.heading(), Some(123.0));
    }

    #[test]
    fn test_smoothing_crosses_north_forward() {
        let mut estimator = HeadingEstimator::new(0.18, STANDARD_GRAVITY);
        let mut previous: Option<f64> = None;

        for azimuth in [350.0, 352.0, 358.0, 2.0, 5.0] {
            let heading = estimator.smooth(azimuth);
            assert!((0.0..360.0).contains(&heading));
            if let Some(previous) = previous {
                let step = shortest_arc(previous, heading);
                assert!(step >= 0.0 && step < 10.0, "step {step} from {previous} to {heading}");
            }
            previous = Some(heading);
        }

        // Keep pulling towards 5° until the smoothed value crosses north
        for _ in 0..40 {
            let before = estimator.heading().unwrap();
            let heading = estimator.smooth(5.0);
            let step = shortest_arc(before, heading);
            assert!(step >= 0.0 && step < 10.0);
        }
        assert!(angular_distance(estimator.heading().unwrap(), 5.0) < 0.1);
    }

    #[test]
    fn test_degenerate_update_keeps_heading() {
        let mut estimator = HeadingEstimator::new(0.18, STANDARD_GRAVITY);
        let reading = estimator.update(LEVEL_ACCEL, field_for_heading(45.0)).unwrap();
        assert_eq!(reading.cardinal, Cardinal::NE);

        assert_eq!(estimator.update(LEVEL_ACCEL, Vector3::new(0.0, 0.0, -45.0)), None);
        assert!(angular_distance(estimator.heading().unwrap(), 45.0) < 1e-9);
    }

    #[test]
    fn test_reset_restores_sentinel() {
        let mut estimator = HeadingEstimator::new(0.18, STANDARD_GRAVITY);
        estimator.smooth(10.0);
        estimator.reset();
        assert_eq!(estimator.heading(), None);
        assert_eq!(estimator.smooth(200.0), 200.0);
    }
}
