//! Calibration offsets and the calibration solver
//!
//! Two offset models exist. The canonical one is the *bump* model: the device
//! rests on a support with one contact point raised by a known height over a
//! known span, on a single selected axis. It is physically interpretable and
//! has an exact inverse, so it can be solved from a measured tilt.
//!
//! The *angle* model (a signed degree offset per axis) is kept for
//! compatibility with stored settings that use it. Both reduce to a normalized
//! offset pair in [-1, 1] that is subtracted from the measured tilt.

use log::{debug, warn};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::LevelError;
use crate::math::{DEG_TO_RAD, RAD_TO_DEG, clamp_unit};
use crate::types::Axis;

/// Default support span in millimeters
pub const DEFAULT_SUPPORT_SPAN_MM: f64 = 70.0;

/// Geometric bump offset (canonical model)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumpOffset {
    /// Signed bump height in millimeters
    pub height_mm: f64,
    /// Axis the bump lies on; the other axis has no offset
    pub axis: Axis,
    /// Distance between the raised point and the opposing support in millimeters
    pub span_mm: f64,
}

impl Default for BumpOffset {
    fn default() -> Self {
        Self {
            height_mm: 0.0,
            axis: Axis::default(),
            span_mm: DEFAULT_SUPPORT_SPAN_MM,
        }
    }
}

impl BumpOffset {
    pub fn new(height_mm: f64, axis: Axis, span_mm: f64) -> Self {
        Self {
            height_mm,
            axis,
            span_mm,
        }
    }

    /// Normalized offset magnitude on the selected axis
    pub fn magnitude(&self) -> f64 {
        bump_to_normalized(self.height_mm, self.span_mm)
    }

    /// Normalized offset pair (x = roll, y = pitch)
    pub fn normalized(&self) -> Vector2<f64> {
        let magnitude = self.magnitude();
        match self.axis {
            Axis::Pitch => Vector2::new(0.0, magnitude),
            Axis::Roll => Vector2::new(magnitude, 0.0),
        }
    }
}

/// Direct angle offset (compatibility model)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleOffset {
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

impl AngleOffset {
    pub fn new(pitch_deg: f64, roll_deg: f64) -> Self {
        Self { pitch_deg, roll_deg }
    }

    /// Normalized offset pair (x = roll, y = pitch)
    pub fn normalized(&self) -> Vector2<f64> {
        Vector2::new((self.roll_deg * DEG_TO_RAD).sin(), (self.pitch_deg * DEG_TO_RAD).sin())
    }
}

/// Stored "zero position" of the device relative to the vehicle chassis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CalibrationOffset {
    Bump(BumpOffset),
    Angles(AngleOffset),
}

impl Default for CalibrationOffset {
    fn default() -> Self {
        CalibrationOffset::Bump(BumpOffset::default())
    }
}

impl CalibrationOffset {
    /// Normalized offset pair subtracted from the measured tilt
    pub fn normalized(&self) -> Vector2<f64> {
        match self {
            CalibrationOffset::Bump(bump) => bump.normalized(),
            CalibrationOffset::Angles(angles) => angles.normalized(),
        }
    }
}

/// Forward conversion `height / sqrt(height² + span²)`
///
/// A zero denominator (no height and no span) maps to zero.
///
/// # Example
/// ```
/// use vehicle_level::calibration::bump_to_normalized;
///
/// let m = bump_to_normalized(70.0, 70.0);
/// assert!((m - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
/// ```
pub fn bump_to_normalized(height_mm: f64, span_mm: f64) -> f64 {
    let denominator = height_mm.hypot(span_mm);
    if denominator == 0.0 {
        return 0.0;
    }
    clamp_unit(height_mm / denominator)
}

/// Inverse conversion `m * span / sqrt(1 - m²)`
///
/// Rejects `|m| >= max_magnitude`, where the inverse diverges.
pub fn normalized_to_bump(normalized: f64, span_mm: f64, max_magnitude: f64) -> Result<f64, LevelError> {
    let magnitude = normalized.abs();
    if magnitude.is_nan() || magnitude >= max_magnitude {
        return Err(LevelError::NearVertical { magnitude });
    }
    Ok(normalized * span_mm / (1.0 - normalized * normalized).sqrt())
}

/// Solve a bump offset from a normalized tilt pair
///
/// The dominant axis wins; ties go to pitch.
pub fn solve_bump(normalized: Vector2<f64>, span_mm: f64, max_magnitude: f64) -> Result<BumpOffset, LevelError> {
    let (axis, selected) = if normalized.x.abs() > normalized.y.abs() {
        (Axis::Roll, normalized.x)
    } else {
        (Axis::Pitch, normalized.y)
    };

    match normalized_to_bump(selected, span_mm, max_magnitude) {
        Ok(height_mm) => {
            debug!(target: "vehicle_level::calibration", "solved bump {:.2} mm on {:?} axis", height_mm, axis);
            Ok(BumpOffset::new(height_mm, axis, span_mm))
        }
        Err(err) => {
            warn!(target: "vehicle_level::calibration", "calibration rejected: {}", err);
            Err(err)
        }
    }
}

/// Solve a bump offset from mean raw acceleration over a sampling window
pub fn solve_bump_from_mean(
    mean_acceleration: Vector3<f64>,
    gravity: f64,
    span_mm: f64,
    max_magnitude: f64,
) -> Result<BumpOffset, LevelError> {
    let normalized = Vector2::new(
        clamp_unit(mean_acceleration.x / gravity),
        clamp_unit(mean_acceleration.y / gravity),
    );
    solve_bump(normalized, span_mm, max_magnitude)
}

/// Angle offset that zeroes the given normalized tilt
///
/// Subtracting `sin(offset)` from `normalized` yields exactly zero on both axes.
pub fn zero_angles(normalized: Vector2<f64>) -> AngleOffset {
    AngleOffset::new(
        clamp_unit(normalized.y).asin() * RAD_TO_DEG,
        clamp_unit(normalized.x).asin() * RAD_TO_DEG,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::STANDARD_GRAVITY;

    const MAX: f64 = 0.99;

    #[test]
    fn test_bump_forward_conversion() {
        assert_eq!(bump_to_normalized(0.0, 70.0), 0.0);
        assert_eq!(bump_to_normalized(0.0, 0.0), 0.0);

        let m = bump_to_normalized(5.0, 70.0);
        assert!((m - 5.0 / (25.0f64 + 4900.0).sqrt()).abs() < 1e-15);
        assert!((bump_to_normalized(-5.0, 70.0) + m).abs() < 1e-15);
    }

    #[test]
    fn test_bump_selects_axis() {
        let pitch = BumpOffset::new(10.0, Axis::Pitch, 70.0).normalized();
        assert_eq!(pitch.x, 0.0);
        assert!(pitch.y > 0.0);

        let roll = BumpOffset::new(-10.0, Axis::Roll, 70.0).normalized();
        assert!(roll.x < 0.0);
        assert_eq!(roll.y, 0.0);
    }

    #[test]
    fn test_angle_offset_normalized() {
        let offset = AngleOffset::new(30.0, -90.0).normalized();
        assert!((offset.y - 0.5).abs() < 1e-12);
        assert!((offset.x + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_rejects_singularity() {
        assert_eq!(
            normalized_to_bump(0.99, 70.0, MAX),
            Err(LevelError::NearVertical { magnitude: 0.99 })
        );
        assert!(normalized_to_bump(-1.0, 70.0, MAX).is_err());
        assert!(normalized_to_bump(f64::NAN, 70.0, MAX).is_err());
        assert!(normalized_to_bump(0.98, 70.0, MAX).is_ok());
    }

    #[test]
    fn test_round_trip_recovers_height() {
        for height in [-300.0, -42.5, -1.0, 0.0, 0.5, 12.0, 70.0, 250.0] {
            let m = bump_to_normalized(height, 70.0);
            let recovered = normalized_to_bump(m, 70.0, MAX).unwrap();
            approx::assert_relative_eq!(recovered, height, max_relative = 1e-6, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve_bump_dominant_axis() {
        let bump = solve_bump(Vector2::new(0.02, -0.1), 70.0, MAX).unwrap();
        assert_eq!(bump.axis, Axis::Pitch);
        assert!(bump.height_mm < 0.0);
        assert!((bump.magnitude() + 0.1).abs() < 1e-12);

        let bump = solve_bump(Vector2::new(0.3, 0.1), 70.0, MAX).unwrap();
        assert_eq!(bump.axis, Axis::Roll);
        assert!((bump.normalized() - Vector2::new(0.3, 0.0)).magnitude() < 1e-12);
    }

    #[test]
    fn test_solve_bump_tie_favors_pitch() {
        let bump = solve_bump(Vector2::new(-0.2, 0.2), 70.0, MAX).unwrap();
        assert_eq!(bump.axis, Axis::Pitch);
        assert!(bump.height_mm > 0.0);
    }

    #[test]
    fn test_solve_bump_from_mean() {
        let mean = Vector3::new(0.0, 0.05 * STANDARD_GRAVITY, 9.79);
        let bump = solve_bump_from_mean(mean, STANDARD_GRAVITY, 70.0, MAX).unwrap();
        let expected = 0.05 * 70.0 / (1.0f64 - 0.0025).sqrt();
        assert!((bump.height_mm - expected).abs() < 1e-9);

        // Device standing on its edge
        let vertical = Vector3::new(STANDARD_GRAVITY, 0.0, 0.1);
        assert!(matches!(
            solve_bump_from_mean(vertical, STANDARD_GRAVITY, 70.0, MAX),
            Err(LevelError::NearVertical { .. })
        ));
    }

    #[test]
    fn test_zero_angles_cancels_tilt() {
        let tilt = Vector2::new(-0.04, 0.12);
        let offset = zero_angles(tilt).normalized();
        assert!((offset - tilt).magnitude() < 1e-12);
    }
}
