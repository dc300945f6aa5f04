//! Tilt estimation from filtered acceleration

use nalgebra::{Vector2, Vector3};

use crate::filter::LowPass;
use crate::math::{RAD_TO_DEG, clamp_unit};
use crate::types::{EngineSettings, PitchConvention};

/// Result of one tilt update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltReading {
    /// Smoothed normalized tilt before calibration (sine of the tilt per axis)
    pub normalized: Vector2<f64>,
    /// Normalized tilt minus calibration offset, clamped to [-1, 1]
    pub adjusted: Vector2<f64>,
    /// Pitch angle in degrees, sign per [`PitchConvention`]
    pub pitch_deg: f64,
    /// Roll angle in degrees, positive when the right edge is raised
    pub roll_deg: f64,
    /// Bubble display position after the hyperbolic gain, in [-1, 1]
    pub display: Vector2<f64>,
}

/// Normalize acceleration into a clamped sine-like tilt pair
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use vehicle_level::tilt::normalize;
///
/// let tilt = normalize(Vector3::new(0.0, 19.6, 0.0), 9.8);
/// assert_eq!(tilt.y, 1.0); // clamped
/// ```
pub fn normalize(acceleration: Vector3<f64>, gravity: f64) -> Vector2<f64> {
    Vector2::new(
        clamp_unit(acceleration.x / gravity),
        clamp_unit(acceleration.y / gravity),
    )
}

/// Subtract a normalized offset and clamp back into [-1, 1]
pub fn apply_offset(normalized: Vector2<f64>, offset: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(
        clamp_unit(normalized.x - offset.x),
        clamp_unit(normalized.y - offset.y),
    )
}

/// Pitch and roll in degrees from an adjusted tilt pair
pub fn angles(adjusted: Vector2<f64>, convention: PitchConvention) -> (f64, f64) {
    let pitch = adjusted.y.asin() * RAD_TO_DEG;
    let pitch = match convention {
        PitchConvention::NoseDownPositive => -pitch,
        PitchConvention::NoseUpPositive => pitch,
    };
    (pitch, adjusted.x.asin() * RAD_TO_DEG)
}

/// Non-linear display gain `tanh(k * value) / tanh(k)`
///
/// Exaggerates small tilts for a bubble visualization while keeping ±1 fixed.
/// Display only; never feed the result into angles or shim computation.
pub fn display_gain(value: f64, gain: f64) -> f64 {
    if gain == 0.0 {
        return value;
    }
    (gain * value).tanh() / gain.tanh()
}

/// Second-stage tilt smoothing and offset compensation
#[derive(Debug, Clone, Copy)]
pub struct TiltEstimator {
    gravity: f64,
    display_gain: f64,
    pitch_convention: PitchConvention,
    smoothing: LowPass<2>,
}

impl TiltEstimator {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            gravity: settings.gravity,
            display_gain: settings.display_gain,
            pitch_convention: settings.pitch_convention,
            smoothing: LowPass::new(settings.tilt_alpha),
        }
    }

    /// Update from filtered acceleration and a normalized calibration offset
    pub fn update(&mut self, filtered_acceleration: Vector3<f64>, offset: Vector2<f64>) -> TiltReading {
        let normalized = self.smoothing.update(normalize(filtered_acceleration, self.gravity));
        self.reading(normalized, offset)
    }

    /// Build a reading from an already smoothed normalized tilt
    pub fn reading(&self, normalized: Vector2<f64>, offset: Vector2<f64>) -> TiltReading {
        let adjusted = apply_offset(normalized, offset);
        let (pitch_deg, roll_deg) = angles(adjusted, self.pitch_convention);

        TiltReading {
            normalized,
            adjusted,
            pitch_deg,
            roll_deg,
            display: adjusted.map(|value| display_gain(value, self.display_gain)),
        }
    }

    /// Smoothed normalized tilt, `None` before the first sample
    pub fn normalized(&self) -> Option<Vector2<f64>> {
        self.smoothing.value()
    }

    pub fn reset(&mut self) {
        self.smoothing.reset();
    }
}
