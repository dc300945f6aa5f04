//! Core types and conventions for the leveling engine

use core::time::Duration;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::compass::HeadingReading;
use crate::math::STANDARD_GRAVITY;
use crate::tilt::TiltReading;

/// Engine operating mode
///
/// Exactly one estimator consumes samples at a time. The low-pass filters keep
/// running for every sensor that delivers samples regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Bubble-level readout (pitch/roll)
    #[default]
    Tilt,
    /// Compass readout (requires a magnetometer)
    Heading,
}

/// Tilt axis selector
///
/// `Roll` is the left/right axis (x component of a tilt pair), `Pitch` the
/// forward/back axis (y component).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    Pitch,
    Roll,
}

/// Polarity of the numeric pitch angle
///
/// A positive y tilt component means the top edge of the device is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PitchConvention {
    /// `pitch = -asin(y)`: raising the top edge reads as negative pitch
    #[default]
    NoseDownPositive,
    /// `pitch = asin(y)`: raising the top edge reads as positive pitch
    NoseUpPositive,
}

/// Engine tuning settings
///
/// Smoothing factors are per-sample (not per-second): the effective cutoff
/// frequency follows whatever rate the sensor source delivers at.
///
/// # Example
/// ```
/// use vehicle_level::{EngineSettings, PitchConvention};
///
/// let settings = EngineSettings {
///     pitch_convention: PitchConvention::NoseUpPositive,
///     heading_alpha: 0.25,
///     ..Default::default()
/// };
/// assert_eq!(settings.accel_alpha, 0.12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Gravitational acceleration used to normalize accelerometer readings (m/s²)
    pub gravity: f64,
    /// Low-pass factor for raw acceleration
    pub accel_alpha: f64,
    /// Low-pass factor for raw magnetic field
    pub mag_alpha: f64,
    /// Second-stage smoothing of the normalized tilt pair
    pub tilt_alpha: f64,
    /// Circular smoothing of the compass heading
    pub heading_alpha: f64,
    /// Hyperbolic gain `k` of the bubble display transform
    pub display_gain: f64,
    /// Distance between a raised contact point and its opposing support (mm)
    ///
    /// Used when no bump calibration with its own span is active.
    pub support_span_mm: f64,
    /// Auto-calibration rejects normalized tilts at or above this magnitude
    pub max_calibration_magnitude: f64,
    /// Duration of auto-calibration and level-measurement windows
    pub window: Duration,
    /// Sign of the numeric pitch angle
    pub pitch_convention: PitchConvention,
    /// Acceleration magnitude, in g, above which a shake is reported
    pub shake_threshold_g: f64,
    /// Minimum time between two reported shakes
    pub shake_debounce: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            accel_alpha: 0.12,
            mag_alpha: 0.10,
            tilt_alpha: 0.12,
            heading_alpha: 0.18,
            display_gain: 2.0,
            support_span_mm: 70.0,
            max_calibration_magnitude: 0.99,
            window: Duration::from_millis(2000),
            pitch_convention: PitchConvention::default(),
            shake_threshold_g: 2.7,
            shake_debounce: Duration::from_millis(1000),
        }
    }
}

/// A single raw sensor sample
///
/// Acceleration in m/s², magnetic field in µT, both in the device frame
/// (x right, y towards the top edge, z out of the screen).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Acceleration(Vector3<f64>),
    MagneticField(Vector3<f64>),
}

/// Output handed to the display consumer after a sample was processed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Tilt(TiltReading),
    Heading(HeadingReading),
}
