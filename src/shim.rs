//! Per-corner shim computation under a rigid-plane model
//!
//! Lengths are stored and computed in millimeters and converted at the edges
//! through [`LengthUnit`].

use core::fmt;

use log::warn;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::LevelError;

const MM_PER_CM: f64 = 10.0;
const MM_PER_INCH: f64 = 25.4;

/// Length unit for geometry input and shim output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[default]
    Millimeters,
    Centimeters,
    Inches,
}

impl LengthUnit {
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimeters => value,
            LengthUnit::Centimeters => value * MM_PER_CM,
            LengthUnit::Inches => value * MM_PER_INCH,
        }
    }

    pub fn from_mm(self, millimeters: f64) -> f64 {
        match self {
            LengthUnit::Millimeters => millimeters,
            LengthUnit::Centimeters => millimeters / MM_PER_CM,
            LengthUnit::Inches => millimeters / MM_PER_INCH,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Inches => "in",
        }
    }
}

/// User-selected unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Unit vehicle dimensions are entered in and shims are reported in
    pub fn length_unit(self) -> LengthUnit {
        match self {
            UnitSystem::Metric => LengthUnit::Centimeters,
            UnitSystem::Imperial => LengthUnit::Inches,
        }
    }
}

/// Parse a user-entered dimension
///
/// Empty text means "no change" and yields `Ok(None)`.
///
/// # Example
/// ```
/// use vehicle_level::shim::parse_dimension;
///
/// assert_eq!(parse_dimension(" 312.5 "), Ok(Some(312.5)));
/// assert_eq!(parse_dimension(""), Ok(None));
/// assert!(parse_dimension("3o0").is_err());
/// assert!(parse_dimension("-4").is_err());
/// ```
pub fn parse_dimension(text: &str) -> Result<Option<f64>, LevelError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| LevelError::InvalidNumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(LevelError::InvalidNumber(trimmed.to_string()));
    }
    if value < 0.0 {
        return Err(LevelError::NegativeDimension(value));
    }
    Ok(Some(value))
}

/// Vehicle footprint in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleGeometry {
    /// Distance between front and rear axles
    pub wheelbase_mm: f64,
    /// Distance between left and right wheels
    pub track_width_mm: f64,
}

impl VehicleGeometry {
    pub fn new(wheelbase_mm: f64, track_width_mm: f64) -> Self {
        Self {
            wheelbase_mm,
            track_width_mm,
        }
    }

    /// Geometry given in an arbitrary unit
    pub fn in_unit(wheelbase: f64, track_width: f64, unit: LengthUnit) -> Self {
        Self::new(unit.to_mm(wheelbase), unit.to_mm(track_width))
    }

    /// Apply wheelbase text entered in `unit`, keeping the old value on error
    pub fn set_wheelbase_text(&mut self, text: &str, unit: LengthUnit) -> Result<(), LevelError> {
        if let Some(value) = parse_or_warn(text, "wheelbase")? {
            self.wheelbase_mm = unit.to_mm(value);
        }
        Ok(())
    }

    /// Apply track width text entered in `unit`, keeping the old value on error
    pub fn set_track_width_text(&mut self, text: &str, unit: LengthUnit) -> Result<(), LevelError> {
        if let Some(value) = parse_or_warn(text, "track width")? {
            self.track_width_mm = unit.to_mm(value);
        }
        Ok(())
    }
}

fn parse_or_warn(text: &str, field: &str) -> Result<Option<f64>, LevelError> {
    parse_dimension(text).inspect_err(|err| {
        warn!(target: "vehicle_level::shim", "rejected {} input: {}", field, err);
    })
}

/// Lift required under each wheel, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerShims {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl CornerShims {
    /// Shims converted to `unit`
    pub fn in_unit(&self, unit: LengthUnit) -> CornerShims {
        CornerShims {
            front_left: unit.from_mm(self.front_left),
            front_right: unit.from_mm(self.front_right),
            rear_left: unit.from_mm(self.rear_left),
            rear_right: unit.from_mm(self.rear_right),
        }
    }

    /// Shims in front-left, front-right, rear-left, rear-right order
    pub fn as_array(&self) -> [f64; 4] {
        [self.front_left, self.front_right, self.rear_left, self.rear_right]
    }

    pub fn max(&self) -> f64 {
        self.as_array().into_iter().fold(0.0, f64::max)
    }

    pub fn is_level(&self) -> bool {
        self.max() == 0.0
    }
}

impl fmt::Display for CornerShims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FL {:.1} FR {:.1} RL {:.1} RR {:.1}",
            self.front_left, self.front_right, self.rear_left, self.rear_right
        )
    }
}

/// Compute per-corner shims from an adjusted tilt pair
///
/// Treats the tilt components as small-angle sines: the front axle sits
/// `wheelbase/2 * y` above the center and the right side `track/2 * x` above
/// it. Every corner is brought up to the highest one, so the highest corner
/// always gets zero and no shim is ever negative.
///
/// # Example
/// ```
/// use nalgebra::Vector2;
/// use vehicle_level::shim::{VehicleGeometry, compute_shims};
///
/// let geometry = VehicleGeometry::new(3000.0, 1800.0);
/// let shims = compute_shims(Vector2::new(0.0, 0.1), &geometry);
/// assert_eq!(shims.front_left, 0.0);
/// assert!((shims.rear_left - 300.0).abs() < 1e-9);
/// ```
pub fn compute_shims(adjusted: Vector2<f64>, geometry: &VehicleGeometry) -> CornerShims {
    let front = geometry.wheelbase_mm / 2.0 * adjusted.y;
    let rear = -front;
    let right = geometry.track_width_mm / 2.0 * adjusted.x;
    let left = -right;

    let front_left = front + left;
    let front_right = front + right;
    let rear_left = rear + left;
    let rear_right = rear + right;

    let highest = front_left.max(front_right).max(rear_left).max(rear_right);

    CornerShims {
        front_left: highest - front_left,
        front_right: highest - front_right,
        rear_left: highest - rear_left,
        rear_right: highest - rear_right,
    }
}
