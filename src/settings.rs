//! User-owned configuration and its key/value persistence
//!
//! The engine does not own a storage format. Hosts implement
//! [`SettingsStore`] over whatever preference mechanism they have; every value
//! is a plain scalar under a fixed key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calibration::{AngleOffset, BumpOffset, CalibrationOffset, DEFAULT_SUPPORT_SPAN_MM};
use crate::shim::{UnitSystem, VehicleGeometry};
use crate::types::Axis;

/// Storage keys
pub mod keys {
    pub const CALIBRATION_MODEL: &str = "calibration_model";
    pub const BUMP_HEIGHT_MM: &str = "bump_height_mm";
    pub const BUMP_AXIS: &str = "bump_axis";
    pub const SUPPORT_SPAN_MM: &str = "support_span_mm";
    pub const PITCH_OFFSET_DEG: &str = "pitch_offset_deg";
    pub const ROLL_OFFSET_DEG: &str = "roll_offset_deg";
    pub const USE_IMPERIAL: &str = "use_imperial";
    pub const WHEELBASE_MM: &str = "wheelbase_mm";
    pub const TRACK_WIDTH_MM: &str = "track_width_mm";
}

const MODEL_BUMP: f64 = 0.0;
const MODEL_ANGLES: f64 = 1.0;
const AXIS_PITCH: f64 = 0.0;
const AXIS_ROLL: f64 = 1.0;

/// Scalar key/value preference storage
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<f64>;
    fn set(&mut self, key: &str, value: f64);
}

impl SettingsStore for HashMap<String, f64> {
    fn get(&self, key: &str) -> Option<f64> {
        HashMap::get(self, key).copied()
    }

    fn set(&mut self, key: &str, value: f64) {
        self.insert(key.to_string(), value);
    }
}

/// Configuration the user edits and that outlives a sensor session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    pub calibration: CalibrationOffset,
    pub unit_system: UnitSystem,
    pub geometry: VehicleGeometry,
}

impl LevelSettings {
    /// Load from a store, falling back to defaults for missing keys
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Self {
        let value = |key: &str| store.get(key).filter(|v| v.is_finite());

        let calibration = if value(keys::CALIBRATION_MODEL) == Some(MODEL_ANGLES) {
            CalibrationOffset::Angles(AngleOffset::new(
                value(keys::PITCH_OFFSET_DEG).unwrap_or(0.0),
                value(keys::ROLL_OFFSET_DEG).unwrap_or(0.0),
            ))
        } else {
            let axis = if value(keys::BUMP_AXIS) == Some(AXIS_ROLL) {
                Axis::Roll
            } else {
                Axis::Pitch
            };
            CalibrationOffset::Bump(BumpOffset::new(
                value(keys::BUMP_HEIGHT_MM).unwrap_or(0.0),
                axis,
                value(keys::SUPPORT_SPAN_MM).unwrap_or(DEFAULT_SUPPORT_SPAN_MM),
            ))
        };

        let unit_system = if value(keys::USE_IMPERIAL).is_some_and(|v| v != 0.0) {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        };

        let geometry = VehicleGeometry::new(
            value(keys::WHEELBASE_MM).unwrap_or(0.0).max(0.0),
            value(keys::TRACK_WIDTH_MM).unwrap_or(0.0).max(0.0),
        );

        Self {
            calibration,
            unit_system,
            geometry,
        }
    }

    /// Write every value back to the store
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) {
        match self.calibration {
            CalibrationOffset::Bump(bump) => {
                store.set(keys::CALIBRATION_MODEL, MODEL_BUMP);
                store.set(keys::BUMP_HEIGHT_MM, bump.height_mm);
                store.set(
                    keys::BUMP_AXIS,
                    match bump.axis {
                        Axis::Pitch => AXIS_PITCH,
                        Axis::Roll => AXIS_ROLL,
                    },
                );
                store.set(keys::SUPPORT_SPAN_MM, bump.span_mm);
            }
            CalibrationOffset::Angles(angles) => {
                store.set(keys::CALIBRATION_MODEL, MODEL_ANGLES);
                store.set(keys::PITCH_OFFSET_DEG, angles.pitch_deg);
                store.set(keys::ROLL_OFFSET_DEG, angles.roll_deg);
            }
        }

        let imperial = match self.unit_system {
            UnitSystem::Metric => 0.0,
            UnitSystem::Imperial => 1.0,
        };
        store.set(keys::USE_IMPERIAL, imperial);
        store.set(keys::WHEELBASE_MM, self.geometry.wheelbase_mm);
        store.set(keys::TRACK_WIDTH_MM, self.geometry.track_width_mm);
    }
}
