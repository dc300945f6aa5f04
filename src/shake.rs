//! Shake gesture detection on raw acceleration

use std::time::{Duration, Instant};

use log::debug;
use nalgebra::Vector3;

use crate::types::EngineSettings;

/// Reports a shake when the acceleration magnitude exceeds a threshold,
/// at most once per debounce period.
#[derive(Debug, Clone, Copy)]
pub struct ShakeDetector {
    gravity: f64,
    threshold_g: f64,
    debounce: Duration,
    last_shake: Option<Instant>,
}

impl ShakeDetector {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            gravity: settings.gravity,
            threshold_g: settings.shake_threshold_g,
            debounce: settings.shake_debounce,
            last_shake: None,
        }
    }

    /// Feed one raw acceleration sample taken at `now`
    ///
    /// Returns `true` if this sample completes a shake.
    pub fn update(&mut self, acceleration: Vector3<f64>, now: Instant) -> bool {
        let g_force = acceleration.magnitude() / self.gravity;
        if g_force <= self.threshold_g {
            return false;
        }

        let debouncing = self
            .last_shake
            .is_some_and(|last| now.saturating_duration_since(last) <= self.debounce);
        if debouncing {
            return false;
        }

        debug!(target: "vehicle_level::shake", "shake detected at {:.2} g", g_force);
        self.last_shake = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_shake = None;
    }
}
