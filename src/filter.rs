//! Exponential low-pass filtering of vector sample streams

use nalgebra::SVector;

/// One exponential smoothing step
///
/// Each component independently follows `state + alpha * (raw - state)`.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use vehicle_level::filter::low_pass;
///
/// let state = Vector3::new(0.0, 0.0, 10.0);
/// let raw = Vector3::new(1.0, 0.0, 0.0);
/// let next = low_pass(raw, state, 0.5);
/// assert_eq!(next, Vector3::new(0.5, 0.0, 5.0));
/// ```
pub fn low_pass<const D: usize>(raw: SVector<f64, D>, state: SVector<f64, D>, alpha: f64) -> SVector<f64, D> {
    state + (raw - state) * alpha
}

/// Stateful low-pass filter for a D-component stream
///
/// The filter starts uninitialized. The first sample seeds the state exactly,
/// so there is no warm-up transient from an arbitrary initial value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPass<const D: usize> {
    alpha: f64,
    state: Option<SVector<f64, D>>,
}

impl<const D: usize> LowPass<D> {
    /// Create an uninitialized filter with the given smoothing factor
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    /// Feed one sample and return the filtered value
    pub fn update(&mut self, raw: SVector<f64, D>) -> SVector<f64, D> {
        let next = match self.state {
            Some(state) => low_pass(raw, state, self.alpha),
            None => raw,
        };
        self.state = Some(next);
        next
    }

    /// Current filtered value, `None` until the first sample
    pub fn value(&self) -> Option<SVector<f64, D>> {
        self.state
    }

    pub fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    /// Return to the uninitialized state
    pub fn reset(&mut self) {
        self.state = None;
    }
}
