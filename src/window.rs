//! Timed sampling windows over raw acceleration
//!
//! A window accumulates every raw acceleration sample delivered while it is
//! open and is finalized once, after its deadline. It holds no timer itself:
//! the owner decides when to finalize, either by polling with the current time
//! or from a scheduled callback that presents the window's ticket.

use std::time::{Duration, Instant};

use nalgebra::Vector3;

use crate::error::LevelError;

/// What a window's result is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPurpose {
    /// Solve a bump calibration offset from the mean tilt
    BumpCalibration,
    /// Lock the mean tilt for the shim calculation
    LevelMeasurement,
}

/// Identifies one opened window
///
/// Tickets are never reused within an engine, so a late finalization aimed at
/// a window that was cancelled or replaced can be recognized and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowTicket(pub(crate) u64);

/// Running sum of raw acceleration samples
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accumulator {
    sum: Vector3<f64>,
    count: u32,
}

impl Accumulator {
    pub fn add(&mut self, sample: Vector3<f64>) {
        self.sum += sample;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Per-axis mean of all samples
    pub fn mean(&self) -> Result<Vector3<f64>, LevelError> {
        if self.count == 0 {
            return Err(LevelError::NoSamples);
        }
        Ok(self.sum / f64::from(self.count))
    }
}

/// An open sampling window
#[derive(Debug, Clone, Copy)]
pub struct SampleWindow {
    ticket: WindowTicket,
    purpose: WindowPurpose,
    deadline: Instant,
    accumulator: Accumulator,
}

impl SampleWindow {
    pub fn open(ticket: WindowTicket, purpose: WindowPurpose, now: Instant, duration: Duration) -> Self {
        Self {
            ticket,
            purpose,
            deadline: now + duration,
            accumulator: Accumulator::default(),
        }
    }

    pub fn add(&mut self, acceleration: Vector3<f64>) {
        self.accumulator.add(acceleration);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn ticket(&self) -> WindowTicket {
        self.ticket
    }

    pub fn purpose(&self) -> WindowPurpose {
        self.purpose
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn sample_count(&self) -> u32 {
        self.accumulator.count()
    }

    pub fn mean(&self) -> Result<Vector3<f64>, LevelError> {
        self.accumulator.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulator_has_no_mean() {
        let accumulator = Accumulator::default();
        assert_eq!(accumulator.mean(), Err(LevelError::NoSamples));
    }

    #[test]
    fn test_accumulator_mean() {
        let mut accumulator = Accumulator::default();
        accumulator.add(Vector3::new(1.0, 2.0, 9.0));
        accumulator.add(Vector3::new(3.0, -2.0, 10.0));

        assert_eq!(accumulator.count(), 2);
        assert_eq!(accumulator.mean(), Ok(Vector3::new(2.0, 0.0, 9.5)));
    }

    #[test]
    fn test_window_deadline() {
        let start = Instant::now();
        let mut window = SampleWindow::open(
            WindowTicket(7),
            WindowPurpose::BumpCalibration,
            start,
            Duration::from_millis(2000),
        );

        assert!(!window.is_due(start));
        assert!(!window.is_due(start + Duration::from_millis(1999)));
        assert!(window.is_due(start + Duration::from_millis(2000)));

        window.add(Vector3::new(0.0, 0.0, 9.8));
        assert_eq!(window.sample_count(), 1);
        assert_eq!(window.ticket(), WindowTicket(7));
        assert_eq!(window.purpose(), WindowPurpose::BumpCalibration);
        assert_eq!(window.deadline(), start + Duration::from_millis(2000));
    }
}
