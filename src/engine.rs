//! The leveling engine: sample ingestion, mode switching, windows and shims

use std::time::Instant;

use log::{debug, info, trace, warn};
use nalgebra::{Vector2, Vector3};

use crate::calibration::{BumpOffset, CalibrationOffset, solve_bump, solve_bump_from_mean, zero_angles};
use crate::compass::HeadingEstimator;
use crate::error::LevelError;
use crate::filter::LowPass;
use crate::settings::LevelSettings;
use crate::shim::{CornerShims, UnitSystem, VehicleGeometry, compute_shims};
use crate::tilt::{TiltEstimator, TiltReading, apply_offset, normalize};
use crate::types::{EngineSettings, Mode, Reading, Sample};
use crate::window::{SampleWindow, WindowPurpose, WindowTicket};

/// Tilt locked by a level-measurement window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelMeasurement {
    /// Mean normalized tilt over the window
    pub normalized: Vector2<f64>,
    /// Mean tilt with the calibration offset removed
    pub adjusted: Vector2<f64>,
    /// Shims for the locked tilt, in millimeters
    pub shims: CornerShims,
}

/// Result of a finalized sampling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowOutcome {
    /// A new bump calibration was solved and applied
    Calibrated(BumpOffset),
    /// A level measurement was locked for the shim calculation
    Measured(LevelMeasurement),
}

/// Orientation and leveling engine
///
/// Owns all live estimation state and the user configuration it depends on.
/// Every sample is processed synchronously by [`LevelingEngine::ingest`]; the
/// engine never blocks and never spawns work. Timed windows are finalized by
/// the host, either by polling or through [`crate::SharedEngine`].
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use vehicle_level::{EngineSettings, LevelSettings, LevelingEngine, Reading, Sample};
///
/// let mut engine = LevelingEngine::new(EngineSettings::default(), LevelSettings::default());
///
/// let level = Vector3::new(0.0, 0.0, 9.80665);
/// match engine.ingest(Sample::Acceleration(level)) {
///     Some(Reading::Tilt(tilt)) => assert!(tilt.pitch_deg.abs() < 1e-9),
///     other => panic!("unexpected reading: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LevelingEngine {
    settings: EngineSettings,
    mode: Mode,
    acceleration: LowPass<3>,
    magnetic_field: LowPass<3>,
    tilt: TiltEstimator,
    heading: HeadingEstimator,
    calibration: CalibrationOffset,
    unit_system: UnitSystem,
    geometry: VehicleGeometry,
    /// Latest tilt reading of the live stream
    last_tilt: Option<TiltReading>,
    /// Locked measurement; takes precedence over the live tilt for shims
    measurement: Option<LevelMeasurement>,
    shims: CornerShims,
    window: Option<SampleWindow>,
    next_ticket: u64,
}

impl LevelingEngine {
    pub fn new(settings: EngineSettings, user: LevelSettings) -> Self {
        Self {
            settings,
            mode: Mode::default(),
            acceleration: LowPass::new(settings.accel_alpha),
            magnetic_field: LowPass::new(settings.mag_alpha),
            tilt: TiltEstimator::new(&settings),
            heading: HeadingEstimator::new(settings.heading_alpha, settings.gravity),
            calibration: user.calibration,
            unit_system: user.unit_system,
            geometry: user.geometry,
            last_tilt: None,
            measurement: None,
            shims: CornerShims::default(),
            window: None,
            next_ticket: 0,
        }
    }

    /// Process one raw sample and return the reading for the active mode
    ///
    /// Returns `None` when the sample produced no output for the current mode:
    /// a magnetic sample in tilt mode, a heading update before both sensors
    /// have delivered, or a degenerate heading solution. Samples with a NaN or
    /// infinite component are dropped before they reach any filter or window.
    pub fn ingest(&mut self, sample: Sample) -> Option<Reading> {
        let (Sample::Acceleration(raw) | Sample::MagneticField(raw)) = sample;
        if !raw.iter().all(|v| v.is_finite()) {
            trace!(target: "vehicle_level::engine", "non-finite sample dropped: {:?}", sample);
            return None;
        }

        match sample {
            Sample::Acceleration(raw) => self.ingest_acceleration(raw),
            Sample::MagneticField(raw) => self.ingest_magnetic_field(raw),
        }
    }

    fn ingest_acceleration(&mut self, raw: Vector3<f64>) -> Option<Reading> {
        if let Some(window) = self.window.as_mut() {
            window.add(raw);
        }

        if !self.acceleration.is_seeded() {
            debug!(target: "vehicle_level::engine", "acceleration filter seeded");
        }
        let filtered = self.acceleration.update(raw);

        match self.mode {
            Mode::Tilt => {
                let reading = self.tilt.update(filtered, self.calibration.normalized());
                self.last_tilt = Some(reading);
                self.refresh_shims();
                Some(Reading::Tilt(reading))
            }
            Mode::Heading => {
                let field = self.magnetic_field.value()?;
                self.heading.update(filtered, field).map(Reading::Heading)
            }
        }
    }

    fn ingest_magnetic_field(&mut self, raw: Vector3<f64>) -> Option<Reading> {
        if !self.magnetic_field.is_seeded() {
            debug!(target: "vehicle_level::engine", "magnetic field filter seeded");
        }
        let field = self.magnetic_field.update(raw);

        match self.mode {
            Mode::Tilt => None,
            Mode::Heading => {
                let acceleration = self.acceleration.value()?;
                self.heading.update(acceleration, field).map(Reading::Heading)
            }
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Select which estimator consumes samples
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(target: "vehicle_level::engine", "mode changed from {:?} to {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Tear down live session state
    ///
    /// Filters, tilt smoothing and the heading return to uninitialized, the
    /// locked measurement is dropped and an open window is cancelled without
    /// producing a result. User configuration is kept.
    pub fn reset(&mut self) {
        self.acceleration.reset();
        self.magnetic_field.reset();
        self.tilt.reset();
        self.heading.reset();
        self.last_tilt = None;
        self.measurement = None;
        self.window = None;
        self.refresh_shims();
        info!(target: "vehicle_level::engine", "session reset");
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Snapshot of the user configuration for persisting
    pub fn level_settings(&self) -> LevelSettings {
        LevelSettings {
            calibration: self.calibration,
            unit_system: self.unit_system,
            geometry: self.geometry,
        }
    }

    pub fn calibration(&self) -> CalibrationOffset {
        self.calibration
    }

    /// Replace the calibration offset and re-derive the adjusted tilt
    pub fn set_calibration(&mut self, calibration: CalibrationOffset) {
        self.calibration = calibration;
        let offset = calibration.normalized();

        if let Some(reading) = self.last_tilt {
            self.last_tilt = Some(self.tilt.reading(reading.normalized, offset));
        }
        if let Some(measurement) = self.measurement.as_mut() {
            measurement.adjusted = apply_offset(measurement.normalized, offset);
        }
        self.refresh_shims();

        info!(target: "vehicle_level::engine", "calibration applied: {:?}", calibration);
    }

    /// Latest tilt reading, `None` before the first sample in tilt mode
    pub fn tilt(&self) -> Option<TiltReading> {
        self.last_tilt
    }

    /// Smoothed heading in degrees, `None` before the first valid fix
    pub fn heading(&self) -> Option<f64> {
        self.heading.heading()
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    pub fn set_unit_system(&mut self, unit_system: UnitSystem) {
        self.unit_system = unit_system;
    }

    pub fn geometry(&self) -> VehicleGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: VehicleGeometry) {
        self.geometry = geometry;
        self.refresh_shims();
    }

    /// Apply wheelbase text in the current unit system
    ///
    /// Empty text leaves the value unchanged; invalid text is rejected and the
    /// previous value kept.
    pub fn set_wheelbase_text(&mut self, text: &str) -> Result<(), LevelError> {
        self.geometry.set_wheelbase_text(text, self.unit_system.length_unit())?;
        self.refresh_shims();
        Ok(())
    }

    /// Apply track width text in the current unit system
    pub fn set_track_width_text(&mut self, text: &str) -> Result<(), LevelError> {
        self.geometry.set_track_width_text(text, self.unit_system.length_unit())?;
        self.refresh_shims();
        Ok(())
    }

    /// Current per-corner shims in millimeters
    pub fn shims(&self) -> CornerShims {
        self.shims
    }

    /// Current per-corner shims in the unit system's length unit
    pub fn display_shims(&self) -> CornerShims {
        self.shims.in_unit(self.unit_system.length_unit())
    }

    pub fn measurement(&self) -> Option<LevelMeasurement> {
        self.measurement
    }

    /// Drop the locked measurement and return to live shims
    pub fn clear_measurement(&mut self) {
        self.measurement = None;
        self.refresh_shims();
    }

    fn refresh_shims(&mut self) {
        if let Some(measurement) = self.measurement.as_mut() {
            measurement.shims = compute_shims(measurement.adjusted, &self.geometry);
            self.shims = measurement.shims;
        } else {
            let adjusted = self.last_tilt.map_or(Vector2::zeros(), |reading| reading.adjusted);
            self.shims = compute_shims(adjusted, &self.geometry);
        }
    }

    /// Open a timed sampling window starting at `now`
    ///
    /// Every raw acceleration sample ingested until the window is finalized
    /// contributes to its mean.
    pub fn start_window(&mut self, purpose: WindowPurpose, now: Instant) -> Result<WindowTicket, LevelError> {
        if self.window.is_some() {
            warn!(target: "vehicle_level::engine", "{:?} window refused: another window is open", purpose);
            return Err(LevelError::WindowInProgress);
        }

        let ticket = WindowTicket(self.next_ticket);
        self.next_ticket += 1;
        self.window = Some(SampleWindow::open(ticket, purpose, now, self.settings.window));

        info!(
            target: "vehicle_level::engine",
            "{:?} window opened for {} ms", purpose, self.settings.window.as_millis()
        );
        Ok(ticket)
    }

    /// Ticket of the open window, if any
    pub fn pending_window(&self) -> Option<WindowTicket> {
        self.window.as_ref().map(SampleWindow::ticket)
    }

    /// Finalize the open window if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<Result<WindowOutcome, LevelError>> {
        let window = self.window.take_if(|window| window.is_due(now))?;
        Some(self.finalize(window))
    }

    /// Finalize the window identified by `ticket` immediately
    ///
    /// A ticket whose window was already finalized, cancelled or replaced is
    /// ignored and yields `None`, so finalization runs at most once.
    pub fn finish_window(&mut self, ticket: WindowTicket) -> Option<Result<WindowOutcome, LevelError>> {
        let window = self.window.take_if(|window| window.ticket() == ticket)?;
        Some(self.finalize(window))
    }

    /// Discard the open window without a result
    ///
    /// Returns `true` if a window was open.
    pub fn cancel_window(&mut self) -> bool {
        match self.window.take() {
            Some(window) => {
                info!(
                    target: "vehicle_level::engine",
                    "{:?} window cancelled after {} samples", window.purpose(), window.sample_count()
                );
                true
            }
            None => false,
        }
    }

    fn finalize(&mut self, window: SampleWindow) -> Result<WindowOutcome, LevelError> {
        info!(
            target: "vehicle_level::engine",
            "{:?} window closed with {} samples", window.purpose(), window.sample_count()
        );

        let mean = window.mean().inspect_err(|err| {
            warn!(target: "vehicle_level::engine", "{:?} window discarded: {}", window.purpose(), err);
        })?;

        match window.purpose() {
            WindowPurpose::BumpCalibration => {
                let bump = solve_bump_from_mean(
                    mean,
                    self.settings.gravity,
                    self.support_span_mm(),
                    self.settings.max_calibration_magnitude,
                )?;
                self.set_calibration(CalibrationOffset::Bump(bump));
                Ok(WindowOutcome::Calibrated(bump))
            }
            WindowPurpose::LevelMeasurement => {
                let normalized = normalize(mean, self.settings.gravity);
                let adjusted = apply_offset(normalized, self.calibration.normalized());
                let measurement = LevelMeasurement {
                    normalized,
                    adjusted,
                    shims: compute_shims(adjusted, &self.geometry),
                };
                self.measurement = Some(measurement);
                self.refresh_shims();

                info!(target: "vehicle_level::engine", "level measurement locked: {}", measurement.shims);
                Ok(WindowOutcome::Measured(measurement))
            }
        }
    }

    /// Make the current attitude the new zero
    ///
    /// Under the angle model the offset becomes the angles of the current
    /// smoothed tilt. Under the bump model a bump is solved from it, with the
    /// same near-vertical rejection as the timed calibration.
    pub fn zero_current_attitude(&mut self) -> Result<CalibrationOffset, LevelError> {
        let normalized = self
            .tilt
            .normalized()
            .or_else(|| {
                self.acceleration
                    .value()
                    .map(|acceleration| normalize(acceleration, self.settings.gravity))
            })
            .ok_or(LevelError::NoSamples)?;

        let calibration = match self.calibration {
            CalibrationOffset::Angles(_) => CalibrationOffset::Angles(zero_angles(normalized)),
            CalibrationOffset::Bump(_) => CalibrationOffset::Bump(solve_bump(
                normalized,
                self.support_span_mm(),
                self.settings.max_calibration_magnitude,
            )?),
        };

        self.set_calibration(calibration);
        Ok(calibration)
    }

    /// Span for a new bump solution: the current bump's own span when it has
    /// a usable one, the configured default otherwise
    fn support_span_mm(&self) -> f64 {
        match self.calibration {
            CalibrationOffset::Bump(bump) if bump.span_mm.is_finite() && bump.span_mm > 0.0 => bump.span_mm,
            _ => self.settings.support_span_mm,
        }
    }
}
