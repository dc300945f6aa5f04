use nalgebra::Vector3;
use serde::Deserialize;
use std::error::Error;
use std::time::{Duration, Instant};
use vehicle_level::{
    Axis, CalibrationOffset, EngineSettings, LevelSettings, LevelingEngine, Mode, Reading, Sample, VehicleGeometry,
    WindowOutcome, WindowPurpose,
};

/// Recorded session of a device lying on a parked vehicle
///
/// Normalized tilt (0.035, -0.05): right side raised and front lowered, top
/// edge of the device pointing north-east.
#[derive(Debug, Deserialize)]
struct SessionRow {
    #[serde(rename = "Time (s)")]
    time: f64,
    #[serde(rename = "Accelerometer X (m/s^2)")]
    accel_x: f64,
    #[serde(rename = "Accelerometer Y (m/s^2)")]
    accel_y: f64,
    #[serde(rename = "Accelerometer Z (m/s^2)")]
    accel_z: f64,
    #[serde(rename = "Magnetometer X (uT)")]
    mag_x: f64,
    #[serde(rename = "Magnetometer Y (uT)")]
    mag_y: f64,
    #[serde(rename = "Magnetometer Z (uT)")]
    mag_z: f64,
}

impl SessionRow {
    fn acceleration(&self) -> Sample {
        Sample::Acceleration(Vector3::new(self.accel_x, self.accel_y, self.accel_z))
    }

    fn magnetic_field(&self) -> Sample {
        Sample::MagneticField(Vector3::new(self.mag_x, self.mag_y, self.mag_z))
    }
}

const TRUE_TILT_X: f64 = 0.035;
const TRUE_TILT_Y: f64 = -0.05;
const TRUE_HEADING: f64 = 45.0;

fn load_session() -> Result<Vec<SessionRow>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path("testdata/level_session.csv")?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: SessionRow = result?;
        rows.push(row);
    }
    Ok(rows)
}

fn engine() -> LevelingEngine {
    let user = LevelSettings {
        geometry: VehicleGeometry::new(3000.0, 1800.0),
        ..Default::default()
    };
    LevelingEngine::new(EngineSettings::default(), user)
}

#[test]
fn test_tilt_replay() -> Result<(), Box<dyn Error>> {
    let rows = load_session()?;
    let mut engine = engine();

    let mut last = None;
    for row in &rows {
        if let Some(Reading::Tilt(reading)) = engine.ingest(row.acceleration()) {
            assert!(reading.normalized.iter().all(|v| (-1.0..=1.0).contains(v)));
            last = Some(reading);
        }
        assert_eq!(engine.ingest(row.magnetic_field()), None);
    }

    let reading = last.ok_or("no tilt readings")?;
    assert!((reading.adjusted.x - TRUE_TILT_X).abs() < 0.003);
    assert!((reading.adjusted.y - TRUE_TILT_Y).abs() < 0.003);

    // Front lowered reads as positive pitch in the default convention
    assert!((reading.pitch_deg - 2.866).abs() < 0.2);
    assert!((reading.roll_deg - 2.006).abs() < 0.2);

    // front = 1500 * y, right = 900 * x: the rear-right corner is highest
    let shims = engine.shims();
    assert_eq!(shims.rear_right, 0.0);
    assert!((shims.front_left - 213.0).abs() < 6.0);
    assert!((shims.front_right - 150.0).abs() < 6.0);
    assert!((shims.rear_left - 63.0).abs() < 6.0);

    Ok(())
}

#[test]
fn test_heading_replay() -> Result<(), Box<dyn Error>> {
    let rows = load_session()?;
    let mut engine = engine();
    engine.set_mode(Mode::Heading);

    let mut headings = Vec::new();
    for row in &rows {
        for sample in [row.acceleration(), row.magnetic_field()] {
            if let Some(Reading::Heading(reading)) = engine.ingest(sample) {
                assert!((0.0..360.0).contains(&reading.heading_deg));
                headings.push(reading.heading_deg);
            }
        }
    }

    assert!(headings.len() > rows.len());
    // Settled after the first second
    for heading in &headings[200..] {
        assert!((heading - TRUE_HEADING).abs() < 1.5, "heading {heading} out of range");
    }
    assert_eq!(engine.heading(), headings.last().copied());

    Ok(())
}

#[test]
fn test_calibration_replay() -> Result<(), Box<dyn Error>> {
    let rows = load_session()?;
    let mut engine = engine();
    let start = Instant::now();

    engine.start_window(WindowPurpose::BumpCalibration, start)?;

    let mut outcome = None;
    for row in &rows {
        let now = start + Duration::from_secs_f64(row.time);
        if let Some(result) = engine.poll(now) {
            outcome = Some(result?);
        }
        engine.ingest(row.acceleration());
    }

    let Some(WindowOutcome::Calibrated(bump)) = outcome else {
        return Err(format!("unexpected outcome {outcome:?}").into());
    };
    assert_eq!(bump.axis, Axis::Pitch);
    assert!(bump.height_mm < 0.0);
    assert!((bump.magnitude() - TRUE_TILT_Y).abs() < 0.002);
    assert_eq!(engine.calibration(), CalibrationOffset::Bump(bump));

    // Only the pitch axis is compensated
    let reading = engine.tilt().ok_or("no tilt reading")?;
    assert!(reading.adjusted.y.abs() < 0.003);
    assert!((reading.adjusted.x - TRUE_TILT_X).abs() < 0.003);

    Ok(())
}

#[test]
fn test_level_measurement_replay() -> Result<(), Box<dyn Error>> {
    let rows = load_session()?;
    let mut engine = engine();
    let start = Instant::now();

    engine.start_window(WindowPurpose::LevelMeasurement, start)?;

    let mut measurement = None;
    for row in &rows {
        let now = start + Duration::from_secs_f64(row.time);
        if let Some(WindowOutcome::Measured(locked)) = engine.poll(now).transpose()? {
            measurement = Some(locked);
        }
        engine.ingest(row.acceleration());
    }

    let measurement = measurement.ok_or("window never closed")?;
    assert!((measurement.adjusted.x - TRUE_TILT_X).abs() < 0.002);
    assert!((measurement.adjusted.y - TRUE_TILT_Y).abs() < 0.002);
    assert_eq!(engine.shims(), measurement.shims);
    assert_eq!(engine.measurement(), Some(measurement));

    Ok(())
}
