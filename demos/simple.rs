use nalgebra::Vector3;
use std::time::{Duration, Instant};
use vehicle_level::{
    EngineSettings, LevelSettings, LevelingEngine, Mode, Reading, Sample, UnitSystem, WindowOutcome, WindowPurpose,
};

const SAMPLE_PERIOD: Duration = Duration::from_millis(20); // 50 Hz
const GRAVITY: f64 = 9.80665;

fn main() {
    let user = LevelSettings {
        unit_system: UnitSystem::Metric,
        ..Default::default()
    };
    let mut engine = LevelingEngine::new(EngineSettings::default(), user);

    // Dimensions as typed by the user, in centimeters
    engine.set_wheelbase_text("310").expect("valid wheelbase");
    engine.set_track_width_text("175").expect("valid track width");

    // replace this with actual accelerometer data in m/s²: right side raised, front lowered
    let acceleration = Vector3::new(0.02 * GRAVITY, -0.04 * GRAVITY, 0.999 * GRAVITY);
    // replace this with actual magnetometer data in µT
    let magnetic_field = Vector3::new(-15.0, 16.0, -40.0);

    for _ in 0..10 {
        if let Some(Reading::Tilt(tilt)) = engine.ingest(Sample::Acceleration(acceleration)) {
            println!("Pitch: {:.2}, Roll: {:.2}", tilt.pitch_deg, tilt.roll_deg);
        }
    }
    println!("Shims (cm): {}", engine.display_shims());

    // Lock a two second level measurement, feeding samples as they would arrive
    let start = Instant::now();
    engine
        .start_window(WindowPurpose::LevelMeasurement, start)
        .expect("no other window open");

    let mut now = start;
    let outcome = loop {
        if let Some(outcome) = engine.poll(now) {
            break outcome;
        }
        engine.ingest(Sample::Acceleration(acceleration));
        now += SAMPLE_PERIOD;
    };

    match outcome {
        Ok(WindowOutcome::Measured(measurement)) => {
            println!("Locked shims (mm): {}", measurement.shims);
        }
        Ok(outcome) => println!("Unexpected outcome: {outcome:?}"),
        Err(err) => println!("Measurement failed: {err}"),
    }

    engine.set_mode(Mode::Heading);
    for _ in 0..10 {
        engine.ingest(Sample::MagneticField(magnetic_field));
        if let Some(Reading::Heading(heading)) = engine.ingest(Sample::Acceleration(acceleration)) {
            println!("Heading: {:.1} ({})", heading.heading_deg, heading.cardinal);
        }
    }
}
