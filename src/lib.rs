//! Vehicle Level - tilt, compass and wheel-shim computation for a handheld level
//!
//! This library turns raw accelerometer and magnetometer samples into a stable
//! tilt readout, a stable compass heading, and the amount of lift to place
//! under each wheel to level a parked vehicle on uneven ground.
//!
//! # Features
//!
//! - Exponential low-pass conditioning of every sensor stream
//! - Tilt with calibration-offset compensation and a bubble display gain
//! - Tilt-compensated compass heading with wrap-aware smoothing
//! - Bump-height calibration with an exact inverse, solved from a timed window
//! - Rigid-plane per-corner shim calculation in metric or imperial units
//! - Thread-safe handle with cancellable timer-driven windows
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use vehicle_level::{EngineSettings, LevelSettings, LevelingEngine, Sample, VehicleGeometry};
//!
//! let mut engine = LevelingEngine::new(EngineSettings::default(), LevelSettings::default());
//! engine.set_geometry(VehicleGeometry::new(3000.0, 1800.0)); // mm
//!
//! // Front of the vehicle slightly raised
//! let g = 9.80665;
//! let acceleration = Vector3::new(0.0, 0.02 * g, 0.9998 * g);
//! for _ in 0..10 {
//!     engine.ingest(Sample::Acceleration(acceleration));
//! }
//!
//! let shims = engine.shims();
//! assert_eq!(shims.front_left, 0.0);
//! assert!((shims.rear_left - 60.0).abs() < 1e-6);
//! ```

pub mod calibration;
pub mod compass;
mod engine;
mod error;
pub mod filter;
mod math;
pub mod settings;
pub mod shake;
mod shared;
pub mod shim;
pub mod tilt;
mod types;
pub mod window;

// Re-export all public types and functions
pub use calibration::{AngleOffset, BumpOffset, CalibrationOffset};
pub use compass::{Cardinal, HeadingReading};
pub use engine::{LevelMeasurement, LevelingEngine, WindowOutcome};
pub use error::LevelError;
pub use math::{DEG_TO_RAD, RAD_TO_DEG, STANDARD_GRAVITY, Vector3Ext};
pub use settings::{LevelSettings, SettingsStore};
pub use shake::ShakeDetector;
pub use shared::SharedEngine;
pub use shim::{CornerShims, LengthUnit, UnitSystem, VehicleGeometry};
pub use tilt::TiltReading;
pub use types::*;
pub use window::{WindowPurpose, WindowTicket};
