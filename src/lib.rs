#![cfg_attr(not(test), no_std)]

//! Control core of a single-zone resistive heater thermostat.
//!
//! A noisy temperature sample is flattened by a rolling average, the distance to
//! the setpoint drives a hysteresis state machine with a self-tuning hold power,
//! and the resulting power fraction is turned into heater on/off pulses over a
//! fixed window of loop iterations.

// Must stay first so the logging macros are visible to every module below
#[macro_use]
mod fmt;

pub mod control_loop;
pub mod controller;
pub mod duty;
pub mod heater;
pub mod ring;
pub mod sensor;
pub mod smoothing;
pub mod telemetry;
pub mod trend;

pub use control_loop::{ControlContext, ControlLoop, Iteration, Skip};
pub use controller::{ControlConfig, ControlStateMachine, ControllerMode, Gains, Transition};
pub use duty::{DutyCycleModulator, PhaseCounter};
pub use heater::{HeaterActuator, RelayHeater};
pub use ring::RingBuffer;
pub use sensor::{SensorFault, TemperatureSensor, Thermistor};
pub use smoothing::SampleSmoother;
pub use telemetry::{TelemetryRecord, TelemetrySink};
pub use trend::{Trend, TrendTracker};

/// One measured or averaged reading in °C.
pub type Temperature = f32;

pub const TARGET_TEMP: Temperature = 35.0; // Setpoint (°C)
pub const HYSTERESIS: f32 = 0.5; // Half width of the band around the setpoint (°C)
pub const ADJUSTMENT_STEP: f32 = 0.1; // Hold power change per correction (duty fraction)
pub const CORRECTION_POWER: f32 = 0.5; // Duty used while actively heating
pub const INITIAL_HOLD_POWER: f32 = 0.5; // Duty used while holding, before any tuning
pub const CORRECTION_COOLDOWN: u32 = 10; // Iterations between downward hold power corrections
pub const DUTY_WINDOW: u32 = 100; // Length of one duty cycle window (iterations)
pub const SAMPLE_PERIOD_MS: u32 = 100; // Control loop period (milliseconds)

pub const RAW_SAMPLE_WINDOW: usize = 100; // Raw samples averaged into one reading
pub const AVERAGE_WINDOW: usize = 10; // History of averaged readings
pub const TREND_WINDOW: usize = 10; // History of sample and target deltas
