//! One human readable status line per control iteration.

use core::fmt::{self, Write};

use heapless::String;

use crate::controller::ControllerMode;
use crate::Temperature;

/// Longest rendered line we keep, newline included.
pub const RECORD_CAPACITY: usize = 128;

/// Snapshot of one iteration, rendered as
/// `Temp: 20.000 | State: heating | Power: 0.500 | CP: 0.500 | HP: 0.500 | Target Delta: 15.000`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    /// Instantaneous (unsmoothed) sample
    pub temperature: Temperature,
    pub mode: ControllerMode,
    pub power: f32,
    pub correction_power: f32,
    pub hold_power: f32,
    pub target_delta: f32,
}

impl TelemetryRecord {
    /// Newline terminated line ready for a [`TelemetrySink`].
    ///
    /// Fields are appended whole: the first field that would not fit, and
    /// everything after it, is left out.
    pub fn render(&self) -> String<RECORD_CAPACITY> {
        let mut line = String::new();
        let _ = append_field(&mut line, format_args!("Temp: {:.3}", self.temperature))
            && append_field(&mut line, format_args!(" | State: {}", self.mode))
            && append_field(&mut line, format_args!(" | Power: {:.3}", self.power))
            && append_field(&mut line, format_args!(" | CP: {:.3}", self.correction_power))
            && append_field(&mut line, format_args!(" | HP: {:.3}", self.hold_power))
            && append_field(
                &mut line,
                format_args!(" | Target Delta: {:.3}", self.target_delta),
            );
        // Room for the newline is always kept back by `append_field`
        let _ = line.push('\n');
        line
    }
}

/// Appends one formatted field if it fits while leaving room for the newline.
fn append_field(line: &mut String<RECORD_CAPACITY>, field: fmt::Arguments) -> bool {
    let mut scratch: String<RECORD_CAPACITY> = String::new();
    if scratch.write_fmt(field).is_err() || line.len() + scratch.len() >= RECORD_CAPACITY {
        return false;
    }
    line.push_str(&scratch).is_ok()
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Temp: {:.3}", self.temperature)?;
        write!(f, " | State: {}", self.mode)?;
        write!(f, " | Power: {:.3}", self.power)?;
        write!(f, " | CP: {:.3}", self.correction_power)?;
        write!(f, " | HP: {:.3}", self.hold_power)?;
        write!(f, " | Target Delta: {:.3}", self.target_delta)
    }
}

/// Destination of the per iteration records.
pub trait TelemetrySink {
    fn emit(&mut self, line: &str);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    fn emit(&mut self, line: &str) {
        (**self).emit(line);
    }
}

/// Prints records over the defmt transport.
#[cfg(feature = "defmt")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtTelemetry;

#[cfg(feature = "defmt")]
impl TelemetrySink for DefmtTelemetry {
    fn emit(&mut self, line: &str) {
        defmt::println!("{=str}", line.trim_end());
    }
}
