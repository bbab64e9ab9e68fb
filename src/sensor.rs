//! Temperature sensing: the sensor interface the control loop reads from and
//! the NTC thermistor conversion used by the board.

use core::fmt;

use libm::logf;

use crate::Temperature;

pub const ADC_FULL_SCALE: u16 = 4095; // 12-bit converter
pub const KELVIN_OFFSET: f32 = 273.15;

/// Why a temperature could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// The divider output sits on the supply rail (open thermistor)
    Saturated,
    /// The divider output sits at ground (shorted thermistor)
    ShortCircuit,
    /// The conversion produced NaN or infinity
    NonFinite,
    /// The converter itself failed to deliver a sample
    Bus,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("sensor fault: ")?;
        let label = match *self {
            SensorFault::Saturated => "reading saturated at supply rail",
            SensorFault::ShortCircuit => "reading stuck at ground",
            SensorFault::NonFinite => "non-finite temperature",
            SensorFault::Bus => "converter read failed",
        };
        f.write_str(label)
    }
}

/// Source of temperature samples for the control loop.
#[allow(async_fn_in_trait)]
pub trait TemperatureSensor {
    /// Take one sample in °C.
    async fn read(&mut self) -> Result<Temperature, SensorFault>;
}

/// NTC thermistor on the low side of a voltage divider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    pub supply_volts: f32,
    /// Fixed resistor to the supply (kΩ)
    pub series_kohm: f32,
    /// Thermistor resistance at the nominal temperature (kΩ)
    pub nominal_kohm: f32,
    pub nominal_celsius: f32,
    pub beta: f32,
}

impl Default for Thermistor {
    fn default() -> Self {
        Self {
            supply_volts: 3.3,
            series_kohm: 10.0,
            nominal_kohm: 10.0,
            nominal_celsius: 25.0,
            beta: 3950.0,
        }
    }
}

impl Thermistor {
    /// Convert raw ADC counts into °C using the β equation.
    pub fn celsius(&self, counts: u16) -> Result<Temperature, SensorFault> {
        if counts >= ADC_FULL_SCALE {
            return Err(SensorFault::Saturated);
        }
        if counts == 0 {
            return Err(SensorFault::ShortCircuit);
        }

        let voltage = counts as f32 * self.supply_volts / ADC_FULL_SCALE as f32;
        let resistance = self.series_kohm * voltage / (self.supply_volts - voltage);

        let nominal_kelvin = self.nominal_celsius + KELVIN_OFFSET;
        let log_ratio = logf(resistance / self.nominal_kohm);
        let kelvin = 1.0 / (1.0 / nominal_kelvin + log_ratio / self.beta);
        let celsius = kelvin - KELVIN_OFFSET;

        if celsius.is_finite() {
            Ok(celsius)
        } else {
            Err(SensorFault::NonFinite)
        }
    }
}
