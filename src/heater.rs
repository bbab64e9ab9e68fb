//! Methods for switching the heater

use embedded_hal::digital::{OutputPin, PinState};

/// Single binary heater output with no feedback path.
pub trait HeaterActuator {
    fn set(&mut self, on: bool);
}

impl<H: HeaterActuator + ?Sized> HeaterActuator for &mut H {
    fn set(&mut self, on: bool) {
        (**self).set(on);
    }
}

/// Heater relay driven by a GPIO pin, active high.
pub struct RelayHeater<P> {
    pin: P,
}

impl<P: OutputPin> RelayHeater<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> HeaterActuator for RelayHeater<P> {
    fn set(&mut self, on: bool) {
        if self.pin.set_state(PinState::from(on)).is_err() {
            error!("heater relay write failed (requested on = {})", on);
        }
    }
}
