//! Time division of a power fraction into heater on/off iterations.

use libm::roundf;

/// Position inside the duty cycle window, advanced once per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCounter {
    value: u32,
    window: u32,
}

impl PhaseCounter {
    pub const fn new(window: u32) -> Self {
        Self { value: 0, window }
    }

    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Moves to the next phase, wrapping to `0` at the end of the window.
    pub fn advance(&mut self) {
        self.value += 1;
        if self.value >= self.window {
            self.value = 0;
        }
    }
}

/// Leading-edge duty cycle: the heater is on for the first
/// `round(power * window)` phases of every window and off for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycleModulator {
    window: u32,
}

impl DutyCycleModulator {
    pub const fn new(window: u32) -> Self {
        Self { window }
    }

    pub const fn window(&self) -> u32 {
        self.window
    }

    /// Whether the heater should be energized at `phase` for `power`.
    pub fn decide(&self, power: f32, phase: u32) -> bool {
        if power == 0.0 {
            return false;
        }
        phase < self.on_phases(power)
    }

    /// Number of energized phases per window. Powers at or below zero give
    /// none, powers above one saturate at the whole window.
    pub fn on_phases(&self, power: f32) -> u32 {
        // Float to int casts saturate and map NaN to 0
        let phases = roundf(power * self.window as f32) as u32;
        phases.min(self.window)
    }
}
